/// Resolves a stored object path (e.g. `designs/7/front.png`) to a URL the
/// fulfillment provider can fetch.
pub trait ObjectStorage: Send + Sync {
    /// `None` when the path cannot be turned into a URL
    fn public_url(&self, path: &str) -> Option<String>;
}
