use printshop_core::ObjectStorage;
use url::Url;

/// Object storage served from a public base URL (bucket or CDN)
#[derive(Debug, Clone)]
pub struct PublicStorage {
    base: Url,
}

impl PublicStorage {
    pub fn new(public_base_url: &str) -> Result<Self, url::ParseError> {
        let mut base = Url::parse(public_base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }
}

impl ObjectStorage for PublicStorage {
    fn public_url(&self, path: &str) -> Option<String> {
        let path = path.trim().trim_start_matches('/');
        if path.is_empty() || path.split('/').any(|segment| segment == "..") {
            return None;
        }
        self.base.join(path).ok().map(String::from)
    }
}
