use crate::models::{non_empty, OrderItem};
use printshop_core::fulfillment::PrintFileType;
use printshop_core::ObjectStorage;
use std::net::IpAddr;
use std::sync::Arc;
use url::{Host, Url};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArtifactRejection {
    #[error("no artifact candidate")]
    NoCandidate,

    #[error("storage cannot resolve path {0}")]
    Unresolvable(String),

    #[error("not an absolute http(s) URL: {0}")]
    Malformed(String),

    #[error("host {0} is not publicly reachable")]
    PrivateHost(String),
}

/// Which field supplied the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactSource {
    DesignFront,
    SnapshotFront,
    SnapshotPrintFile,
}

/// Picks the public image URL sent to the fulfillment provider for an item.
///
/// Candidates, first present wins: the design's front export, the
/// snapshot's front export, the snapshot's explicit print-file URL. Stored
/// paths go through object storage; the print-file URL is used verbatim.
#[derive(Clone)]
pub struct ArtifactResolver {
    storage: Arc<dyn ObjectStorage>,
}

impl ArtifactResolver {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Absence of a candidate and an unusable URL both yield `None`.
    pub fn resolve(&self, item: &OrderItem) -> Option<Url> {
        self.inspect(item).ok()
    }

    pub fn inspect(&self, item: &OrderItem) -> Result<Url, ArtifactRejection> {
        let (source, raw) = Self::candidate(item).ok_or(ArtifactRejection::NoCandidate)?;
        let url = match source {
            ArtifactSource::SnapshotPrintFile => raw.to_string(),
            ArtifactSource::DesignFront | ArtifactSource::SnapshotFront => self.stored_url(raw)?,
        };
        validate_public_url(&url)
    }

    fn candidate(item: &OrderItem) -> Option<(ArtifactSource, &str)> {
        let design_front = item
            .design
            .as_ref()
            .and_then(|design| non_empty(design.front_image_path.as_deref()));
        if let Some(path) = design_front {
            return Some((ArtifactSource::DesignFront, path));
        }
        if let Some(path) = non_empty(item.design_data.front_image_path.as_deref()) {
            return Some((ArtifactSource::SnapshotFront, path));
        }
        non_empty(item.design_data.print_file_url.as_deref())
            .map(|url| (ArtifactSource::SnapshotPrintFile, url))
    }

    fn stored_url(&self, path: &str) -> Result<String, ArtifactRejection> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(path.to_string());
        }
        self.storage
            .public_url(path)
            .ok_or_else(|| ArtifactRejection::Unresolvable(path.to_string()))
    }
}

/// Absolute http(s) URL whose host is not loopback
pub fn validate_public_url(raw: &str) -> Result<Url, ArtifactRejection> {
    let url = Url::parse(raw).map_err(|_| ArtifactRejection::Malformed(raw.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ArtifactRejection::Malformed(raw.to_string()));
    }

    let private = match url.host() {
        None => return Err(ArtifactRejection::Malformed(raw.to_string())),
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
        Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
    };
    if private {
        let host = url.host_str().unwrap_or_default().to_string();
        return Err(ArtifactRejection::PrivateHost(host));
    }
    Ok(url)
}

/// `back` when the artifact's file name marks it as a back print
pub fn classify_file_type(url: &Url) -> PrintFileType {
    let file_name = url
        .path_segments()
        .and_then(|segments| segments.last())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if file_name.contains("back") {
        PrintFileType::Back
    } else {
        PrintFileType::Default
    }
}
