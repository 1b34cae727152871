//! Revocable local references to media bytes
//!
//! Previews and fetched media payloads are addressed by object URLs of the
//! form `blob:<uuid>`. Each one is allocated here and must be released
//! exactly once; anything that is not a live `blob:` URL is ignored on
//! release.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;

const BLOB_SCHEME: &str = "blob:";

/// Object URL naming a locally allocated blob
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Allocation counters, mostly useful for leak checks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandleStats {
    pub allocated: u64,
    pub released: u64,
}

impl HandleStats {
    pub fn live(&self) -> u64 {
        self.allocated - self.released
    }
}

/// Owner of every live blob
#[derive(Debug, Default)]
pub struct HandleRegistry {
    blobs: HashMap<String, Bytes>,
    stats: HandleStats,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new object URL for `bytes`
    pub fn allocate(&mut self, bytes: Bytes, content_type: &str) -> ObjectUrl {
        let url = format!("{BLOB_SCHEME}{}", Uuid::new_v4());
        debug!("Allocated {} ({} bytes, {})", url, bytes.len(), content_type);

        self.blobs.insert(url.clone(), bytes);
        self.stats.allocated += 1;
        ObjectUrl(url)
    }

    /// Release a reference. Returns `false` without side effects when the
    /// reference is not a live `blob:` URL, e.g. a data URL or one released
    /// earlier.
    pub fn release(&mut self, url: &str) -> bool {
        if !url.starts_with(BLOB_SCHEME) {
            return false;
        }

        match self.blobs.remove(url) {
            Some(_) => {
                self.stats.released += 1;
                debug!("Released {}", url);
                true
            }
            None => {
                debug!("Ignoring release of unknown handle {}", url);
                false
            }
        }
    }

    /// Bytes behind a live URL
    pub fn bytes(&self, url: &ObjectUrl) -> Option<Bytes> {
        self.blobs.get(url.as_str()).cloned()
    }

    pub fn is_live(&self, url: &ObjectUrl) -> bool {
        self.blobs.contains_key(url.as_str())
    }

    pub fn stats(&self) -> HandleStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_release_once() {
        let mut registry = HandleRegistry::new();
        let url = registry.allocate(Bytes::from_static(b"abc"), "image/png");

        assert!(url.as_str().starts_with("blob:"));
        assert_eq!(registry.bytes(&url), Some(Bytes::from_static(b"abc")));

        assert!(registry.release(url.as_str()));
        assert!(!registry.release(url.as_str()));
        assert!(!registry.is_live(&url));
        assert_eq!(
            registry.stats(),
            HandleStats {
                allocated: 1,
                released: 1
            }
        );
    }

    #[test]
    fn test_release_non_blob_is_noop() {
        let mut registry = HandleRegistry::new();
        registry.allocate(Bytes::from_static(b"x"), "video/mp4");

        assert!(!registry.release("data:image/png;base64,AAAA"));
        assert!(!registry.release("blob:never-allocated"));
        assert_eq!(registry.stats().released, 0);
        assert_eq!(registry.stats().live(), 1);
    }

    #[test]
    fn test_urls_are_unique() {
        let mut registry = HandleRegistry::new();
        let a = registry.allocate(Bytes::new(), "image/png");
        let b = registry.allocate(Bytes::new(), "image/png");
        assert_ne!(a, b);
        assert_eq!(registry.stats().live(), 2);
    }
}
