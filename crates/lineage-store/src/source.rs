//! Extraction source over a local directory tree
//!
//! Buckets are directories under the root and keys are paths relative to the
//! bucket, so `fetch_extraction("docs", "2025/invoice.json")` reads
//! `<root>/docs/2025/invoice.json`.

use crate::StoreError;
use async_trait::async_trait;
use lineage_domain::traits::ExtractionSource;
use lineage_domain::DocumentExtraction;
use std::path::{Component, Path, PathBuf};

/// Reads extraction JSON documents from the file system
#[derive(Debug, Clone)]
pub struct FsExtractionSource {
    root: PathBuf,
}

impl FsExtractionSource {
    /// Serve buckets from directories under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `bucket`/`key` to a path under the root
    ///
    /// Rejects absolute paths and parent-directory components.
    pub fn resolve(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(bucket).join(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if bucket.is_empty() || key.is_empty() || escapes {
            return Err(StoreError::InvalidData(format!(
                "Invalid object location: {}/{}",
                bucket, key
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ExtractionSource for FsExtractionSource {
    type Error = StoreError;

    async fn fetch_extraction(&self, bucket: &str, key: &str) -> Result<DocumentExtraction, Self::Error> {
        let path = self.resolve(bucket, key)?;
        tracing::debug!(path = %path.display(), "Reading extraction");

        let bytes = tokio::fs::read(&path).await?;
        let extraction = serde_json::from_slice(&bytes)?;
        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_rejects_escape() {
        let source = FsExtractionSource::new("/data");
        assert!(source.resolve("docs", "../secret.json").is_err());
        assert!(source.resolve("docs", "/etc/passwd").is_err());
        assert!(source.resolve("", "a.json").is_err());
        assert_eq!(
            source.resolve("docs", "2025/a.json").unwrap(),
            PathBuf::from("/data/docs/2025/a.json")
        );
    }
}
