//! Artifact persistence. A sink resolves relative bundle paths under its
//! root and never overwrites: colliding names get a numbered suffix, the way
//! a download manager uniquifies.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::SinkError;

#[derive(Debug, Clone)]
pub struct WriteReceipt {
    /// Final path the payload landed at, after any renaming.
    pub path: String,
}

#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn submit(&self, rel_path: &str, payload: &[u8]) -> Result<WriteReceipt, SinkError>;
}

pub struct DiskSink {
    root: PathBuf,
}

impl DiskSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DiskSink { root: root.into() }
    }
}

#[async_trait]
impl ArtifactSink for DiskSink {
    async fn submit(&self, rel_path: &str, payload: &[u8]) -> Result<WriteReceipt, SinkError> {
        let target = self.root.join(rel_path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SinkError::io(parent, e))?;
        }
        let target = unique_path(target).await?;
        tokio::fs::write(&target, payload)
            .await
            .map_err(|e| SinkError::io(&target, e))?;
        tracing::debug!(path = %target.display(), bytes = payload.len(), "artifact written");
        Ok(WriteReceipt {
            path: target.display().to_string(),
        })
    }
}

/// First free variant of `path`: the path itself, then `stem (1).ext`,
/// `stem (2).ext`, and so on.
async fn unique_path(path: PathBuf) -> Result<PathBuf, SinkError> {
    if !exists(&path).await? {
        return Ok(path);
    }
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("artifact");
    let ext = path.extension().and_then(|s| s.to_str());
    for n in 1..10_000u32 {
        let name = match ext {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        };
        let candidate = path.with_file_name(name);
        if !exists(&candidate).await? {
            return Ok(candidate);
        }
    }
    Err(SinkError::io(
        &path,
        std::io::Error::new(std::io::ErrorKind::AlreadyExists, "no free artifact name"),
    ))
}

async fn exists(path: &Path) -> Result<bool, SinkError> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| SinkError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn submit_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DiskSink::new(dir.path());

        let receipt = sink
            .submit("ProfileCapture_20250101/Jane_120000/metadata.json", b"{}")
            .await
            .unwrap();

        assert!(receipt.path.ends_with("metadata.json"));
        let written = tokio::fs::read(&receipt.path).await.unwrap();
        assert_eq!(written, b"{}");
    }

    #[tokio::test]
    async fn collisions_get_numbered_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DiskSink::new(dir.path());

        let first = sink.submit("run/metadata.json", b"a").await.unwrap();
        let second = sink.submit("run/metadata.json", b"b").await.unwrap();
        let third = sink.submit("run/metadata.json", b"c").await.unwrap();

        assert!(first.path.ends_with("metadata.json"));
        assert!(second.path.ends_with("metadata (1).json"));
        assert!(third.path.ends_with("metadata (2).json"));
        assert_eq!(tokio::fs::read(&first.path).await.unwrap(), b"a");
        assert_eq!(tokio::fs::read(&second.path).await.unwrap(), b"b");
    }

    #[tokio::test]
    async fn extensionless_names_still_uniquify() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DiskSink::new(dir.path());

        sink.submit("run/notes", b"a").await.unwrap();
        let second = sink.submit("run/notes", b"b").await.unwrap();

        assert!(second.path.ends_with("notes (1)"));
    }
}
