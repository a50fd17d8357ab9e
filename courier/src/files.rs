//! Shared uploads directory: URL resolution, streamed downloads with an
//! atomic rename, and the stale-file sweep.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use futures::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::CourierError;

/// Handle over the shared uploads root.
#[derive(Debug, Clone)]
pub struct UploadsDir {
    root: PathBuf,
}

impl UploadsDir {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Reads `UPLOADS_DIR` (default `/shared/uploads`).
    pub fn from_env() -> Self {
        let root = std::env::var("UPLOADS_DIR").unwrap_or_else(|_| "/shared/uploads".into());
        Self::new(PathBuf::from(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a file reference to a local path inside the uploads root:
    /// - `file://` and absolute paths are checked for containment;
    /// - relative paths are joined to the root;
    /// - `http(s)` URLs are downloaded first.
    ///
    /// Anything escaping the root (including `..` tricks) is rejected.
    pub async fn resolve(&self, file_url: &str) -> Result<PathBuf, CourierError> {
        if file_url.starts_with("http://") || file_url.starts_with("https://") {
            return self.download(file_url).await;
        }

        let raw = file_url.strip_prefix("file://").unwrap_or(file_url);
        let path = Path::new(raw);

        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        let normalized = normalize(&resolved)?;
        if !normalized.starts_with(&self.root) {
            return Err(CourierError::InvalidPath(format!(
                "{} escapes the uploads root",
                resolved.display()
            )));
        }
        Ok(normalized)
    }

    /// Streams a remote file into the uploads root; the temporary part
    /// file is renamed into place only once fully written, so readers
    /// never observe a half-downloaded file.
    pub async fn download(&self, url: &str) -> Result<PathBuf, CourierError> {
        let file_name = url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("download");
        let target = self.root.join(format!("{}-{}", Uuid::new_v4(), file_name));
        let part = target.with_extension("part");

        debug!(url, target = %target.display(), "downloading file");

        let response = reqwest::get(url).await?;
        if !response.status().is_success() {
            return Err(CourierError::HttpStatus {
                status: response.status(),
                url: url.to_string(),
                snippet: String::new(),
            });
        }

        tokio::fs::create_dir_all(&self.root).await?;
        let mut file = tokio::fs::File::create(&part).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            tokio::io::AsyncWriteExt::write_all(&mut file, &chunk).await?;
        }
        tokio::io::AsyncWriteExt::flush(&mut file).await?;
        drop(file);

        tokio::fs::rename(&part, &target).await?;
        info!(url, target = %target.display(), "file downloaded");
        Ok(target)
    }

    /// Removes files whose mtime is older than `ttl_hours`, skipping any
    /// path referenced by an in-flight job. Returns the removed count.
    pub fn cleanup_stale(
        &self,
        ttl_hours: u64,
        in_flight: &HashSet<PathBuf>,
    ) -> Result<usize, CourierError> {
        let cutoff = SystemTime::now() - Duration::from_secs(ttl_hours * 3600);
        let mut removed = 0usize;

        for entry in walkdir::WalkDir::new(&self.root)
            .min_depth(1)
            .into_iter()
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if in_flight.contains(path) {
                debug!(path = %path.display(), "skipping in-flight file");
                continue;
            }
            let Ok(metadata) = entry.metadata() else { continue };
            let Ok(modified) = metadata.modified() else { continue };

            if modified < cutoff {
                match std::fs::remove_file(path) {
                    Ok(()) => {
                        removed += 1;
                        debug!(path = %path.display(), "stale file removed");
                    }
                    Err(err) => warn!(path = %path.display(), error = %err, "cleanup failed"),
                }
            }
        }

        if removed > 0 {
            info!(removed, ttl_hours, "shared file cleanup complete");
        }
        Ok(removed)
    }
}

/// Lexical normalization; `..` components are rejected outright instead
/// of resolved, which keeps the containment check sound without touching
/// the filesystem.
fn normalize(path: &Path) -> Result<PathBuf, CourierError> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                return Err(CourierError::InvalidPath(format!(
                    "parent traversal in {}",
                    path.display()
                )));
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uploads(root: &Path) -> UploadsDir {
        UploadsDir::new(root.to_path_buf())
    }

    #[tokio::test]
    async fn relative_paths_join_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = uploads(dir.path()).resolve("lists/price.xlsx").await.unwrap();
        assert_eq!(resolved, dir.path().join("lists/price.xlsx"));
    }

    #[tokio::test]
    async fn file_scheme_is_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("file://{}", dir.path().join("a.csv").display());
        let resolved = uploads(dir.path()).resolve(&url).await.unwrap();
        assert_eq!(resolved, dir.path().join("a.csv"));
    }

    #[tokio::test]
    async fn escaping_the_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let outside = uploads(dir.path()).resolve("/etc/passwd").await;
        assert!(matches!(outside, Err(CourierError::InvalidPath(_))));

        let traversal = uploads(dir.path()).resolve("../../etc/passwd").await;
        assert!(matches!(traversal, Err(CourierError::InvalidPath(_))));
    }

    #[test]
    fn cleanup_skips_fresh_and_in_flight_files() {
        let dir = tempfile::tempdir().unwrap();
        let fresh = dir.path().join("fresh.xlsx");
        std::fs::write(&fresh, b"x").unwrap();

        // A fresh file and an (empty) in-flight set: nothing to remove.
        let removed = uploads(dir.path())
            .cleanup_stale(24, &HashSet::new())
            .unwrap();
        assert_eq!(removed, 0);
        assert!(fresh.exists());
    }

    #[test]
    fn cleanup_removes_old_files() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.xlsx");
        std::fs::write(&old, b"x").unwrap();

        // ttl of zero hours makes every existing file stale.
        let removed = uploads(dir.path())
            .cleanup_stale(0, &HashSet::new())
            .unwrap();
        assert_eq!(removed, 1);
        assert!(!old.exists());
    }

    #[test]
    fn cleanup_honors_the_in_flight_set() {
        let dir = tempfile::tempdir().unwrap();
        let busy = dir.path().join("busy.xlsx");
        std::fs::write(&busy, b"x").unwrap();

        let mut in_flight = HashSet::new();
        in_flight.insert(busy.clone());

        let removed = uploads(dir.path()).cleanup_stale(0, &in_flight).unwrap();
        assert_eq!(removed, 0);
        assert!(busy.exists());
    }
}
