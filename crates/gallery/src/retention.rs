//! Count-based retention of stored images.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use weathercanvas_core::error::StorageError;

use crate::store::list_images;

/// Keeps the store directory at no more than `max_retained` images.
#[derive(Debug, Clone)]
pub struct RetentionManager {
    directory: PathBuf,
    max_retained: usize,
}

impl RetentionManager {
    pub fn new(directory: impl Into<PathBuf>, max_retained: usize) -> Self {
        Self {
            directory: directory.into(),
            max_retained,
        }
    }

    pub fn max_retained(&self) -> usize {
        self.max_retained
    }

    pub async fn evict(&self) -> Result<usize, StorageError> {
        evict(&self.directory, self.max_retained).await
    }
}

/// Delete the oldest `.png` files until at most `max_retained` remain.
///
/// Files that cannot be deleted are logged and skipped. Returns the number
/// actually removed.
pub async fn evict(directory: &Path, max_retained: usize) -> Result<usize, StorageError> {
    evict_with(directory, max_retained, tokio::fs::remove_file).await
}

async fn evict_with<F, Fut>(
    directory: &Path,
    max_retained: usize,
    mut remove: F,
) -> Result<usize, StorageError>
where
    F: FnMut(PathBuf) -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    let images = list_images(directory).await?;
    let excess = images.len().saturating_sub(max_retained);

    debug!(
        dir = %directory.display(),
        found = images.len(),
        max_retained,
        excess,
        "Retention pass"
    );

    let mut removed = 0;
    for image in images.into_iter().take(excess) {
        match remove(image.path).await {
            Ok(()) => {
                debug!(file = %image.file_name, "Evicted image");
                removed += 1;
            }
            Err(e) => {
                warn!(file = %image.file_name, error = %e, "Failed to evict image");
            }
        }
    }

    if removed > 0 {
        info!(removed, "Old images evicted");
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::{Duration, SystemTime};

    /// Create `count` images whose mtimes increase with their index.
    fn seed(dir: &Path, count: u64) {
        let base = SystemTime::now() - Duration::from_secs(3600);
        for i in 0..count {
            let path = dir.join(format!("dalle_2024010100{i:04}.png"));
            std::fs::write(&path, b"img").unwrap();
            File::options()
                .write(true)
                .open(&path)
                .unwrap()
                .set_modified(base + Duration::from_secs(i * 60))
                .unwrap();
        }
    }

    fn remaining(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn seven_images_with_max_five_removes_two_oldest() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), 7);

        let removed = evict(dir.path(), 5).await.unwrap();
        assert_eq!(removed, 2);

        let left = remaining(dir.path());
        assert_eq!(left.len(), 5);
        assert!(!left.contains(&"dalle_20240101000000.png".to_string()));
        assert!(!left.contains(&"dalle_20240101000001.png".to_string()));
        assert!(left.contains(&"dalle_20240101000006.png".to_string()));
    }

    #[tokio::test]
    async fn undeletable_image_is_skipped_and_not_counted() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), 7);
        let stuck = dir.path().join("dalle_20240101000000.png");

        let removed = evict_with(dir.path(), 5, |path: PathBuf| {
            let stuck = stuck.clone();
            async move {
                if path == stuck {
                    Err(std::io::Error::new(
                        std::io::ErrorKind::PermissionDenied,
                        "read-only",
                    ))
                } else {
                    tokio::fs::remove_file(path).await
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(removed, 1);

        let left = remaining(dir.path());
        assert_eq!(left.len(), 6);
        assert!(left.contains(&"dalle_20240101000000.png".to_string()));
        assert!(!left.contains(&"dalle_20240101000001.png".to_string()));
    }

    #[tokio::test]
    async fn eviction_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), 6);

        let manager = RetentionManager::new(dir.path(), 5);
        assert_eq!(manager.evict().await.unwrap(), 1);
        assert_eq!(manager.evict().await.unwrap(), 0);
        assert_eq!(remaining(dir.path()).len(), 5);
    }

    #[tokio::test]
    async fn oldest_by_mtime_not_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        for (name, age) in [("b_new.png", 10), ("a_old.png", 500), ("c_mid.png", 100)] {
            let path = dir.path().join(name);
            std::fs::write(&path, b"img").unwrap();
            File::options()
                .write(true)
                .open(&path)
                .unwrap()
                .set_modified(now - Duration::from_secs(age))
                .unwrap();
        }

        assert_eq!(evict(dir.path(), 1).await.unwrap(), 2);
        assert_eq!(remaining(dir.path()), vec!["b_new.png".to_string()]);
    }

    #[tokio::test]
    async fn under_limit_and_missing_directory_remove_nothing() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), 3);
        assert_eq!(evict(dir.path(), 5).await.unwrap(), 0);
        assert_eq!(evict(&dir.path().join("absent"), 5).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn non_png_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path(), 2);
        std::fs::write(dir.path().join("index.html"), b"<html/>").unwrap();

        assert_eq!(evict(dir.path(), 1).await.unwrap(), 1);
        assert!(dir.path().join("index.html").exists());
    }
}
