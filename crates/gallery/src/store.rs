//! Filesystem image store.
//!
//! Images live flat in one public directory as
//! `<prefix>_<YYYYMMDDHHMMSS>.png` and are served under `/local/<file>`.
//! Writes go to a hidden, per-save `.part` file first and are renamed into
//! place, so a listed `.png` is always complete.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use weathercanvas_config::StorageConfig;
use weathercanvas_core::error::{AcquisitionError, StorageError};

const EXTENSION: &str = "png";

/// A `.png` file found in the store directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub file_name: String,
    pub path: PathBuf,
    pub modified: SystemTime,
    pub byte_len: u64,
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    directory: PathBuf,
    prefix: String,
    public_base_url: String,
}

impl ImageStore {
    pub fn new(
        directory: impl Into<PathBuf>,
        prefix: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(
            config.resolved_directory(),
            &config.file_prefix,
            &config.public_base_url,
        )
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// `<prefix>_<YYYYMMDDHHMMSS>.png`
    pub fn file_name_for(&self, at: DateTime<Utc>) -> String {
        format!("{}_{}.{EXTENSION}", self.prefix, at.format("%Y%m%d%H%M%S"))
    }

    pub fn local_path(file_name: &str) -> String {
        format!("/local/{file_name}")
    }

    pub fn full_url(&self, file_name: &str) -> String {
        format!("{}{}", self.public_base_url, Self::local_path(file_name))
    }

    /// Write `bytes` under the name derived from `at`.
    ///
    /// Two saves within the same second share a name; the later one replaces
    /// the earlier file.
    pub async fn persist(
        &self,
        bytes: &[u8],
        at: DateTime<Utc>,
    ) -> Result<(String, PathBuf), AcquisitionError> {
        let persistence = |what: &str, path: &Path, e: std::io::Error| {
            AcquisitionError::Persistence(format!("{what} {}: {e}", path.display()))
        };

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| persistence("cannot create", self.directory.as_path(), e))?;

        let file_name = self.file_name_for(at);
        let target = self.directory.join(&file_name);
        let staging = self
            .directory
            .join(format!(".{file_name}.{}.part", uuid::Uuid::new_v4().simple()));

        if let Err(e) = tokio::fs::write(&staging, bytes).await {
            discard_staging(&staging).await;
            return Err(persistence("cannot write", staging.as_path(), e));
        }

        if let Err(e) = tokio::fs::rename(&staging, &target).await {
            discard_staging(&staging).await;
            return Err(persistence("cannot move into place", target.as_path(), e));
        }

        debug!(file = %file_name, bytes = bytes.len(), "Image persisted");
        Ok((file_name, target))
    }

    /// All stored images, oldest first (ties by file name).
    pub async fn list(&self) -> Result<Vec<StoredImage>, StorageError> {
        list_images(&self.directory).await
    }

    /// Read a stored image by file name. `None` when it does not exist.
    pub async fn read(&self, file_name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        validate_file_name(file_name)?;
        let path = self.directory.join(file_name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed {
                path,
                reason: e.to_string(),
            }),
        }
    }
}

async fn discard_staging(staging: &Path) {
    match tokio::fs::remove_file(staging).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %staging.display(), error = %e, "Failed to remove staging file"),
    }
}

/// Accept only plain, visible `.png` names.
pub fn validate_file_name(file_name: &str) -> Result<(), StorageError> {
    let plain = !file_name.is_empty()
        && !file_name.starts_with('.')
        && !file_name.contains(['/', '\\', '\0'])
        && Path::new(file_name)
            .extension()
            .is_some_and(|ext| ext == EXTENSION);

    if plain {
        Ok(())
    } else {
        Err(StorageError::InvalidName(file_name.to_string()))
    }
}

/// List `.png` files in `directory`, oldest first. A missing directory is empty.
pub async fn list_images(directory: &Path) -> Result<Vec<StoredImage>, StorageError> {
    let list_failed = |e: std::io::Error| StorageError::ListFailed {
        path: directory.to_path_buf(),
        reason: e.to_string(),
    };

    let mut entries = match tokio::fs::read_dir(directory).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(list_failed(e)),
    };

    let mut images = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(list_failed)? {
        let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if validate_file_name(&file_name).is_err() {
            continue;
        }

        // The file may vanish between listing and stat.
        let metadata = match entry.metadata().await {
            Ok(m) if m.is_file() => m,
            Ok(_) => continue,
            Err(e) => {
                debug!(file = %file_name, error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        let modified = metadata.modified().map_err(list_failed)?;

        images.push(StoredImage {
            file_name,
            path: entry.path(),
            modified,
            byte_len: metadata.len(),
        });
    }

    images.sort_by(|a, b| {
        a.modified
            .cmp(&b.modified)
            .then_with(|| a.file_name.cmp(&b.file_name))
    });
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn store(dir: &Path) -> ImageStore {
        ImageStore::new(dir, "dalle", "http://canvas.local:8080/")
    }

    #[test]
    fn file_name_and_urls() {
        let store = store(Path::new("/tmp/unused"));
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let name = store.file_name_for(at);
        assert_eq!(name, "dalle_20240309070501.png");
        assert_eq!(ImageStore::local_path(&name), "/local/dalle_20240309070501.png");
        assert_eq!(
            store.full_url(&name),
            "http://canvas.local:8080/local/dalle_20240309070501.png"
        );
    }

    #[tokio::test]
    async fn persist_then_list_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir.path().join("www"));

        let (name, path) = store.persist(b"\x89PNG fake", Utc::now()).await.unwrap();
        assert!(path.exists());

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].file_name, name);
        assert_eq!(listed[0].byte_len, 9);

        assert_eq!(store.read(&name).await.unwrap().unwrap(), b"\x89PNG fake");
    }

    fn leftovers(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".part"))
            .collect()
    }

    #[tokio::test]
    async fn failed_save_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();

        // A non-empty directory squatting on the target name blocks the rename.
        let blocker = dir.path().join(store.file_name_for(at));
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), b"x").unwrap();

        let err = store.persist(b"img", at).await.unwrap_err();
        assert!(matches!(err, AcquisitionError::Persistence(_)));
        assert!(leftovers(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn same_second_saves_do_not_share_staging() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();

        let (first, second) = tokio::join!(
            store.persist(b"first", at),
            store.persist(b"second", at)
        );
        let (first_name, _) = first.unwrap();
        let (second_name, _) = second.unwrap();
        assert_eq!(first_name, second_name);

        let bytes = store.read(&first_name).await.unwrap().unwrap();
        assert!(bytes == b"first" || bytes == b"second");
        assert!(leftovers(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn staging_files_are_not_listed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".dalle_1.png.0f3a.part"), b"partial").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("dalle_1.png"), b"done").unwrap();

        let listed = list_images(dir.path()).await.unwrap();
        let names: Vec<_> = listed.iter().map(|i| i.file_name.as_str()).collect();
        assert_eq!(names, vec!["dalle_1.png"]);
    }

    #[tokio::test]
    async fn missing_directory_lists_empty() {
        let listed = list_images(Path::new("/nonexistent/weathercanvas")).await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn read_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        assert!(store.read("dalle_20000101000000.png").await.unwrap().is_none());
    }

    #[test]
    fn rejects_traversal_and_hidden_names() {
        for bad in ["../secret.png", "a/b.png", ".dalle.png.part", "", "config.toml", "x\\y.png"] {
            assert!(
                matches!(validate_file_name(bad), Err(StorageError::InvalidName(_))),
                "{bad} should be rejected"
            );
        }
        assert!(validate_file_name("dalle_20240309070501.png").is_ok());
    }
}
