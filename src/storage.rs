use crate::capture::{PhotoFormat, RawPhotoData};
use crate::error::CaptureError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// A photo written by a [`PhotoStore`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPhoto {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub format: PhotoFormat,
}

/// Persistence collaborator for finished captures
#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn store(
        &self,
        photo: &RawPhotoData,
        format: PhotoFormat,
    ) -> Result<StoredPhoto, CaptureError>;

    /// Most recently stored photo, used for the last-photo thumbnail
    async fn latest(&self) -> Result<Option<PathBuf>, CaptureError>;
}

/// Writes photos as `<timestamp>_<request>.<ext>` into one directory
pub struct DirectoryPhotoStore {
    root: PathBuf,
}

impl DirectoryPhotoStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn file_name(photo: &RawPhotoData, format: PhotoFormat) -> String {
        // RAW data is always written as DNG, whatever format was requested
        let extension = if photo.is_raw {
            "dng"
        } else {
            format.extension()
        };
        let request: String = photo
            .request_id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(8)
            .collect();
        format!(
            "{}_{}.{}",
            photo.captured_at.format("%Y%m%d_%H%M%S%3f"),
            request,
            extension
        )
    }
}

#[async_trait]
impl PhotoStore for DirectoryPhotoStore {
    async fn store(
        &self,
        photo: &RawPhotoData,
        format: PhotoFormat,
    ) -> Result<StoredPhoto, CaptureError> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root)
                .await
                .map_err(|e| CaptureError::Persistence {
                    details: format!(
                        "Failed to create photo directory {}: {}",
                        self.root.display(),
                        e
                    ),
                })?;
            info!("Created photo directory: {}", self.root.display());
        }

        let path = self.root.join(Self::file_name(photo, format));
        fs::write(&path, &photo.bytes)
            .await
            .map_err(|e| CaptureError::Persistence {
                details: format!("Failed to write {}: {}", path.display(), e),
            })?;

        debug!("Stored {} bytes at {}", photo.bytes.len(), path.display());
        Ok(StoredPhoto {
            path,
            size_bytes: photo.bytes.len() as u64,
            format,
        })
    }

    async fn latest(&self) -> Result<Option<PathBuf>, CaptureError> {
        if !self.root.exists() {
            return Ok(None);
        }

        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| CaptureError::Persistence {
                details: format!("Failed to read {}: {}", self.root.display(), e),
            })?;

        // File names start with a sortable timestamp
        let mut latest: Option<PathBuf> = None;
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            CaptureError::Persistence {
                details: format!("Failed to scan {}: {}", self.root.display(), e),
            }
        })? {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if latest.as_ref().map_or(true, |current| path > *current) {
                latest = Some(path);
            }
        }
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::LensId;
    use chrono::{TimeZone, Utc};

    fn photo(request_id: &str, is_raw: bool, second: u32) -> RawPhotoData {
        RawPhotoData {
            request_id: request_id.to_string(),
            lens: LensId::new("back-wide"),
            bytes: vec![1, 2, 3, 4],
            is_raw,
            captured_at: Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, second).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_store_processed_photo() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryPhotoStore::new(dir.path().join("photos"));

        let stored = store
            .store(&photo("abc-123", false, 0), PhotoFormat::Jpeg)
            .await
            .unwrap();

        assert_eq!(stored.size_bytes, 4);
        assert_eq!(stored.path.extension().unwrap(), "jpg");
        assert!(stored
            .path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("20240307_120000000_abc123"));
        assert_eq!(std::fs::read(&stored.path).unwrap(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_raw_data_written_as_dng() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryPhotoStore::new(dir.path());

        let stored = store
            .store(&photo("raw", true, 0), PhotoFormat::ProRaw)
            .await
            .unwrap();

        assert_eq!(stored.path.extension().unwrap(), "dng");
    }

    #[tokio::test]
    async fn test_latest_returns_newest_photo() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryPhotoStore::new(dir.path().join("photos"));
        assert_eq!(store.latest().await.unwrap(), None);

        store
            .store(&photo("first", false, 1), PhotoFormat::Heif)
            .await
            .unwrap();
        let newest = store
            .store(&photo("second", false, 2), PhotoFormat::Heif)
            .await
            .unwrap();

        assert_eq!(store.latest().await.unwrap(), Some(newest.path));
    }

    #[tokio::test]
    async fn test_latest_reports_unreadable_directory() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_directory = dir.path().join("photos");
        std::fs::write(&not_a_directory, b"x").unwrap();
        let store = DirectoryPhotoStore::new(&not_a_directory);

        let result = store.latest().await;

        assert!(matches!(result, Err(CaptureError::Persistence { .. })));
    }
}
