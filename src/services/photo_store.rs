//! PhotoStore: item photos as plain files under one uploads directory.
//!
//! Files carry no metadata of their own; the item record is the only link
//! between an item and its photo.

use crate::services::repository::{StorageError, StorageResult};
use bytes::Bytes;
use chrono::Utc;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

/// Extension every stored photo gets; photos are served as JPEG.
pub const PHOTO_EXTENSION: &str = "jpg";

const MAX_FILENAME_LEN: usize = 255;

#[derive(Debug, Clone)]
pub struct PhotoStore {
    root: PathBuf,
}

impl PhotoStore {
    /// Use `root` as the uploads directory, creating it if needed.
    pub async fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reject names that could escape the uploads directory.
    fn ensure_filename_safe(filename: &str) -> StorageResult<()> {
        if filename.is_empty() || filename.len() > MAX_FILENAME_LEN {
            return Err(StorageError::InvalidPhotoName);
        }
        if filename.starts_with('.') || filename.contains("..") {
            return Err(StorageError::InvalidPhotoName);
        }
        if filename
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'/' || b == b'\\')
        {
            return Err(StorageError::InvalidPhotoName);
        }
        Ok(())
    }

    fn path_for(&self, filename: &str) -> StorageResult<PathBuf> {
        Self::ensure_filename_safe(filename)?;
        Ok(self.root.join(filename))
    }

    /// `{unix-millis}-{6 hex chars}.{extension}`
    fn generate_filename(extension: &str) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!(
            "{}-{}.{}",
            Utc::now().timestamp_millis(),
            &suffix[..6],
            extension
        )
    }

    /// Store `bytes` under a freshly generated filename and return the name.
    ///
    /// Written to a temp file first, fsynced, then renamed into place.
    pub async fn save(&self, bytes: Bytes, extension: &str) -> StorageResult<String> {
        let filename = Self::generate_filename(extension);
        let final_path = self.path_for(&filename)?;
        let tmp_path = self.root.join(format!(".tmp-{}", Uuid::new_v4()));

        let mut file = File::create(&tmp_path).await?;
        if let Err(err) = write_and_sync(&mut file, &bytes).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
        drop(file);

        if let Err(err) = fs::rename(&tmp_path, &final_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }

        debug!(
            "stored photo {} ({} bytes)",
            final_path.display(),
            bytes.len()
        );
        Ok(filename)
    }

    /// Open a stored photo for streaming.
    ///
    /// Missing files and unsafe names both come back as `NotFound`.
    pub async fn open_photo(&self, filename: &str) -> StorageResult<File> {
        let path = self
            .path_for(filename)
            .map_err(|_| StorageError::NotFound(filename.to_string()))?;
        File::open(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StorageError::NotFound(filename.to_string())
            } else {
                StorageError::Io(err)
            }
        })
    }

    /// Whether a regular file exists under `filename`.
    pub async fn exists(&self, filename: &str) -> bool {
        match self.path_for(filename) {
            Ok(path) => fs::metadata(&path)
                .await
                .map(|meta| meta.is_file())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Remove a stored photo. A file that is already gone is not an error.
    pub async fn delete(&self, filename: &str) -> StorageResult<()> {
        let path = self.path_for(filename)?;
        match fs::remove_file(&path).await {
            Ok(_) => debug!("removed photo {}", path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("photo {} already missing", path.display());
            }
            Err(err) => return Err(StorageError::Io(err)),
        }
        Ok(())
    }

    /// Best-effort write/read/delete of a scratch file, for readiness checks.
    pub async fn probe(&self) -> Result<(), String> {
        let tmp_path = self.root.join(format!(".readyz-{}", Uuid::new_v4()));
        fs::write(&tmp_path, b"readyz")
            .await
            .map_err(|e| format!("could not write tmp file: {}", e))?;
        let read = fs::read(&tmp_path).await;
        let _ = fs::remove_file(&tmp_path).await;
        match read {
            Ok(bytes) if bytes == b"readyz" => Ok(()),
            Ok(_) => Err("file content mismatch".to_string()),
            Err(e) => Err(format!("could not read tmp file: {}", e)),
        }
    }
}

async fn write_and_sync(file: &mut File, body: &[u8]) -> io::Result<()> {
    file.write_all(body).await?;
    file.flush().await?;
    file.sync_all().await
}
