//! Snapshot storage on local disk
//!
//! Files are named `face_<camera_id>_<unix-nanos><ext>` and opened with
//! create-new semantics. When a name is already taken the nanosecond part is
//! bumped, so two uploads never share a path and nothing is overwritten.

use async_trait::async_trait;
use facelog_core::{FaceLogError, ImageStore, Result, UploadedImage};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Writes uploaded images under a fixed directory
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    output_dir: PathBuf,
}

impl LocalImageStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write one image under the first free name at or after `not_before`
    ///
    /// Returns the path and the nanosecond stamp it used.
    async fn write_new(
        &self,
        camera_id: &str,
        image: &UploadedImage,
        not_before: u128,
    ) -> Result<(PathBuf, u128)> {
        let ext = image.extension();
        let mut stamp = unix_nanos().max(not_before);

        loop {
            let path = self
                .output_dir
                .join(format!("face_{camera_id}_{stamp}{ext}"));

            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    stamp += 1;
                    continue;
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Cannot create file");
                    return Err(FaceLogError::io(path, e));
                }
            };

            let written = match file.write_all(&image.bytes).await {
                Ok(()) => file.flush().await,
                Err(e) => Err(e),
            };
            drop(file);

            if let Err(e) = written {
                tracing::error!(path = %path.display(), error = %e, "Failed to copy file content");
                if let Err(rm) = tokio::fs::remove_file(&path).await {
                    tracing::warn!(path = %path.display(), error = %rm, "Partial file left on disk");
                }
                return Err(FaceLogError::io(path, e));
            }

            return Ok((path, stamp));
        }
    }
}

fn unix_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn save_all(&self, camera_id: &str, images: &[UploadedImage]) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| {
                tracing::error!(dir = %self.output_dir.display(), error = %e, "Cannot create output directory");
                FaceLogError::io(&self.output_dir, e)
            })?;

        let mut paths = Vec::with_capacity(images.len());
        let mut next_stamp = 0;

        for image in images {
            let (path, stamp) = self.write_new(camera_id, image, next_stamp).await?;
            tracing::debug!(path = %path.display(), bytes = image.bytes.len(), "Snapshot written");
            paths.push(path);
            next_stamp = stamp + 1;
        }

        Ok(paths)
    }
}
