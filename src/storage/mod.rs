use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use thiserror::Error;

const PREVIEW_PREFIX: &str = "leaf_";
const DEFAULT_PREVIEW_EXTENSION: &str = "jpg";
const RUNTIME_SUBDIR: &str = "smartfarm";
const DEFAULT_FALLBACK_TEMP_DIR: &str = "/tmp/smartfarm";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("preview id is empty")]
    MissingPreviewId,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Default, Clone)]
pub struct PruneReport {
    pub removed_files: usize,
}

/// Display reference to a captured or uploaded still.
///
/// Not `Clone`: each handle owns exactly one preview file and must be handed
/// back to [`PreviewStore::revoke`] when the image is replaced or the session resets.
#[derive(Debug, PartialEq, Eq)]
pub struct PreviewHandle {
    id: String,
    path: PathBuf,
}

impl PreviewHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Writes preview files for the capture workflow and cleans them up.
#[derive(Debug, Clone)]
pub struct PreviewStore {
    dir: PathBuf,
}

impl PreviewStore {
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn with_default_dir() -> StorageResult<Self> {
        let dir = default_runtime_dir();
        fs::create_dir_all(&dir)?;
        Ok(Self::with_dir(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn preview_path(&self, preview_id: &str, mime_type: &str) -> StorageResult<PathBuf> {
        if preview_id.is_empty() {
            return Err(StorageError::MissingPreviewId);
        }
        let extension = preview_extension(mime_type);
        let mut path = self.dir.clone();
        path.push(format!("{PREVIEW_PREFIX}{preview_id}.{extension}"));
        Ok(path)
    }

    pub fn create_preview(
        &self,
        preview_id: &str,
        mime_type: &str,
        bytes: &[u8],
    ) -> StorageResult<PreviewHandle> {
        let path = self.preview_path(preview_id, mime_type)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "preview created");
        Ok(PreviewHandle {
            id: preview_id.to_string(),
            path,
        })
    }

    pub fn revoke(&self, handle: PreviewHandle) -> StorageResult<()> {
        match fs::remove_file(&handle.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %handle.path.display(),
                    "preview file was already missing during revoke"
                );
                Ok(())
            }
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    pub fn prune_stale_previews(&self, max_age_hours: u64) -> StorageResult<PruneReport> {
        let now = SystemTime::now();
        let mut report = PruneReport::default();
        let max_age = Duration::from_secs(max_age_hours.saturating_mul(60 * 60));

        if !self.dir.exists() {
            return Ok(report);
        }

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            if path
                .file_name()
                .and_then(|name| name.to_str())
                .is_none_or(|name| !name.starts_with(PREVIEW_PREFIX))
            {
                continue;
            }

            let modified = fs::metadata(&path)?.modified()?;
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);

            if age > max_age {
                match fs::remove_file(&path) {
                    Ok(()) => report.removed_files += 1,
                    Err(err) => {
                        tracing::warn!(
                            path = %path.display(),
                            ?err,
                            "failed to remove stale preview file"
                        );
                    }
                }
            }
        }

        Ok(report)
    }
}

/// File extension for an image MIME type; unrecognised types keep `jpg`.
fn preview_extension(mime_type: &str) -> &'static str {
    image::ImageFormat::from_mime_type(mime_type)
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or(DEFAULT_PREVIEW_EXTENSION)
}

fn default_runtime_dir() -> PathBuf {
    std::env::var("XDG_RUNTIME_DIR")
        .map(|dir| PathBuf::from(dir).join(RUNTIME_SUBDIR))
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_FALLBACK_TEMP_DIR))
}
