//! File-backed watermark persistence.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::Watermark;

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("Failed to read watermark {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write watermark {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Watermark {path} holds an invalid timestamp: {value:?}")]
    Corrupt { path: PathBuf, value: String },
}

/// Stores the watermark as plain text in a single file.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so a reader sees either the old or the new value.
#[derive(Debug, Clone)]
pub struct FileWatermarkStore {
    path: PathBuf,
}

impl FileWatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored watermark, or `None` if the file is absent or blank.
    pub fn load(&self) -> Result<Option<Watermark>, WatermarkError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(WatermarkError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let value = contents.trim();
        if value.is_empty() {
            return Ok(None);
        }

        Watermark::parse(value)
            .map(Some)
            .ok_or_else(|| WatermarkError::Corrupt {
                path: self.path.clone(),
                value: value.to_string(),
            })
    }

    /// Atomically replaces the stored watermark.
    pub fn save(&self, watermark: &Watermark) -> Result<(), WatermarkError> {
        self.write_atomic(watermark.as_str())
            .map_err(|source| WatermarkError::Write {
                path: self.path.clone(),
                source,
            })?;
        debug!("Watermark {} -> {}", self.path.display(), watermark);
        Ok(())
    }

    fn write_atomic(&self, contents: &str) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
