//! The persisted device mapping file.
//!
//! Default location `%LOCALAPPDATA%\KeySwitch\devices.txt` (see
//! [`AppConfig::mapping_file_path`](super::config::AppConfig::mapping_file_path)).
//! The directory is created on the first save.  Writes go to a sibling
//! temporary file that is then renamed over the old one, so an interrupted
//! save leaves the previous mapping intact.
//!
//! A file the session refused to load is renamed to `devices.txt.rejected`
//! before a new mapping replaces it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::application::session::{MappingRepository, PersistenceIoError};

/// [`MappingRepository`] backed by a text file.
#[derive(Debug, Clone)]
pub struct MappingFile {
    path: PathBuf,
}

impl MappingFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where [`set_aside`](MappingRepository::set_aside) moves the file.
    pub fn rejected_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".rejected");
        self.path.with_file_name(name)
    }

    fn error(&self, action: &'static str, source: std::io::Error) -> PersistenceIoError {
        PersistenceIoError {
            action,
            location: self.path.display().to_string(),
            source,
        }
    }
}

impl MappingRepository for MappingFile {
    fn read(&self) -> Result<Option<String>, PersistenceIoError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.error("read", e)),
        }
    }

    fn write(&self, contents: &str) -> Result<(), PersistenceIoError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| self.error("write", e))?;
        }

        let staging = self.path.with_extension("txt.tmp");
        std::fs::write(&staging, contents).map_err(|e| self.error("write", e))?;
        std::fs::rename(&staging, &self.path).map_err(|e| {
            std::fs::remove_file(&staging).ok();
            self.error("write", e)
        })?;

        debug!("mapping written to {}", self.path.display());
        Ok(())
    }

    fn set_aside(&self) -> Result<String, PersistenceIoError> {
        let target = self.rejected_path();
        std::fs::rename(&self.path, &target).map_err(|e| self.error("set aside", e))?;
        Ok(target.display().to_string())
    }
}
