//! Loading the layout catalog file.
//!
//! The catalog is read once at startup.  Without it there is nothing to
//! offer in the selection prompt, so every failure here is fatal.

use std::path::{Path, PathBuf};

use keyswitch_core::{ConfigFormatError, LayoutCatalog};
use thiserror::Error;
use tracing::info;

use super::config::ConfigError;

/// File name of the catalog shipped next to the executable.
pub const CATALOG_FILE_NAME: &str = "layouts.txt";

/// The layout catalog could not be loaded.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("could not read layout catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("layout catalog {path} is malformed: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: ConfigFormatError,
    },

    #[error("layout catalog {path} lists no layouts")]
    Empty { path: PathBuf },
}

/// `layouts.txt` in the directory of the running executable.
///
/// # Errors
///
/// Returns [`ConfigError::NoExecutableDir`] if the executable path cannot be
/// resolved.
pub fn default_catalog_path() -> Result<PathBuf, ConfigError> {
    let exe = std::env::current_exe().map_err(|e| ConfigError::NoExecutableDir(e.to_string()))?;
    let dir = exe
        .parent()
        .ok_or_else(|| ConfigError::NoExecutableDir(format!("{} has no parent", exe.display())))?;
    Ok(dir.join(CATALOG_FILE_NAME))
}

/// Reads and parses the catalog at `path`.
///
/// # Errors
///
/// See [`CatalogLoadError`].
pub fn load_catalog(path: &Path) -> Result<LayoutCatalog, CatalogLoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| CatalogLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let catalog = LayoutCatalog::parse(&text).map_err(|source| CatalogLoadError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    if catalog.is_empty() {
        return Err(CatalogLoadError::Empty {
            path: path.to_path_buf(),
        });
    }

    info!("{} layouts loaded from {}", catalog.len(), path.display());
    Ok(catalog)
}
