//! Infrastructure layer for the agent.
//!
//! Contains OS-facing adapters: the Win32 raw input host and language
//! switcher, the console selection prompt and notifier, and file-system
//! storage for settings, the layout catalog and the device mapping.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `keyswitch_core`, but MUST NOT be imported by the `application` or domain
//! layers.

use thiserror::Error;

use crate::application::platform::PlatformCallError;

pub mod notifier;
pub mod platform;
pub mod prompt;
pub mod storage;

use storage::catalog_file::CatalogLoadError;

/// A condition that keeps the agent from starting at all.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Catalog(#[from] CatalogLoadError),

    #[error("could not create the raw input window: {0}")]
    HostWindow(PlatformCallError),

    #[error("could not register for keyboard raw input: {0}")]
    RawInputRegistration(PlatformCallError),

    #[error("another raw input host is already running in this process")]
    AlreadyRunning,

    #[error("platform not supported: {0}")]
    UnsupportedPlatform(String),
}
