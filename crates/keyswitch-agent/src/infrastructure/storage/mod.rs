//! Storage infrastructure: the files the agent reads and writes.
//!
//! - **`config`** – `settings.toml` in the per-user config directory (log
//!   level, path overrides).  Missing file means defaults.
//! - **`catalog_file`** – the read-only layout catalog (`0407=German`),
//!   loaded once at startup.  A missing or malformed catalog is fatal.
//! - **`mapping_file`** – the device → layout mapping (`name=0407`), read at
//!   startup and rewritten on exit through the `MappingRepository` trait.
//!
//! Keeping storage concerns here means the line formats in `keyswitch_core`
//! and the use cases never see a path.

pub mod catalog_file;
pub mod config;
pub mod mapping_file;
