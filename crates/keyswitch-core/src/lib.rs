//! # keyswitch-core
//!
//! Shared library for KeySwitch containing the domain entities and the two
//! plain-text formats the application reads and writes.
//!
//! This crate has zero dependencies on OS APIs, UI frameworks, or the file
//! system.  Everything here can be unit-tested on any platform.
//!
//! # Architecture overview (for beginners)
//!
//! KeySwitch watches which physical keyboard produced the last keystroke and
//! switches the system input language to the layout the user associated with
//! that keyboard.  Plug a German keyboard and a US keyboard into the same
//! machine, type on either one, and the input language follows the hardware.
//!
//! This crate (`keyswitch-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – Layouts, devices, the layout catalog, the model behind the
//!   "which layout is this keyboard?" dialog, and power notifications.
//!
//! - **`format`** – Line codecs for the persisted device mapping file
//!   (`deviceName=0407`) and the layout catalog (`0407=German`).

pub mod domain;
pub mod format;

// Re-export the most-used types at the crate root so callers can write
// `keyswitch_core::LayoutId` instead of `keyswitch_core::domain::layout::LayoutId`.
pub use domain::catalog::LayoutCatalog;
pub use domain::device::{Device, DeviceHandle, DeviceKind};
pub use domain::layout::{Layout, LayoutId};
pub use domain::power::PowerEvent;
pub use domain::selection::SelectionState;
pub use format::{ConfigFormatError, FormatErrorKind};
