//! MappingStore: which layout belongs to which keyboard.
//!
//! Two tables with different jobs:
//!
//! - `by_handle` (`DeviceHandle → LayoutId`) is consulted on every device
//!   change, so it is keyed by what a raw input event carries.
//! - `by_name` (`device name → DeviceHandle`) is built once from the
//!   [`DeviceSnapshot`] and only used to translate between the persisted,
//!   name-keyed file and the handle-keyed runtime table.
//!
//! # Persisted form
//!
//! ```text
//! \\?\HID#VID_046D&PID_C31C&MI_00#7&1b4e8f1&0&0000#{884b96c3-...}=0409
//! \\?\HID#VID_04F2&PID_0112&MI_00#7&2a1c39a&0&0000#{884b96c3-...}=0407
//! ```
//!
//! Loading is all-or-nothing: one malformed line and no entry from the file is
//! applied.  Entries for keyboards that are not attached right now are dropped
//! on load; they cannot produce input this session anyway.
//!
//! # Global mode
//!
//! When the device list could not be read there are no names to key on.  A
//! store created with [`MappingStore::global`] folds every handle onto one
//! shared key, so the first prompt decides the layout for all keyboards, and
//! nothing is persisted.

use std::collections::HashMap;
use std::io::{self, Write};

use keyswitch_core::format::mapping::{parse_mapping, write_mapping};
use keyswitch_core::{ConfigFormatError, DeviceHandle, LayoutId};
use thiserror::Error;
use tracing::{debug, warn};

use super::device_registry::DeviceSnapshot;

/// Key every handle folds onto in global mode.
const GLOBAL_KEY: DeviceHandle = DeviceHandle(usize::MAX);

/// Error returned by [`MappingStore::record`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("layout 0000 means \"no layout\" and cannot be recorded")]
    UnsetLayout,
}

/// Outcome of a successful [`MappingStore::load`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Entries applied to attached keyboards.
    pub restored: usize,
    /// Entries naming keyboards that are not attached.
    pub detached: usize,
}

/// Device → layout tables owned by the agent for the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct MappingStore {
    by_handle: HashMap<DeviceHandle, LayoutId>,
    by_name: HashMap<String, DeviceHandle>,
    /// Device names in enumeration order; the order `save` writes in.
    names: Vec<String>,
    global: bool,
}

impl MappingStore {
    /// Builds an empty store for the keyboards in `snapshot`.
    ///
    /// If two keyboards report the same name, the first one keeps it and the
    /// later ones are not persisted.
    pub fn from_snapshot(snapshot: &DeviceSnapshot) -> Self {
        let mut by_name = HashMap::with_capacity(snapshot.len());
        let mut names = Vec::with_capacity(snapshot.len());
        for device in snapshot.devices() {
            if by_name.contains_key(&device.name) {
                warn!(
                    "two keyboards report the name {:?}; only the first is persisted",
                    device.name
                );
                continue;
            }
            by_name.insert(device.name.clone(), device.handle);
            names.push(device.name.clone());
        }
        Self {
            by_handle: HashMap::new(),
            by_name,
            names,
            global: false,
        }
    }

    /// Builds a store in global mode (no device identities available).
    pub fn global() -> Self {
        Self {
            global: true,
            ..Self::default()
        }
    }

    pub fn is_global(&self) -> bool {
        self.global
    }

    /// The key `handle` is stored under: itself, or the shared key in global
    /// mode.
    pub fn key_for(&self, handle: DeviceHandle) -> DeviceHandle {
        if self.global {
            GLOBAL_KEY
        } else {
            handle
        }
    }

    /// Looks up the layout recorded for `handle`.
    pub fn resolve(&self, handle: DeviceHandle) -> Option<LayoutId> {
        self.by_handle.get(&self.key_for(handle)).copied()
    }

    /// Records (or replaces) the layout for `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::UnsetLayout`] for [`LayoutId::UNSET`].
    pub fn record(&mut self, handle: DeviceHandle, layout: LayoutId) -> Result<(), RecordError> {
        if layout.is_unset() {
            return Err(RecordError::UnsetLayout);
        }
        let key = self.key_for(handle);
        if let Some(previous) = self.by_handle.insert(key, layout) {
            debug!("mapping for {key} changed {previous} -> {layout}");
        }
        Ok(())
    }

    /// Handle of the attached keyboard called `name`.
    pub fn handle_for(&self, name: &str) -> Option<DeviceHandle> {
        self.by_name.get(name).copied()
    }

    /// Number of devices with a recorded layout.
    pub fn len(&self) -> usize {
        self.by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_handle.is_empty()
    }

    /// Read-only view of the handle → layout table.
    pub fn layouts(&self) -> &HashMap<DeviceHandle, LayoutId> {
        &self.by_handle
    }

    /// Applies a persisted mapping file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigFormatError`] if any line is malformed.  In that case
    /// the store is left exactly as it was.
    pub fn load(&mut self, source: &str) -> Result<LoadReport, ConfigFormatError> {
        let entries = parse_mapping(source)?;

        let mut report = LoadReport::default();
        for entry in entries {
            match self.by_name.get(&entry.device_name) {
                Some(&handle) => {
                    self.by_handle.insert(handle, entry.layout);
                    report.restored += 1;
                }
                None => {
                    debug!("{:?} is not attached; mapping not restored", entry.device_name);
                    report.detached += 1;
                }
            }
        }
        Ok(report)
    }

    /// Writes one `name=LAYOUT` line per attached keyboard with a recorded
    /// layout, in enumeration order.
    ///
    /// Returns the number of lines written.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from `sink`.
    pub fn save<W: Write + ?Sized>(&self, sink: &mut W) -> io::Result<usize> {
        let entries = self.names.iter().filter_map(|name| {
            let handle = self.by_name.get(name)?;
            let layout = self.by_handle.get(handle)?;
            Some((name.as_str(), *layout))
        });
        write_mapping(sink, entries)
    }

    /// [`save`](Self::save) into a `String`.
    pub fn render(&self) -> String {
        let mut out = Vec::new();
        // Writing into a Vec<u8> cannot fail.
        self.save(&mut out).ok();
        String::from_utf8_lossy(&out).into_owned()
    }
}
