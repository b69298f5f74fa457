//! Mock platform for tests.
//!
//! Simulates the attached keyboards and the system input language without a
//! Windows message loop.  Every language call is recorded so tests can assert
//! on exactly what would have been broadcast.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use keyswitch_core::{DeviceHandle, DeviceKind, LayoutId};

use crate::application::platform::{
    DeviceEnumerator, LanguageSwitcher, PlatformCallError, RawDeviceEntry,
};

/// An in-memory implementation of [`DeviceEnumerator`] and
/// [`LanguageSwitcher`].
pub struct MockPlatform {
    /// Attached devices with their names (`None` = name lookup fails).
    devices: Mutex<Vec<(RawDeviceEntry, Option<String>)>>,
    installed: Mutex<Vec<LayoutId>>,
    broadcasts: Mutex<Vec<LayoutId>>,
    defaults: Mutex<Vec<LayoutId>>,
    fail_enumeration: AtomicBool,
    fail_broadcast: AtomicBool,
}

impl MockPlatform {
    /// Creates a platform with no devices and no installed layouts.
    pub fn new() -> Self {
        Self {
            devices: Mutex::new(Vec::new()),
            installed: Mutex::new(Vec::new()),
            broadcasts: Mutex::new(Vec::new()),
            defaults: Mutex::new(Vec::new()),
            fail_enumeration: AtomicBool::new(false),
            fail_broadcast: AtomicBool::new(false),
        }
    }

    /// Attaches a keyboard.
    pub fn with_keyboard(self, handle: usize, name: &str) -> Self {
        self.with_device(handle, DeviceKind::Keyboard, Some(name))
    }

    /// Attaches any raw input device; `name: None` makes its name lookup fail.
    pub fn with_device(self, handle: usize, kind: DeviceKind, name: Option<&str>) -> Self {
        self.devices.lock().expect("lock poisoned").push((
            RawDeviceEntry {
                handle: DeviceHandle(handle),
                kind,
            },
            name.map(str::to_string),
        ));
        self
    }

    /// Sets the layouts reported as installed for the current user.
    pub fn with_installed(self, layouts: &[LayoutId]) -> Self {
        *self.installed.lock().expect("lock poisoned") = layouts.to_vec();
        self
    }

    /// Makes [`DeviceEnumerator::list_devices`] fail.
    pub fn set_fail_enumeration(&self, fail: bool) {
        self.fail_enumeration.store(fail, Ordering::SeqCst);
    }

    /// Makes [`LanguageSwitcher::broadcast_language_change`] fail.
    pub fn set_fail_broadcast(&self, fail: bool) {
        self.fail_broadcast.store(fail, Ordering::SeqCst);
    }

    /// Layouts broadcast so far, in order.
    pub fn broadcasts(&self) -> Vec<LayoutId> {
        self.broadcasts.lock().expect("lock poisoned").clone()
    }

    /// Layouts made the default input language so far, in order.
    pub fn defaults(&self) -> Vec<LayoutId> {
        self.defaults.lock().expect("lock poisoned").clone()
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceEnumerator for MockPlatform {
    fn list_devices(&self) -> Result<Vec<RawDeviceEntry>, PlatformCallError> {
        if self.fail_enumeration.load(Ordering::SeqCst) {
            return Err(PlatformCallError::new("GetRawInputDeviceList", "simulated failure"));
        }
        Ok(self
            .devices
            .lock()
            .expect("lock poisoned")
            .iter()
            .map(|(entry, _)| *entry)
            .collect())
    }

    fn device_name(&self, handle: DeviceHandle) -> Result<String, PlatformCallError> {
        self.devices
            .lock()
            .expect("lock poisoned")
            .iter()
            .find(|(entry, _)| entry.handle == handle)
            .and_then(|(_, name)| name.clone())
            .ok_or_else(|| PlatformCallError::new("GetRawInputDeviceInfoW", "no such device"))
    }
}

impl LanguageSwitcher for MockPlatform {
    fn broadcast_language_change(&self, layout: LayoutId) -> Result<(), PlatformCallError> {
        if self.fail_broadcast.load(Ordering::SeqCst) {
            return Err(PlatformCallError::new("BroadcastSystemMessageW", "simulated failure"));
        }
        self.broadcasts.lock().expect("lock poisoned").push(layout);
        Ok(())
    }

    fn set_default_input_language(&self, layout: LayoutId) -> Result<(), PlatformCallError> {
        self.defaults.lock().expect("lock poisoned").push(layout);
        Ok(())
    }

    fn installed_layouts(&self) -> Result<Vec<LayoutId>, PlatformCallError> {
        Ok(self.installed.lock().expect("lock poisoned").clone())
    }
}
