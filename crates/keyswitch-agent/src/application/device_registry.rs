//! Device registry: the keyboards attached when the agent started.
//!
//! Raw input events only carry a session *handle*.  Handles are handed out
//! per boot and cannot be persisted, so at startup every attached keyboard is
//! enumerated once and its durable device interface path (its *name*) is
//! recorded next to the handle.  The resulting [`DeviceSnapshot`] is the only
//! place the mapping store learns names from.
//!
//! Devices plugged in after startup are not picked up (no hot-plug support).

use keyswitch_core::{Device, DeviceHandle, DeviceKind};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::platform::{DeviceEnumerator, PlatformCallError};

/// The platform device list could not be read.
///
/// Without device identities the agent falls back to a single global mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not enumerate keyboards: {0}")]
pub struct DeviceEnumerationError(#[from] pub PlatformCallError);

/// Immutable list of attached keyboards, in platform enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSnapshot {
    devices: Vec<Device>,
}

impl DeviceSnapshot {
    pub fn new(devices: Vec<Device>) -> Self {
        Self { devices }
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Name of the device with `handle`, if it was attached at startup.
    pub fn name_of(&self, handle: DeviceHandle) -> Option<&str> {
        self.devices
            .iter()
            .find(|d| d.handle == handle)
            .map(|d| d.name.as_str())
    }
}

/// Enumerates the attached keyboards and resolves their names.
///
/// Non-keyboard devices are skipped.  A keyboard whose name cannot be
/// resolved is skipped with a warning; it still works for the session but
/// its mapping is not persisted.
///
/// # Errors
///
/// Returns [`DeviceEnumerationError`] when the device list itself cannot be
/// read.
pub fn enumerate_keyboards(
    enumerator: &dyn DeviceEnumerator,
) -> Result<DeviceSnapshot, DeviceEnumerationError> {
    let entries = enumerator.list_devices()?;
    let mut devices = Vec::new();

    for entry in entries.iter().filter(|e| e.kind == DeviceKind::Keyboard) {
        match enumerator.device_name(entry.handle) {
            Ok(name) => {
                debug!("keyboard {} = {name}", entry.handle);
                devices.push(Device {
                    handle: entry.handle,
                    name,
                });
            }
            Err(e) => warn!("skipping keyboard {}: {e}", entry.handle),
        }
    }

    info!(
        "{} keyboard(s) attached ({} raw input devices total)",
        devices.len(),
        entries.len()
    );
    Ok(DeviceSnapshot::new(devices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::platform::{MockDeviceEnumerator, RawDeviceEntry};

    fn entry(handle: usize, kind: DeviceKind) -> RawDeviceEntry {
        RawDeviceEntry {
            handle: DeviceHandle(handle),
            kind,
        }
    }

    #[test]
    fn test_enumerate_keeps_only_keyboards_in_platform_order() {
        // Arrange
        let mut enumerator = MockDeviceEnumerator::new();
        enumerator.expect_list_devices().returning(|| {
            Ok(vec![
                entry(0x20, DeviceKind::Keyboard),
                entry(0x30, DeviceKind::Mouse),
                entry(0x10, DeviceKind::Keyboard),
                entry(0x40, DeviceKind::OtherHid),
            ])
        });
        enumerator
            .expect_device_name()
            .times(2)
            .returning(|h| Ok(format!("KBD-{:x}", h.0)));

        // Act
        let snapshot = enumerate_keyboards(&enumerator).expect("enumeration succeeds");

        // Assert
        let names: Vec<&str> = snapshot.devices().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["KBD-20", "KBD-10"]);
        assert_eq!(snapshot.name_of(DeviceHandle(0x10)), Some("KBD-10"));
        assert_eq!(snapshot.name_of(DeviceHandle(0x30)), None);
    }

    #[test]
    fn test_enumerate_skips_keyboard_with_unresolvable_name() {
        let mut enumerator = MockDeviceEnumerator::new();
        enumerator.expect_list_devices().returning(|| {
            Ok(vec![
                entry(1, DeviceKind::Keyboard),
                entry(2, DeviceKind::Keyboard),
            ])
        });
        enumerator.expect_device_name().returning(|h| {
            if h.0 == 1 {
                Err(PlatformCallError::new("GetRawInputDeviceInfoW", "access denied"))
            } else {
                Ok("KBD2".to_string())
            }
        });

        let snapshot = enumerate_keyboards(&enumerator).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.devices()[0].name, "KBD2");
    }

    #[test]
    fn test_enumerate_failure_is_device_enumeration_error() {
        let mut enumerator = MockDeviceEnumerator::new();
        enumerator
            .expect_list_devices()
            .returning(|| Err(PlatformCallError::new("GetRawInputDeviceList", "error 87")));
        enumerator.expect_device_name().never();

        let err = enumerate_keyboards(&enumerator).unwrap_err();

        assert_eq!(err.0.call, "GetRawInputDeviceList");
        assert!(err.to_string().contains("could not enumerate keyboards"));
    }

    #[test]
    fn test_no_keyboards_is_an_empty_snapshot_not_an_error() {
        let mut enumerator = MockDeviceEnumerator::new();
        enumerator
            .expect_list_devices()
            .returning(|| Ok(vec![entry(5, DeviceKind::Mouse)]));

        let snapshot = enumerate_keyboards(&enumerator).unwrap();

        assert!(snapshot.is_empty());
    }
}
