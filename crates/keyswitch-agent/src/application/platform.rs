//! Platform boundary consumed by the use cases.
//!
//! The production implementation lives in
//! `infrastructure::platform::windows`; tests use
//! [`crate::infrastructure::platform::mock::MockPlatform`] or the `mockall`
//! mocks generated here.

use keyswitch_core::{DeviceHandle, DeviceKind, LayoutId};
use thiserror::Error;

/// A platform (Win32) call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{call} failed: {reason}")]
pub struct PlatformCallError {
    /// Name of the API that failed, e.g. `"GetRawInputDeviceList"`.
    pub call: &'static str,
    /// OS-provided description or error code.
    pub reason: String,
}

impl PlatformCallError {
    pub fn new(call: &'static str, reason: impl std::fmt::Display) -> Self {
        Self {
            call,
            reason: reason.to_string(),
        }
    }
}

/// One row of the platform raw input device list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDeviceEntry {
    pub handle: DeviceHandle,
    pub kind: DeviceKind,
}

/// Read access to the attached raw input devices.
#[cfg_attr(test, mockall::automock)]
pub trait DeviceEnumerator: Send + Sync {
    /// Returns every attached raw input device, in platform order.
    fn list_devices(&self) -> Result<Vec<RawDeviceEntry>, PlatformCallError>;

    /// Resolves the durable device interface path of `handle`.
    fn device_name(&self, handle: DeviceHandle) -> Result<String, PlatformCallError>;
}

/// System-wide input language control.
#[cfg_attr(test, mockall::automock)]
pub trait LanguageSwitcher: Send + Sync {
    /// Asks every top-level application to switch its input language.
    fn broadcast_language_change(&self, layout: LayoutId) -> Result<(), PlatformCallError>;

    /// Makes `layout` the default input language for new windows.
    fn set_default_input_language(&self, layout: LayoutId) -> Result<(), PlatformCallError>;

    /// Lists the layouts installed for the current user.
    fn installed_layouts(&self) -> Result<Vec<LayoutId>, PlatformCallError>;
}
