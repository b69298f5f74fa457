//! Physical input devices as seen by the raw input subsystem.

use std::fmt;

/// Session-scoped identifier of an attached input device.
///
/// The platform hands these out per boot (and may recycle them after an
/// unplug/replug), so they are only ever used as in-memory keys.  The null
/// handle marks input that did not come from a physical device (e.g. input
/// injected with `SendInput` or an on-screen keyboard).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DeviceHandle(pub usize);

impl DeviceHandle {
    /// The handle attached to synthetic input.
    pub const NULL: DeviceHandle = DeviceHandle(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Device class reported by the platform device list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Keyboard,
    Mouse,
    /// Any other HID device (game pads, consumer control, ...).
    OtherHid,
}

/// An attached keyboard with its durable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Session handle, valid until the device is unplugged or the OS reboots.
    pub handle: DeviceHandle,
    /// Stable device interface path, e.g.
    /// `\\?\HID#VID_046D&PID_C31C&MI_00#7&1b4e8f1&0&0000#{884b96c3-56ef-11d1-bc8c-00a0c91405dd}`.
    pub name: String,
}
