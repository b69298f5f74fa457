//! Win32 raw input host and keyboard layout switching.
//!
//! The host registers a hidden top-level window as the `RIDEV_INPUTSINK`
//! target for the keyboard usage (page 1, usage 6), so every keystroke on
//! every keyboard produces a `WM_INPUT` carrying the originating device
//! handle, whichever application has focus.  Being top-level (not
//! message-only) the window also receives `WM_POWERBROADCAST` and
//! `WM_ENDSESSION`.
//!
//! # Shutdown
//!
//! Windows may end the process as soon as `WM_ENDSESSION` returns, and as
//! soon as a console control handler returns.  Work that must finish before
//! that (saving the mapping) is therefore run *inside* those callbacks
//! through the hooks registered with [`on_session_end`] and
//! [`install_console_handler`].
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for Windows API FFI calls.
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

#![cfg(target_os = "windows")]

use std::ffi::c_void;
use std::mem::size_of;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::OnceLock;

use keyswitch_core::{DeviceHandle, DeviceKind, LayoutId, PowerEvent};
use tracing::{debug, error, info, warn};
use windows::core::{w, Error as WinError};
use windows::Win32::Foundation::{BOOL, HANDLE, HINSTANCE, HWND, LPARAM, LRESULT, TRUE, WPARAM};
use windows::Win32::System::Console::SetConsoleCtrlHandler;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::StationsAndDesktops::{
    BroadcastSystemMessageW, BSF_POSTMESSAGE, BSM_APPLICATIONS,
};
use windows::Win32::UI::Input::KeyboardAndMouse::GetKeyboardLayoutList;
use windows::Win32::UI::Input::{
    GetRawInputData, GetRawInputDeviceInfoW, GetRawInputDeviceList, RegisterRawInputDevices,
    HRAWINPUT, RAWINPUTDEVICE, RAWINPUTDEVICELIST, RAWINPUTHEADER, RIDEV_INPUTSINK,
    RIDI_DEVICENAME, RID_HEADER, RIM_TYPEKEYBOARD, RIM_TYPEMOUSE,
};
use windows::Win32::UI::TextServices::HKL;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW, PeekMessageW,
    PostMessageW, PostQuitMessage, RegisterClassW, SystemParametersInfoW, MSG, PM_REMOVE,
    SPIF_SENDCHANGE, SPI_SETDEFAULTINPUTLANG, WINDOW_EX_STYLE, WINDOW_STYLE, WM_CLOSE,
    WM_DESTROY, WM_ENDSESSION, WM_INPUT, WM_INPUTLANGCHANGEREQUEST, WM_POWERBROADCAST,
    WM_QUERYENDSESSION, WNDCLASSW,
};

use crate::application::platform::{
    DeviceEnumerator, LanguageSwitcher, PlatformCallError, RawDeviceEntry,
};
use crate::application::session::EngineEvent;
use crate::application::switch_engine::Dispatch;
use crate::infrastructure::StartupError;

const HID_USAGE_PAGE_GENERIC: u16 = 0x01;
const HID_USAGE_GENERIC_KEYBOARD: u16 = 0x06;

/// Win32 calls report failure as `(UINT)-1`.
const CALL_FAILED: u32 = u32::MAX;

/// Sender used by the window procedure to hand events to the message loop.
/// Initialized once by [`RawInputHost::create`].
static EVENT_SENDER: OnceLock<Sender<EngineEvent>> = OnceLock::new();

/// The host window, for [`request_close`] from other threads.  Zero when no
/// window exists.
static HOST_WINDOW: AtomicIsize = AtomicIsize::new(0);

type ShutdownHook = Box<dyn Fn() + Send + Sync>;

/// Run on the window thread while `WM_ENDSESSION` is being handled.
static SESSION_END_HOOK: OnceLock<ShutdownHook> = OnceLock::new();

/// Run on the system's handler thread for every console control event.
static CONSOLE_HOOK: OnceLock<ShutdownHook> = OnceLock::new();

fn last_error(call: &'static str) -> PlatformCallError {
    PlatformCallError::new(call, WinError::from_win32())
}

// ── Device enumeration and language switching ────────────────────────────────

/// Production implementation of the platform traits.
#[derive(Debug, Default)]
pub struct WindowsPlatform;

impl WindowsPlatform {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceEnumerator for WindowsPlatform {
    fn list_devices(&self) -> Result<Vec<RawDeviceEntry>, PlatformCallError> {
        let entry_size = size_of::<RAWINPUTDEVICELIST>() as u32;
        let mut count = 0u32;

        // SAFETY: a null list pointer asks only for the device count.
        if unsafe { GetRawInputDeviceList(None, &mut count, entry_size) } == CALL_FAILED {
            return Err(last_error("GetRawInputDeviceList"));
        }

        let mut list = vec![RAWINPUTDEVICELIST::default(); count as usize];
        // SAFETY: `list` has room for `count` entries of `entry_size` bytes.
        let written =
            unsafe { GetRawInputDeviceList(Some(list.as_mut_ptr()), &mut count, entry_size) };
        if written == CALL_FAILED {
            return Err(last_error("GetRawInputDeviceList"));
        }
        list.truncate(written as usize);

        Ok(list
            .iter()
            .map(|device| RawDeviceEntry {
                handle: DeviceHandle(device.hDevice.0 as usize),
                kind: if device.dwType == RIM_TYPEKEYBOARD {
                    DeviceKind::Keyboard
                } else if device.dwType == RIM_TYPEMOUSE {
                    DeviceKind::Mouse
                } else {
                    DeviceKind::OtherHid
                },
            })
            .collect())
    }

    fn device_name(&self, handle: DeviceHandle) -> Result<String, PlatformCallError> {
        let device = HANDLE(handle.0 as *mut c_void);
        let mut chars = 0u32;

        // SAFETY: a null buffer asks for the name length in characters.
        unsafe { GetRawInputDeviceInfoW(device, RIDI_DEVICENAME, None, &mut chars) };
        if chars == 0 {
            return Err(last_error("GetRawInputDeviceInfoW"));
        }

        let mut buffer = vec![0u16; chars as usize];
        // SAFETY: `buffer` holds `chars` UTF-16 units, as reported above.
        let copied = unsafe {
            GetRawInputDeviceInfoW(
                device,
                RIDI_DEVICENAME,
                Some(buffer.as_mut_ptr() as *mut c_void),
                &mut chars,
            )
        };
        if copied == CALL_FAILED || copied == 0 {
            return Err(last_error("GetRawInputDeviceInfoW"));
        }

        let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
        Ok(String::from_utf16_lossy(&buffer[..len]))
    }
}

impl LanguageSwitcher for WindowsPlatform {
    fn broadcast_language_change(&self, layout: LayoutId) -> Result<(), PlatformCallError> {
        let mut recipients = BSM_APPLICATIONS;
        // SAFETY: `recipients` outlives the call; the message is posted, so
        // no receiver can block us.
        let result = unsafe {
            BroadcastSystemMessageW(
                BSF_POSTMESSAGE,
                Some(&mut recipients as *mut _),
                WM_INPUTLANGCHANGEREQUEST,
                WPARAM(0),
                LPARAM(layout.to_hkl_bits() as isize),
            )
        };
        if result < 0 {
            return Err(last_error("BroadcastSystemMessageW"));
        }
        debug!("WM_INPUTLANGCHANGEREQUEST {layout} broadcast");
        Ok(())
    }

    fn set_default_input_language(&self, layout: LayoutId) -> Result<(), PlatformCallError> {
        let mut hkl = HKL(layout.to_hkl_bits() as usize as *mut c_void);
        // SAFETY: SPI_SETDEFAULTINPUTLANG reads one HKL through `pvParam`.
        unsafe {
            SystemParametersInfoW(
                SPI_SETDEFAULTINPUTLANG,
                0,
                Some(&mut hkl as *mut HKL as *mut c_void),
                SPIF_SENDCHANGE,
            )
        }
        .map_err(|e| PlatformCallError::new("SystemParametersInfoW", e))
    }

    fn installed_layouts(&self) -> Result<Vec<LayoutId>, PlatformCallError> {
        // SAFETY: a `None` list asks only for the count.
        let count = unsafe { GetKeyboardLayoutList(None) };
        if count <= 0 {
            return Err(last_error("GetKeyboardLayoutList"));
        }

        let mut layouts = vec![HKL::default(); count as usize];
        // SAFETY: the slice length tells the API how many entries fit.
        let written = unsafe { GetKeyboardLayoutList(Some(layouts.as_mut_slice())) };
        if written <= 0 {
            return Err(last_error("GetKeyboardLayoutList"));
        }

        let mut ids: Vec<LayoutId> = layouts[..written as usize]
            .iter()
            .map(|hkl| LayoutId::from_hkl_bits(hkl.0 as usize))
            .collect();
        ids.dedup();
        Ok(ids)
    }
}

// ── Raw input host window ─────────────────────────────────────────────────────

/// Hidden window plus message loop delivering [`EngineEvent`]s.
pub struct RawInputHost {
    hwnd: HWND,
    events: Receiver<EngineEvent>,
}

impl RawInputHost {
    /// Creates the host window and registers it for keyboard raw input.
    ///
    /// Must be called on the thread that will later call [`run`](Self::run).
    ///
    /// # Errors
    ///
    /// - [`StartupError::AlreadyRunning`] on a second call in one process.
    /// - [`StartupError::HostWindow`] if the window cannot be created.
    /// - [`StartupError::RawInputRegistration`] if raw input registration is
    ///   refused.
    pub fn create() -> Result<Self, StartupError> {
        let (tx, rx) = mpsc::channel();
        EVENT_SENDER
            .set(tx)
            .map_err(|_| StartupError::AlreadyRunning)?;

        // SAFETY: a `None` module name returns the handle of this executable.
        let instance: HINSTANCE = unsafe { GetModuleHandleW(None) }
            .map_err(|e| StartupError::HostWindow(PlatformCallError::new("GetModuleHandleW", e)))?
            .into();
        let class_name = w!("KeySwitchRawInputHost");

        let class = WNDCLASSW {
            lpfnWndProc: Some(host_window_proc),
            hInstance: instance,
            lpszClassName: class_name,
            ..Default::default()
        };
        // SAFETY: `class` is fully initialised and its strings are static.
        if unsafe { RegisterClassW(&class) } == 0 {
            return Err(StartupError::HostWindow(last_error("RegisterClassW")));
        }

        // SAFETY: the class was registered above; no parent, menu or
        // creation parameter.  Style 0 keeps the window hidden.
        let hwnd = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE(0),
                class_name,
                w!("KeySwitch"),
                WINDOW_STYLE(0),
                0,
                0,
                0,
                0,
                None,
                None,
                instance,
                None,
            )
        }
        .map_err(|e| StartupError::HostWindow(PlatformCallError::new("CreateWindowExW", e)))?;
        HOST_WINDOW.store(hwnd.0 as isize, Ordering::SeqCst);

        let keyboard = RAWINPUTDEVICE {
            usUsagePage: HID_USAGE_PAGE_GENERIC,
            usUsage: HID_USAGE_GENERIC_KEYBOARD,
            dwFlags: RIDEV_INPUTSINK,
            hwndTarget: hwnd,
        };
        // SAFETY: one valid RAWINPUTDEVICE targeting our own window.
        unsafe { RegisterRawInputDevices(&[keyboard], size_of::<RAWINPUTDEVICE>() as u32) }
            .map_err(|e| {
                StartupError::RawInputRegistration(PlatformCallError::new(
                    "RegisterRawInputDevices",
                    e,
                ))
            })?;

        info!("raw input host ready");
        Ok(Self { hwnd, events: rx })
    }

    /// Runs the message loop until the window is closed, calling `on_event`
    /// for every event on this thread.
    ///
    /// Whenever `on_event` reports that a selection prompt was shown, the
    /// keyboard input that piled up behind the prompt is discarded.
    pub fn run<F>(&self, mut on_event: F)
    where
        F: FnMut(EngineEvent) -> Dispatch,
    {
        let mut msg = MSG::default();
        loop {
            // SAFETY: standard Win32 GetMessage/DispatchMessage loop pattern.
            let status = unsafe { GetMessageW(&mut msg, None, 0, 0) };
            match status.0 {
                0 => break,
                -1 => {
                    error!("GetMessageW failed: {}", WinError::from_win32());
                    break;
                }
                _ => {}
            }
            // SAFETY: `msg` was filled in by GetMessageW.
            unsafe { DispatchMessageW(&msg) };

            while let Ok(event) = self.events.try_recv() {
                if on_event(event).prompted() {
                    let discarded = self.discard_queued_input(&mut on_event);
                    debug!("{discarded} raw input event(s) discarded after prompt");
                }
            }
        }
        info!("message loop ended");
    }

    /// Removes queued `WM_INPUT` messages and drops their events.  Power
    /// events that were queued meanwhile are still delivered.
    fn discard_queued_input<F>(&self, on_event: &mut F) -> usize
    where
        F: FnMut(EngineEvent) -> Dispatch,
    {
        let mut msg = MSG::default();
        // SAFETY: PeekMessageW only removes messages of our own window; they
        // are dispatched so DefWindowProcW releases their raw input buffers.
        unsafe {
            while PeekMessageW(&mut msg, self.hwnd, WM_INPUT, WM_INPUT, PM_REMOVE).as_bool() {
                DispatchMessageW(&msg);
            }
        }

        let mut discarded = 0;
        while let Ok(event) = self.events.try_recv() {
            match event {
                EngineEvent::Power(_) => {
                    on_event(event);
                }
                _ => discarded += 1,
            }
        }
        discarded
    }
}

impl Drop for RawInputHost {
    fn drop(&mut self) {
        if HOST_WINDOW.swap(0, Ordering::SeqCst) != 0 {
            // SAFETY: the window is still alive and owned by this thread.
            unsafe { DestroyWindow(self.hwnd) }.ok();
        }
    }
}

/// Asks the host window to close.  Safe to call from any thread (the
/// console handler runs on its own).
pub fn request_close() {
    let raw = HOST_WINDOW.load(Ordering::SeqCst);
    if raw == 0 {
        return;
    }
    // SAFETY: PostMessageW may target a window owned by another thread.
    if let Err(e) = unsafe { PostMessageW(HWND(raw as *mut c_void), WM_CLOSE, WPARAM(0), LPARAM(0)) } {
        warn!("could not post WM_CLOSE: {e}");
    }
}

/// Registers work to finish before the process may be ended at logoff or
/// system shutdown.
///
/// The hook runs on the thread that runs [`RawInputHost::run`], possibly
/// while that thread is inside `on_event`, so it must not block on anything
/// `on_event` holds.  Only the first registration takes effect.
pub fn on_session_end(hook: impl Fn() + Send + Sync + 'static) {
    if SESSION_END_HOOK.set(Box::new(hook)).is_err() {
        warn!("session end hook already registered");
    }
}

/// Handles Ctrl-C, Ctrl-Break and console close.
///
/// `hook` runs on the handler thread and the process is not ended before it
/// returns; the host window is then asked to close.
///
/// # Errors
///
/// Returns [`PlatformCallError`] if the handler cannot be installed.
pub fn install_console_handler(
    hook: impl Fn() + Send + Sync + 'static,
) -> Result<(), PlatformCallError> {
    if CONSOLE_HOOK.set(Box::new(hook)).is_err() {
        warn!("console handler already installed");
        return Ok(());
    }
    // SAFETY: `console_ctrl_handler` is a plain function valid for the whole
    // process lifetime.
    unsafe { SetConsoleCtrlHandler(Some(console_ctrl_handler), TRUE) }
        .map_err(|e| PlatformCallError::new("SetConsoleCtrlHandler", e))
}

/// Console control handler.  Runs on a thread the system creates.
unsafe extern "system" fn console_ctrl_handler(ctrl_type: u32) -> BOOL {
    info!("console control event {ctrl_type} received");
    if let Some(hook) = CONSOLE_HOOK.get() {
        hook();
    }
    request_close();
    TRUE
}

fn send_event(event: EngineEvent) {
    if let Some(sender) = EVENT_SENDER.get() {
        // Ignore send errors (receiver gone during shutdown).
        let _ = sender.send(event);
    }
}

/// Reads the originating device of one `WM_INPUT`.
fn read_input_device(input: HRAWINPUT) -> Result<DeviceHandle, PlatformCallError> {
    let header_size = size_of::<RAWINPUTHEADER>() as u32;
    let mut header = RAWINPUTHEADER::default();
    let mut size = header_size;

    // SAFETY: `header` is a writable RAWINPUTHEADER of `size` bytes.
    let copied = unsafe {
        GetRawInputData(
            input,
            RID_HEADER,
            Some(&mut header as *mut RAWINPUTHEADER as *mut c_void),
            &mut size,
            header_size,
        )
    };
    if copied == CALL_FAILED {
        return Err(last_error("GetRawInputData"));
    }
    Ok(DeviceHandle(header.hDevice.0 as usize))
}

/// Window procedure of the host window.
///
/// # Safety
///
/// Called by Windows on the thread that created the window.  It must not
/// touch engine state; everything is forwarded through [`EVENT_SENDER`].
unsafe extern "system" fn host_window_proc(
    hwnd: HWND,
    msg: u32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    match msg {
        WM_INPUT => {
            let event = match read_input_device(HRAWINPUT(l_param.0 as *mut c_void)) {
                Ok(device) => EngineEvent::RawInput(device),
                Err(e) => EngineEvent::RawInputUnreadable(e),
            };
            send_event(event);
            // SAFETY: DefWindowProcW performs the WM_INPUT cleanup.
            DefWindowProcW(hwnd, msg, w_param, l_param)
        }
        WM_POWERBROADCAST => {
            send_event(EngineEvent::Power(PowerEvent::from_code(w_param.0 as u32)));
            LRESULT(1)
        }
        WM_QUERYENDSESSION => LRESULT(1),
        WM_ENDSESSION => {
            if w_param.0 != 0 {
                info!("user session ending");
                if let Some(hook) = SESSION_END_HOOK.get() {
                    hook();
                }
                PostQuitMessage(0);
            }
            LRESULT(0)
        }
        WM_CLOSE => {
            // SAFETY: `hwnd` is our own window.
            if HOST_WINDOW.swap(0, Ordering::SeqCst) != 0 {
                DestroyWindow(hwnd).ok();
            }
            LRESULT(0)
        }
        WM_DESTROY => {
            HOST_WINDOW.store(0, Ordering::SeqCst);
            PostQuitMessage(0);
            LRESULT(0)
        }
        // SAFETY: default handling for everything else.
        _ => DefWindowProcW(hwnd, msg, w_param, l_param),
    }
}
