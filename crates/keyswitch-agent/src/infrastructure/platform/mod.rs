//! Platform adapters for the agent.
//!
//! On Windows, [`windows::RawInputHost`] owns a hidden top-level window that
//! receives `WM_INPUT` for every keyboard (even while another application has
//! focus) and `WM_POWERBROADCAST`.  The window procedure turns each message
//! into an [`EngineEvent`](crate::application::session::EngineEvent) and
//! hands it to the message loop through an `mpsc` channel, so all engine
//! work happens outside the callback.  [`windows::WindowsPlatform`]
//! implements the device and language traits with the raw input and
//! keyboard layout APIs.
//!
//! # Testability
//!
//! [`mock::MockPlatform`] implements the same traits over in-memory state, so
//! integration tests run on any OS.

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;
