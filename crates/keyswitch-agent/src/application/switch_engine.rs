//! SwitchEngine: follows the keyboard being typed on with the input language.
//!
//! This use case is the heart of the agent.  It receives the device handle of
//! every raw keyboard event, and whenever the typing device changes it looks
//! the new device up in the [`MappingStore`], asks the user about unknown
//! devices through the [`SelectionPrompt`], and switches the system input
//! language through the [`LanguageSwitcher`].
//!
//! # State machine
//!
//! ```text
//!            raw input from a new device, layout unknown
//!   Idle ───────────────────────────────────────────────► AwaitingSelection
//!    ▲                                                          │
//!    └──────────────── prompt answered or cancelled ◄───────────┘
//! ```
//!
//! While `AwaitingSelection`, raw input is dropped: the prompt itself moves
//! focus and generates keystrokes, and queueing those would only stack a
//! second prompt on top of the first.
//!
//! # Architecture
//!
//! The engine depends only on traits and domain types.  All infrastructure
//! implementations are injected at construction time, making the engine fully
//! unit-testable.

use std::sync::Arc;

use keyswitch_core::{DeviceHandle, Layout, LayoutCatalog, LayoutId, PowerEvent};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::mapping_store::{MappingStore, RecordError};
use super::platform::{LanguageSwitcher, PlatformCallError};

/// Answer of the selection prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The user picked this layout.
    Chosen(Layout),
    /// The user dismissed the prompt without choosing.
    Cancelled,
}

/// The selection prompt could not interact with the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("layout selection prompt failed: {0}")]
pub struct PromptError(pub String);

/// Modal "which layout does this keyboard use?" request.
///
/// Blocks the calling (control) thread until the user answers; there is no
/// timeout.
#[cfg_attr(test, mockall::automock)]
pub trait SelectionPrompt: Send + Sync {
    /// Shows `candidates` (never empty, first entry pre-selected) and returns
    /// the user's answer.
    fn request_selection(&self, candidates: &[Layout]) -> Result<Selection, PromptError>;
}

/// Error type for the switch engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Platform(#[from] PlatformCallError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("the layout catalog is empty; nothing to choose from")]
    NoCandidates,
    #[error("prompt returned an unusable layout: {0}")]
    InvalidSelection(#[from] RecordError),
}

/// Whether a selection prompt is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Idle,
    AwaitingSelection,
}

/// What handling one raw input event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The event was discarded: a prompt was open, or the event could not
    /// be read.
    Dropped,
    /// Synthetic input with no physical device, or a non-input event.
    Ignored,
    /// Same device as the previous event; nothing to do.
    SameDevice,
    /// The device changed and the system language was switched.
    Switched { layout: LayoutId, prompted: bool },
    /// The device changed but its layout is already active.
    AlreadyActive { layout: LayoutId, prompted: bool },
    /// The device was unknown and the user dismissed the prompt.
    Cancelled,
}

impl Dispatch {
    /// Whether a selection prompt was shown while handling the event.
    pub fn prompted(&self) -> bool {
        match self {
            Dispatch::Switched { prompted, .. } | Dispatch::AlreadyActive { prompted, .. } => {
                *prompted
            }
            Dispatch::Cancelled => true,
            _ => false,
        }
    }
}

/// The switch engine: all mutable per-process state of the agent.
pub struct SwitchEngine {
    store: MappingStore,
    catalog: LayoutCatalog,
    switcher: Arc<dyn LanguageSwitcher>,
    prompt: Arc<dyn SelectionPrompt>,
    state: EngineState,
    /// Store key of the device that produced the last processed event.
    current_device: Option<DeviceHandle>,
    /// Layout last broadcast to the system.
    current_layout: LayoutId,
}

impl SwitchEngine {
    /// Creates an engine in the `Idle` state with no current device or layout.
    pub fn new(
        store: MappingStore,
        catalog: LayoutCatalog,
        switcher: Arc<dyn LanguageSwitcher>,
        prompt: Arc<dyn SelectionPrompt>,
    ) -> Self {
        Self {
            store,
            catalog,
            switcher,
            prompt,
            state: EngineState::Idle,
            current_device: None,
            current_layout: LayoutId::UNSET,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn current_device(&self) -> Option<DeviceHandle> {
        self.current_device
    }

    pub fn current_layout(&self) -> LayoutId {
        self.current_layout
    }

    pub fn store(&self) -> &MappingStore {
        &self.store
    }

    pub fn catalog(&self) -> &LayoutCatalog {
        &self.catalog
    }

    /// Handles the device handle of one raw keyboard event.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Prompt`] / [`EngineError::NoCandidates`] /
    ///   [`EngineError::InvalidSelection`] if an unknown device could not be
    ///   resolved.  Nothing is recorded and the next event from the device
    ///   tries again.
    /// - [`EngineError::Platform`] if switching the system language failed.
    pub fn handle_raw_input(&mut self, handle: DeviceHandle) -> Result<Dispatch, EngineError> {
        if self.state == EngineState::AwaitingSelection {
            debug!("raw input from {handle} dropped: selection prompt open");
            return Ok(Dispatch::Dropped);
        }
        if handle.is_null() {
            return Ok(Dispatch::Ignored);
        }

        let key = self.store.key_for(handle);
        if self.current_device == Some(key) {
            return Ok(Dispatch::SameDevice);
        }
        debug!("typing device changed to {handle}");
        self.current_device = Some(key);

        let (layout, prompted) = match self.store.resolve(key) {
            Some(layout) => (layout, false),
            None => match self.request_layout(key) {
                Ok(Some(layout)) => (layout, true),
                Ok(None) => {
                    self.current_device = None;
                    return Ok(Dispatch::Cancelled);
                }
                Err(e) => {
                    self.current_device = None;
                    return Err(e);
                }
            },
        };

        if self.apply_layout(layout)? {
            Ok(Dispatch::Switched { layout, prompted })
        } else {
            Ok(Dispatch::AlreadyActive { layout, prompted })
        }
    }

    /// Power notifications are logged only.
    pub fn handle_power_event(&self, event: PowerEvent) {
        info!("power event: {event}");
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    /// Asks the user for the layout of `key` and records the answer.
    ///
    /// Returns `Ok(None)` if the prompt was cancelled.
    fn request_layout(&mut self, key: DeviceHandle) -> Result<Option<LayoutId>, EngineError> {
        let candidates = self.candidates();
        if candidates.is_empty() {
            return Err(EngineError::NoCandidates);
        }

        self.state = EngineState::AwaitingSelection;
        debug!("prompting for layout of {key} ({} candidates)", candidates.len());
        let outcome = self.prompt.request_selection(&candidates);
        self.state = EngineState::Idle;

        match outcome? {
            Selection::Chosen(layout) => {
                self.store.record(key, layout.id)?;
                info!("keyboard {key} paired with {} ({})", layout.name, layout.id);
                Ok(Some(layout.id))
            }
            Selection::Cancelled => {
                info!("layout selection for {key} cancelled");
                Ok(None)
            }
        }
    }

    /// Catalog entries installed on this system (full catalog as fallback).
    fn candidates(&self) -> Vec<Layout> {
        match self.switcher.installed_layouts() {
            Ok(installed) => self.catalog.candidates(&installed),
            Err(e) => {
                warn!("could not list installed layouts, offering full catalog: {e}");
                self.catalog.candidates(&[])
            }
        }
    }

    /// Switches the system to `layout` unless it is unset or already active.
    ///
    /// Returns whether a broadcast was issued.
    fn apply_layout(&mut self, layout: LayoutId) -> Result<bool, PlatformCallError> {
        if layout.is_unset() || layout == self.current_layout {
            return Ok(false);
        }

        self.switcher.broadcast_language_change(layout)?;
        self.current_layout = layout;
        info!("input language switched to {layout}");

        self.switcher.set_default_input_language(layout)?;
        Ok(true)
    }
}
