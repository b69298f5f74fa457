//! Session: start-up, event dispatch and shutdown of the agent.
//!
//! # Lifecycle (for beginners)
//!
//! ```text
//! start_session ──► dispatch(event) … dispatch(event) ──► shutdown
//!   enumerate          one call per WM_INPUT /              save mapping
//!   load mapping       WM_POWERBROADCAST
//! ```
//!
//! A mapping file that was rejected at start-up is never overwritten in
//! place: if the session has something to save, the old file is first moved
//! aside (see [`MappingRepository::set_aside`]).
//!
//! Shutdown can be triggered from outside the message loop (the console
//! handler thread, `WM_ENDSESSION`), so the host shares the session through a
//! [`SharedSession`], which saves exactly once.
//!
//! Everything that can go wrong *after* the agent is up (a device list that
//! cannot be read, a corrupt mapping file, a failed broadcast, a full disk on
//! exit) is turned into a [`Notice`] for the [`UserNotifier`] and the agent
//! keeps running.  Only the conditions that make the agent useless (no
//! catalog, no raw input registration) are fatal, and those are checked by
//! the host before a session is started.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use keyswitch_core::{DeviceHandle, LayoutCatalog, PowerEvent};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::device_registry::enumerate_keyboards;
use super::mapping_store::MappingStore;
use super::platform::{DeviceEnumerator, LanguageSwitcher, PlatformCallError};
use super::switch_engine::{Dispatch, EngineError, SelectionPrompt, SwitchEngine};

// ── Ports ─────────────────────────────────────────────────────────────────────

/// Reading or writing the persisted mapping failed.
#[derive(Debug, Error)]
#[error("could not {action} mapping file {location}: {source}")]
pub struct PersistenceIoError {
    /// `"read"` or `"write"`.
    pub action: &'static str,
    pub location: String,
    #[source]
    pub source: std::io::Error,
}

/// Durable storage for the mapping file text.
#[cfg_attr(test, mockall::automock)]
pub trait MappingRepository: Send + Sync {
    /// Returns the stored text, or `None` if nothing was ever saved.
    fn read(&self) -> Result<Option<String>, PersistenceIoError>;

    /// Replaces the stored text.
    fn write(&self, contents: &str) -> Result<(), PersistenceIoError>;

    /// Moves the stored text out of the way so the next [`write`](Self::write)
    /// cannot destroy it.  Returns where it went.
    fn set_aside(&self) -> Result<String, PersistenceIoError>;
}

/// A non-fatal problem the user should hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Keyboards could not be told apart; one layout applies to all of them.
    DegradedMode(String),
    MappingNotLoaded(String),
    MappingNotSaved(String),
    InputUnreadable(String),
    SwitchFailed(String),
    SelectionFailed(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::DegradedMode(reason) => write!(
                f,
                "keyboards cannot be told apart ({reason}); one layout will be used for all of them"
            ),
            Notice::MappingNotLoaded(reason) => {
                write!(f, "saved keyboard layouts were not loaded: {reason}")
            }
            Notice::MappingNotSaved(reason) => {
                write!(f, "keyboard layouts could not be saved: {reason}")
            }
            Notice::InputUnreadable(reason) => write!(f, "keyboard input could not be read: {reason}"),
            Notice::SwitchFailed(reason) => write!(f, "input language was not switched: {reason}"),
            Notice::SelectionFailed(reason) => write!(f, "layout selection failed: {reason}"),
        }
    }
}

/// Where notices go (console, message box, log).
#[cfg_attr(test, mockall::automock)]
pub trait UserNotifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

// ── Events ────────────────────────────────────────────────────────────────────

/// One event delivered by the host's message loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A raw keyboard event from the device with this handle.
    RawInput(DeviceHandle),
    /// A raw input event arrived but its header could not be read.
    RawInputUnreadable(PlatformCallError),
    /// A power broadcast notification.
    Power(PowerEvent),
}

// ── Session ───────────────────────────────────────────────────────────────────

/// Everything a session needs from the outside world.
pub struct Collaborators {
    pub catalog: LayoutCatalog,
    pub enumerator: Arc<dyn DeviceEnumerator>,
    pub switcher: Arc<dyn LanguageSwitcher>,
    pub prompt: Arc<dyn SelectionPrompt>,
    pub repository: Arc<dyn MappingRepository>,
    pub notifier: Arc<dyn UserNotifier>,
}

/// What start-up found in the mapping repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavedMapping {
    /// Loaded, or nothing saved yet.
    Usable,
    /// Present but malformed; nothing from it was applied.
    Rejected,
    /// Could not be read at all.
    Unreadable,
    /// Not consulted (global mode).
    Skipped,
}

/// A running agent session.
pub struct Session {
    engine: SwitchEngine,
    repository: Arc<dyn MappingRepository>,
    notifier: Arc<dyn UserNotifier>,
    saved_mapping: SavedMapping,
}

/// Enumerates keyboards, restores the saved mapping and builds the engine.
///
/// Never fails: enumeration and load problems are reported through the
/// notifier and the session starts with what it has.
pub fn start_session(collaborators: Collaborators) -> Session {
    let Collaborators {
        catalog,
        enumerator,
        switcher,
        prompt,
        repository,
        notifier,
    } = collaborators;

    let mut store = match enumerate_keyboards(enumerator.as_ref()) {
        Ok(snapshot) => MappingStore::from_snapshot(&snapshot),
        Err(e) => {
            warn!("{e}; falling back to a single global layout");
            notifier.notify(Notice::DegradedMode(e.to_string()));
            MappingStore::global()
        }
    };

    let saved_mapping = if store.is_global() {
        debug!("global mode: saved mapping not loaded");
        SavedMapping::Skipped
    } else {
        restore_mapping(&mut store, repository.as_ref(), notifier.as_ref())
    };

    info!(
        "session started: {} layouts in catalog, {} keyboard(s) with a saved layout",
        catalog.len(),
        store.len()
    );

    Session {
        engine: SwitchEngine::new(store, catalog, switcher, prompt),
        repository,
        notifier,
        saved_mapping,
    }
}

fn restore_mapping(
    store: &mut MappingStore,
    repository: &dyn MappingRepository,
    notifier: &dyn UserNotifier,
) -> SavedMapping {
    let text = match repository.read() {
        Ok(Some(text)) => text,
        Ok(None) => {
            debug!("no saved mapping yet");
            return SavedMapping::Usable;
        }
        Err(e) => {
            warn!("{e}");
            notifier.notify(Notice::MappingNotLoaded(e.to_string()));
            return SavedMapping::Unreadable;
        }
    };

    match store.load(&text) {
        Ok(report) => {
            info!(
                "restored {} keyboard layout(s); {} saved keyboard(s) not attached",
                report.restored, report.detached
            );
            SavedMapping::Usable
        }
        Err(e) => {
            warn!("mapping file rejected: {e}");
            notifier.notify(Notice::MappingNotLoaded(e.to_string()));
            SavedMapping::Rejected
        }
    }
}

impl Session {
    pub fn engine(&self) -> &SwitchEngine {
        &self.engine
    }

    pub fn saved_mapping(&self) -> SavedMapping {
        self.saved_mapping
    }

    /// Feeds one host event to the engine.
    ///
    /// Errors are reported to the notifier and answered with
    /// [`Dispatch::Dropped`]; they never end the session.
    pub fn dispatch(&mut self, event: EngineEvent) -> Dispatch {
        match event {
            EngineEvent::RawInput(handle) => match self.engine.handle_raw_input(handle) {
                Ok(dispatch) => dispatch,
                Err(e) => {
                    self.report(e);
                    Dispatch::Dropped
                }
            },
            EngineEvent::RawInputUnreadable(e) => {
                warn!("raw input dropped: {e}");
                self.notifier.notify(Notice::InputUnreadable(e.to_string()));
                Dispatch::Dropped
            }
            EngineEvent::Power(event) => {
                self.engine.handle_power_event(event);
                Dispatch::Ignored
            }
        }
    }

    /// Saves the mapping and ends the session.
    ///
    /// Returns the number of lines written.  Nothing is written when the
    /// saved mapping was skipped or unreadable at start-up.  A mapping that
    /// was rejected at start-up is left in place if there is nothing new to
    /// save, and is set aside before the write otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceIoError`] if setting aside or writing failed
    /// (also reported to the notifier).
    pub fn shutdown(self) -> Result<usize, PersistenceIoError> {
        let contents = match self.saved_mapping {
            SavedMapping::Skipped => {
                info!("global mode: mapping not saved");
                return Ok(0);
            }
            SavedMapping::Unreadable => {
                warn!("saved mapping was unreadable at start-up; left untouched");
                return Ok(0);
            }
            SavedMapping::Rejected | SavedMapping::Usable => self.engine.store().render(),
        };

        if self.saved_mapping == SavedMapping::Rejected {
            if contents.is_empty() {
                info!("nothing new to save; rejected mapping file left as it was");
                return Ok(0);
            }
            match self.repository.set_aside() {
                Ok(location) => warn!("rejected mapping file kept as {location}"),
                Err(e) => return Err(self.not_saved(e)),
            }
        }

        let lines = contents.lines().count();
        match self.repository.write(&contents) {
            Ok(()) => {
                info!("saved {lines} keyboard layout(s)");
                Ok(lines)
            }
            Err(e) => Err(self.not_saved(e)),
        }
    }

    fn not_saved(&self, e: PersistenceIoError) -> PersistenceIoError {
        error!("{e}");
        self.notifier.notify(Notice::MappingNotSaved(e.to_string()));
        e
    }

    fn report(&self, error: EngineError) {
        warn!("{error}");
        let notice = match error {
            EngineError::Platform(e) => Notice::SwitchFailed(e.to_string()),
            other => Notice::SelectionFailed(other.to_string()),
        };
        self.notifier.notify(notice);
    }
}

// ── Shared session ────────────────────────────────────────────────────────────

/// A [`Session`] reachable from the message loop and from shutdown triggers
/// that run outside it.
///
/// The first [`finish`](Self::finish) saves the mapping and holds the lock
/// while doing so, so a concurrent caller returns only after the save is on
/// disk.  Events arriving after that are dropped.
pub struct SharedSession {
    inner: Mutex<Option<Session>>,
}

impl SharedSession {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Mutex::new(Some(session)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// [`Session::dispatch`], or [`Dispatch::Dropped`] once finished.
    pub fn dispatch(&self, event: EngineEvent) -> Dispatch {
        match self.lock().as_mut() {
            Some(session) => session.dispatch(event),
            None => {
                debug!("session finished; {event:?} dropped");
                Dispatch::Dropped
            }
        }
    }

    /// Saves the mapping and ends the session, waiting for a dispatch in
    /// progress on another thread.
    ///
    /// Returns `None` if the session had already finished.
    pub fn finish(&self) -> Option<Result<usize, PersistenceIoError>> {
        let mut guard = self.lock();
        let session = guard.take()?;
        Some(session.shutdown())
    }

    /// Like [`finish`](Self::finish) but never waits.
    ///
    /// For callers on the thread that runs the message loop, which may
    /// already hold the session further up the stack.  Returns `None` if the
    /// session is busy or already finished.
    pub fn try_finish(&self) -> Option<Result<usize, PersistenceIoError>> {
        let mut guard = match self.inner.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                warn!("session busy; mapping is saved when the message loop ends");
                return None;
            }
        };
        let session = guard.take()?;
        Some(session.shutdown())
    }

    pub fn is_finished(&self) -> bool {
        self.lock().is_none()
    }
}
