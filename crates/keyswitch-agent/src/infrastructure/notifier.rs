//! Console notifier: prints [`Notice`]s for the user.

use std::io::{self, Stderr, Write};
use std::sync::Mutex;

use tracing::warn;

use crate::application::session::{Notice, UserNotifier};

/// Writes each notice as one `KeySwitch: …` line.
pub struct ConsoleNotifier<W> {
    out: Mutex<W>,
}

impl ConsoleNotifier<Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write + Send> ConsoleNotifier<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> UserNotifier for ConsoleNotifier<W> {
    fn notify(&self, notice: Notice) {
        let Ok(mut out) = self.out.lock() else {
            warn!("notice lost (console lock poisoned): {notice}");
            return;
        };
        if let Err(e) = writeln!(out, "KeySwitch: {notice}") {
            warn!("notice lost ({e}): {notice}");
        }
    }
}
