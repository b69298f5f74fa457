//! Console implementation of the layout selection prompt.
//!
//! The agent is a console program, so the "which layout is this keyboard?"
//! dialog is a numbered list on the terminal:
//!
//! ```text
//! A keyboard without a saved layout was used.  Which layout does it have?
//!  >  1. English (United States)
//!     2. German (Germany)
//! Layout number (q skips):
//! ```
//!
//! The prompt runs on the control thread and blocks it until the user
//! answers; keystrokes typed meanwhile are discarded by the host.

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use std::sync::Mutex;

use keyswitch_core::{Layout, SelectionState};
use tracing::debug;

use crate::application::switch_engine::{PromptError, Selection, SelectionPrompt};

pub mod mock;

/// What one line of user input means.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Reply {
    /// A 1-based list position.
    Number(usize),
    Confirm,
    Skip,
    Invalid,
}

fn parse_reply(line: &str) -> Reply {
    let line = line.trim();
    if line.is_empty() {
        return Reply::Confirm;
    }
    if line.eq_ignore_ascii_case("q") {
        return Reply::Skip;
    }
    match line.parse::<usize>() {
        Ok(n) if n > 0 => Reply::Number(n),
        _ => Reply::Invalid,
    }
}

/// A [`SelectionPrompt`] over any line reader and writer.
pub struct ConsolePrompt<R, W> {
    io: Mutex<(R, W)>,
}

impl ConsolePrompt<BufReader<Stdin>, Stdout> {
    /// Prompt on the process console.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R, W> ConsolePrompt<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }

    /// Returns the reader and writer (for inspecting test output).
    pub fn into_inner(self) -> (R, W) {
        match self.io.into_inner() {
            Ok(io) => io,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn render(state: &SelectionState, out: &mut impl Write) -> io::Result<()> {
    writeln!(
        out,
        "A keyboard without a saved layout was used.  Which layout does it have?"
    )?;
    for (i, layout) in state.candidates().iter().enumerate() {
        let marker = if i == state.selected_index() { '>' } else { ' ' };
        writeln!(out, " {marker} {:>2}. {}", i + 1, layout.name)?;
    }
    write!(out, "Layout number (q skips): ")?;
    out.flush()
}

fn ask(
    state: &mut SelectionState,
    reader: &mut impl BufRead,
    writer: &mut impl Write,
) -> io::Result<Selection> {
    render(state, writer)?;
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            writeln!(writer)?;
            return Ok(Selection::Cancelled);
        }

        match parse_reply(&line) {
            Reply::Number(n) if state.select(n - 1) => {
                if let Some(layout) = state.confirm() {
                    return Ok(Selection::Chosen(layout.clone()));
                }
            }
            Reply::Confirm => match state.confirm() {
                Some(layout) => return Ok(Selection::Chosen(layout.clone())),
                None => writeln!(writer, "Please type the number of the layout.")?,
            },
            Reply::Skip => return Ok(Selection::Cancelled),
            Reply::Number(_) | Reply::Invalid => writeln!(
                writer,
                "Please type a number from 1 to {}.",
                state.candidates().len()
            )?,
        }
        write!(writer, "> ")?;
        writer.flush()?;
    }
}

impl<R, W> SelectionPrompt for ConsolePrompt<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn request_selection(&self, candidates: &[Layout]) -> Result<Selection, PromptError> {
        let mut state = SelectionState::new(candidates.to_vec())
            .ok_or_else(|| PromptError("no layouts to choose from".to_string()))?;
        let mut guard = self
            .io
            .lock()
            .map_err(|_| PromptError("console lock poisoned".to_string()))?;
        let (reader, writer) = &mut *guard;

        let selection = ask(&mut state, reader, writer).map_err(|e| PromptError(e.to_string()))?;
        debug!("console prompt answered: {selection:?}");
        Ok(selection)
    }
}
