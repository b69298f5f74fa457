//! Scripted selection prompt for tests.
//!
//! Answers each request with the next scripted step and records the
//! candidate lists it was shown.  An exhausted script cancels.

use std::collections::VecDeque;
use std::sync::Mutex;

use keyswitch_core::{Layout, LayoutId, SelectionState};

use crate::application::switch_engine::{PromptError, Selection, SelectionPrompt};

#[derive(Debug, Clone)]
enum Step {
    Choose(LayoutId),
    Cancel,
    Fail(String),
}

/// A [`SelectionPrompt`] that follows a script.
#[derive(Default)]
pub struct ScriptedPrompt {
    script: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<Vec<Layout>>>,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next request: pick the candidate with identifier `id`.
    pub fn then_choose(self, id: impl Into<LayoutId>) -> Self {
        self.push(Step::Choose(id.into()))
    }

    /// Next request: dismiss the prompt.
    pub fn then_cancel(self) -> Self {
        self.push(Step::Cancel)
    }

    /// Next request: fail with `reason`.
    pub fn then_fail(self, reason: &str) -> Self {
        self.push(Step::Fail(reason.to_string()))
    }

    fn push(self, step: Step) -> Self {
        self.script.lock().expect("lock poisoned").push_back(step);
        self
    }

    /// Candidate lists shown so far, one per request.
    pub fn requests(&self) -> Vec<Vec<Layout>> {
        self.requests.lock().expect("lock poisoned").clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("lock poisoned").len()
    }
}

impl SelectionPrompt for ScriptedPrompt {
    fn request_selection(&self, candidates: &[Layout]) -> Result<Selection, PromptError> {
        self.requests
            .lock()
            .expect("lock poisoned")
            .push(candidates.to_vec());

        let step = self.script.lock().expect("lock poisoned").pop_front();
        match step {
            Some(Step::Choose(id)) => {
                let mut state = SelectionState::new(candidates.to_vec())
                    .ok_or_else(|| PromptError("no candidates".to_string()))?;
                if !state.select_id(id) {
                    return Err(PromptError(format!("{id} is not among the candidates")));
                }
                state
                    .confirm()
                    .cloned()
                    .map(Selection::Chosen)
                    .ok_or_else(|| PromptError("confirm disabled".to_string()))
            }
            Some(Step::Fail(reason)) => Err(PromptError(reason)),
            Some(Step::Cancel) | None => Ok(Selection::Cancelled),
        }
    }
}
