#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use action_primitives::{ExecOutcome, ReasoningExecutor, SnippetExecutor};
use async_trait::async_trait;
use soulbrowser_core_types::Variables;
use tokio_util::sync::CancellationToken;

/// Executor double answering from a fixed script keyed by code or instruction.
#[derive(Default)]
pub struct ScriptedExecutor {
    script: HashMap<String, Result<(), String>>,
    flaky: Mutex<HashMap<String, (usize, String)>>,
    calls: AtomicUsize,
    inputs: Mutex<Vec<String>>,
    cancel_on: Option<(String, CancellationToken)>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeeds(mut self, input: &str) -> Self {
        self.script.insert(input.to_string(), Ok(()));
        self
    }

    pub fn fails(mut self, input: &str, error: &str) -> Self {
        self.script.insert(input.to_string(), Err(error.to_string()));
        self
    }

    /// Fail the first `times` calls for `input`, then succeed.
    pub fn fails_first(mut self, input: &str, error: &str, times: usize) -> Self {
        self.script.insert(input.to_string(), Ok(()));
        self.flaky
            .get_mut()
            .unwrap()
            .insert(input.to_string(), (times, error.to_string()));
        self
    }

    pub fn cancels_after(mut self, input: &str, token: CancellationToken) -> Self {
        self.cancel_on = Some((input.to_string(), token));
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }

    fn run(&self, input: &str) -> ExecOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(input.to_string());
        if let Some((trigger, token)) = self.cancel_on.as_ref() {
            if trigger == input {
                token.cancel();
            }
        }
        if input.trim().is_empty() {
            return ExecOutcome::failure("input is empty");
        }
        if let Some((remaining, error)) = self.flaky.lock().unwrap().get_mut(input) {
            if *remaining > 0 {
                *remaining -= 1;
                return ExecOutcome::failure(error.clone());
            }
        }
        match self.script.get(input) {
            Some(Ok(())) => ExecOutcome::success(),
            Some(Err(error)) => ExecOutcome::failure(error.clone()),
            None => ExecOutcome::failure(format!("no scripted outcome for {input}")),
        }
    }
}

#[async_trait]
impl SnippetExecutor for ScriptedExecutor {
    async fn execute(&self, code: &str, _variables: &Variables) -> ExecOutcome {
        self.run(code)
    }
}

#[async_trait]
impl ReasoningExecutor for ScriptedExecutor {
    async fn execute(&self, instruction: &str, _variables: &Variables) -> ExecOutcome {
        self.run(instruction)
    }
}
