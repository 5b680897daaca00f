use std::path::PathBuf;
use std::process::Stdio;

use action_primitives::{ExecOutcome, ExecutorError, SnippetExecutor};
use async_trait::async_trait;
use soulbrowser_core_types::Variables;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::config::SnippetRunnerConfig;

const STDERR_TAIL_LINES: usize = 20;

/// Runs snippet code through a local runner process.
///
/// The code is written to the runner's stdin; each variable is exported as
/// `SOUL_VAR_<NAME>`. Exit status zero means success.
#[derive(Debug, Clone)]
pub struct ProcessSnippetExecutor {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl ProcessSnippetExecutor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
        }
    }

    /// `None` when no command is configured.
    pub fn from_config(config: &SnippetRunnerConfig) -> Option<Self> {
        let (program, args) = config.command.split_first()?;
        if program.trim().is_empty() {
            return None;
        }
        let mut executor = Self::new(program.clone(), args.to_vec());
        executor.working_dir = config.working_dir.clone();
        Some(executor)
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    async fn run(&self, code: &str, variables: &Variables) -> Result<ExecOutcome, ExecutorError> {
        if self.program.trim().is_empty() {
            return Err(ExecutorError::NotConfigured("snippet runner command".to_string()));
        }
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = self.working_dir.as_ref() {
            command.current_dir(dir);
        }
        for (name, value) in variables {
            command.env(variable_env_name(name), value);
        }

        let mut child = command
            .spawn()
            .map_err(|err| ExecutorError::Execution(format!("failed to start '{}': {err}", self.program)))?;
        // Feed stdin while the output pipes are drained.
        let writer = child.stdin.take().map(|mut stdin| {
            let code = code.to_string();
            let program = self.program.clone();
            tokio::spawn(async move {
                // The runner may exit before reading everything.
                if let Err(err) = stdin.write_all(code.as_bytes()).await {
                    debug!(program = %program, error = %err, "snippet runner closed stdin early");
                }
            })
        });
        let output = child
            .wait_with_output()
            .await
            .map_err(|err| ExecutorError::Execution(err.to_string()))?;
        if let Some(writer) = writer {
            if let Err(err) = writer.await {
                debug!(program = %self.program, error = %err, "stdin writer task failed");
            }
        }

        if output.status.success() {
            return Ok(ExecOutcome::success());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail = stderr_tail(&stderr);
        let message = if tail.is_empty() {
            match output.status.code() {
                Some(code) => format!("snippet runner exited with status {code}"),
                None => "snippet runner terminated by signal".to_string(),
            }
        } else {
            tail
        };
        Ok(ExecOutcome::failure(message))
    }
}

#[async_trait]
impl SnippetExecutor for ProcessSnippetExecutor {
    async fn execute(&self, code: &str, variables: &Variables) -> ExecOutcome {
        if code.trim().is_empty() {
            return ExecutorError::EmptySnippet.into();
        }
        match self.run(code, variables).await {
            Ok(outcome) => outcome,
            Err(err) => err.into(),
        }
    }
}

/// `email-address` becomes `SOUL_VAR_EMAIL_ADDRESS`.
pub fn variable_env_name(name: &str) -> String {
    let normalized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("SOUL_VAR_{normalized}")
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|line| !line.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
