//! Execution side of fencerun: route a (language, code) pair to an
//! interpreter, run it under a hard wall-clock timeout, and hand back a typed
//! result. Every failure path resolves to an [`ExecutionResult`]; dispatch
//! never raises. The engine keeps no state across calls.

pub mod dispatch;
pub mod language;
pub mod runner;
pub mod terminate;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub use dispatch::dispatch;
pub use language::{LanguageFamily, SHELL_INTERPRETER};

/// Wall-clock budget for one snippet. Fixed; not exposed to callers.
pub const EXECUTION_TIMEOUT_MS: u64 = 10_000;

/// One snippet to execute. Constructed by the caller, consumed by
/// [`dispatch`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub language: String,
    pub code: String,
    pub working_directory: Option<PathBuf>,
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecStatus {
    Ok,
    Error,
    Timeout,
    Unsupported,
}

impl ExecStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Timeout => "timeout",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for ExecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one dispatch call. Immutable once produced. `exit_code` is
/// None whenever the process never reached a normal exit: unsupported
/// language, spawn failure, signal death, or timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub id: String,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub status: ExecStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// The text an output segment wraps: stdout then stderr, falling back to
    /// the message when both streams are empty.
    pub fn rendered_body(&self) -> String {
        let mut body = String::with_capacity(self.stdout.len() + self.stderr.len());
        body.push_str(&self.stdout);
        body.push_str(&self.stderr);
        if body.is_empty() {
            if let Some(message) = &self.message {
                body.push_str(message);
            }
        }
        body
    }
}
