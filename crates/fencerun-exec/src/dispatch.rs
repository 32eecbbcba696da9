use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::language::LanguageFamily;
use crate::runner::{self, RunOutcome, SpawnAttempt};
use crate::{EXECUTION_TIMEOUT_MS, ExecStatus, ExecutionRequest, ExecutionResult};

/// Route a request to its runner family and execute it.
///
/// Never returns an error: unrecognized languages, missing interpreters,
/// pre-flight failures, spawn failures and timeouts all come back as a typed
/// [`ExecutionResult`]. Stateless and reentrant; callers who need
/// at-most-one in-flight run per identifier track that themselves.
pub fn dispatch(request: &ExecutionRequest) -> ExecutionResult {
    let tag = normalize_tag(&request.language);
    let Some(family) = LanguageFamily::from_tag(&tag) else {
        return finished(
            request,
            ExecStatus::Unsupported,
            None,
            String::new(),
            String::new(),
            Some(format!("language `{}` is not supported", request.language)),
            0,
        );
    };
    if !family.available() {
        return finished(
            request,
            ExecStatus::Unsupported,
            None,
            String::new(),
            String::new(),
            Some(format!("interpreter for `{tag}` is not available on this host")),
            0,
        );
    }
    if let Some(dir) = request.working_directory.as_deref() {
        if !dir.is_dir() {
            return finished(
                request,
                ExecStatus::Error,
                None,
                String::new(),
                String::new(),
                Some(format!("working directory {} does not exist", dir.display())),
                0,
            );
        }
    }

    let started = Instant::now();
    let outcome = run_snippet(family, &request.code, request.working_directory.as_deref());
    let duration_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(SnippetOutcome::Ran(run)) => from_run(request, run, duration_ms),
        Ok(SnippetOutcome::NoInterpreter) => finished(
            request,
            ExecStatus::Unsupported,
            None,
            String::new(),
            String::new(),
            Some(format!("no interpreter for `{tag}` found on this host")),
            duration_ms,
        ),
        Err(err) => finished(
            request,
            ExecStatus::Error,
            None,
            String::new(),
            String::new(),
            Some(format!("{err:#}")),
            duration_ms,
        ),
    }
}

enum SnippetOutcome {
    Ran(RunOutcome),
    NoInterpreter,
}

/// Materialize the snippet into a private tempdir and try the family's
/// candidate interpreters in order. The tempdir is dropped (and removed) on
/// every exit path.
fn run_snippet(
    family: LanguageFamily,
    code: &str,
    working_directory: Option<&Path>,
) -> Result<SnippetOutcome> {
    let dir = tempfile::Builder::new()
        .prefix("fencerun-")
        .tempdir()
        .context("create snippet directory")?;
    let snippet = dir.path().join(format!("snippet.{}", family.file_extension()));
    std::fs::write(&snippet, code)
        .with_context(|| format!("write snippet {}", snippet.display()))?;

    let timeout = Duration::from_millis(EXECUTION_TIMEOUT_MS);
    let args: [&OsStr; 1] = [snippet.as_os_str()];
    for program in family.candidates() {
        match runner::run(program, &args, working_directory, timeout)? {
            SpawnAttempt::Missing => {
                debug!(program, "interpreter not found, trying next candidate");
            }
            SpawnAttempt::Completed(run) => return Ok(SnippetOutcome::Ran(run)),
        }
    }
    Ok(SnippetOutcome::NoInterpreter)
}

fn from_run(request: &ExecutionRequest, run: RunOutcome, duration_ms: u64) -> ExecutionResult {
    if run.timed_out {
        return finished(
            request,
            ExecStatus::Timeout,
            None,
            run.stdout,
            run.stderr,
            Some(format!("execution exceeded the {EXECUTION_TIMEOUT_MS} ms budget")),
            duration_ms,
        );
    }
    match run.exit_code {
        Some(0) => finished(request, ExecStatus::Ok, Some(0), run.stdout, run.stderr, None, duration_ms),
        Some(code) => finished(
            request,
            ExecStatus::Error,
            Some(code),
            run.stdout,
            run.stderr,
            None,
            duration_ms,
        ),
        None => finished(
            request,
            ExecStatus::Error,
            None,
            run.stdout,
            run.stderr,
            Some("process was terminated by a signal".to_string()),
            duration_ms,
        ),
    }
}

#[allow(clippy::too_many_arguments)]
fn finished(
    request: &ExecutionRequest,
    status: ExecStatus,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
    message: Option<String>,
    duration_ms: u64,
) -> ExecutionResult {
    ExecutionResult {
        id: request.id.clone(),
        exit_code,
        stdout,
        stderr,
        status,
        message,
        duration_ms,
    }
}

/// Trim, lowercase, first whitespace token - the same normalization the
/// document side applies to fence language tags.
fn normalize_tag(language: &str) -> String {
    language
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_lowercase()
}
