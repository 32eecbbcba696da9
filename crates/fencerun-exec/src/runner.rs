use anyhow::{Context, Result, anyhow};
use std::ffi::OsStr;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::terminate;

/// How long to wait for the waiter thread to reap a killed process before
/// reporting the timeout anyway.
const REAP_GRACE: Duration = Duration::from_secs(2);

/// Raw outcome of one interpreter invocation. Streams are retained in full.
#[derive(Debug)]
pub struct RunOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

/// Distinguishes "binary not found" from a completed run so callers can fall
/// through to the next candidate interpreter. Any other spawn failure is an
/// error.
pub enum SpawnAttempt {
    Missing,
    Completed(RunOutcome),
}

/// Spawn `program` with `args` and wait for exit or timeout, whichever comes
/// first. On Unix the child gets its own session/process group so a timeout
/// kill reaches every descendant. The exit notification arrives over a
/// channel and races `recv_timeout`; there is no polling.
pub fn run(
    program: &str,
    args: &[&OsStr],
    working_directory: Option<&Path>,
    timeout: Duration,
) -> Result<SpawnAttempt> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = working_directory {
        command.current_dir(dir);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt as _;
        unsafe {
            command.pre_exec(|| {
                if libc::setsid() == -1 && libc::setpgid(0, 0) == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(SpawnAttempt::Missing);
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to spawn {program}"));
        }
    };
    let pid = child.id();
    debug!(program, pid, "spawned snippet process");

    let stdout_reader = child.stdout.take().map(drain_stream);
    let stderr_reader = child.stderr.take().map(drain_stream);

    let (status_tx, status_rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = status_tx.send(child.wait());
    });

    let (exit_code, timed_out) = match status_rx.recv_timeout(timeout) {
        Ok(Ok(status)) => (status.code(), false),
        Ok(Err(err)) => {
            return Err(err).with_context(|| format!("wait for {program}"));
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            warn!(program, pid, "snippet exceeded its time budget, killing process tree");
            terminate::kill_tree(pid);
            // Let the waiter reap the killed child so it does not linger as
            // a zombie; the timeout verdict stands either way.
            let _ = status_rx.recv_timeout(REAP_GRACE);
            (None, true)
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            return Err(anyhow!("waiter thread for {program} exited without a status"));
        }
    };

    let stdout = collect_stream(stdout_reader);
    let stderr = collect_stream(stderr_reader);

    Ok(SpawnAttempt::Completed(RunOutcome {
        stdout,
        stderr,
        exit_code,
        timed_out,
    }))
}

/// Drain a child stream incrementally on its own thread. The pipe closes
/// when the process (tree) dies, which ends the read loop.
fn drain_stream<R: Read + Send + 'static>(mut stream: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut collected = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => collected.extend_from_slice(&buf[..n]),
                Err(_) => break,
            }
        }
        collected
    })
}

fn collect_stream(reader: Option<thread::JoinHandle<Vec<u8>>>) -> String {
    let bytes = reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(all(test, unix))]
mod tests {
    use super::{SpawnAttempt, run};
    use std::ffi::OsStr;
    use std::time::{Duration, Instant};

    fn sh(args: &[&str], timeout_ms: u64) -> SpawnAttempt {
        let args: Vec<&OsStr> = args.iter().map(OsStr::new).collect();
        run("/bin/sh", &args, None, Duration::from_millis(timeout_ms)).expect("run")
    }

    #[test]
    fn captures_both_streams_and_exit_code() {
        let SpawnAttempt::Completed(outcome) = sh(&["-c", "echo out; echo err 1>&2"], 5_000)
        else {
            panic!("shell should exist");
        };
        assert_eq!(outcome.exit_code, Some(0));
        assert!(!outcome.timed_out);
        assert_eq!(outcome.stdout, "out\n");
        assert_eq!(outcome.stderr, "err\n");
    }

    #[test]
    fn nonzero_exit_is_reported_with_output() {
        let SpawnAttempt::Completed(outcome) = sh(&["-c", "echo partial; exit 3"], 5_000) else {
            panic!("shell should exist");
        };
        assert_eq!(outcome.exit_code, Some(3));
        assert_eq!(outcome.stdout, "partial\n");
    }

    #[test]
    fn missing_binary_falls_through() {
        let args: Vec<&OsStr> = vec![OsStr::new("-c"), OsStr::new("true")];
        let attempt = run(
            "fencerun-no-such-interpreter",
            &args,
            None,
            Duration::from_millis(1_000),
        )
        .expect("not-found is not an error");
        assert!(matches!(attempt, SpawnAttempt::Missing));
    }

    #[test]
    fn timeout_kills_the_whole_process_group() {
        let started = Instant::now();
        let SpawnAttempt::Completed(outcome) = sh(&["-c", "echo $$; sleep 30"], 400) else {
            panic!("shell should exist");
        };
        assert!(outcome.timed_out);
        assert_eq!(outcome.exit_code, None);
        assert!(started.elapsed() < Duration::from_secs(10));

        // The shell printed its own pid before sleeping; after the kill it
        // must be gone from the process table.
        let pid: i32 = outcome.stdout.trim().parse().expect("pid on stdout");
        let deadline = Instant::now() + Duration::from_secs(3);
        loop {
            let alive = unsafe { libc::kill(pid, 0) } == 0;
            if !alive {
                break;
            }
            assert!(Instant::now() < deadline, "pid {pid} still alive after kill");
            std::thread::sleep(Duration::from_millis(50));
        }
    }
}
