use tracing::debug;

/// Forcibly terminate `pid` and every descendant it created.
///
/// Best effort: this runs on cleanup paths, so failures are swallowed. The
/// runner starts each snippet in its own session, which makes the negative
/// pid reach the whole process group on Unix; Windows has no process groups
/// to signal, so `taskkill` walks the tree instead.
pub fn kill_tree(pid: u32) {
    #[cfg(unix)]
    {
        let Ok(pid) = i32::try_from(pid) else {
            return;
        };
        unsafe {
            let _ = libc::kill(-pid, libc::SIGKILL);
            let _ = libc::kill(pid, libc::SIGKILL);
        }
        debug!(pid, "sent SIGKILL to process group");
    }

    #[cfg(windows)]
    {
        use std::process::{Command, Stdio};
        let _ = Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/T", "/F"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        debug!(pid, "issued taskkill for process tree");
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = pid;
    }
}
