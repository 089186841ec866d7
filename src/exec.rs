//! Timed subprocess execution.
//!
//! Prompt rendering must never hang on a stuck subprocess: git commands can
//! stall on network filesystems, unreachable remotes, or stale index locks.
//! Every command run here gets a wall-clock timeout; on expiry the child is
//! terminated (SIGTERM, short grace, then SIGKILL) and always reaped, so no
//! zombie survives a timeout.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use wait_timeout::ChildExt;

/// Default timeout for synchronous prompt-path git commands.
pub const SYNC_TIMEOUT: Duration = Duration::from_millis(3000);

/// Default timeout for async worker git commands.
pub const ASYNC_TIMEOUT: Duration = Duration::from_millis(5000);

/// Grace period between SIGTERM and SIGKILL.
const KILL_GRACE: Duration = Duration::from_millis(100);

/// Outcome of a timed command.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    /// Exit status, or `None` when the command timed out or died on a signal.
    pub exit_status: Option<i32>,
    /// Captured stdout with trailing CR/LF stripped.
    pub stdout: String,
    /// True when the command was killed for exceeding its timeout.
    pub timed_out: bool,
}

impl ExecResult {
    /// True when the command ran to completion with exit status 0.
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_status == Some(0)
    }
}

/// Execute a shell command string with a wall-clock timeout.
///
/// The command runs via `sh -c`, stdout captured, stderr discarded, stdin
/// closed. Equivalent to `popen()` plus a deadline.
pub fn run_with_timeout(cmd: &str, timeout: Duration) -> std::io::Result<ExecResult> {
    let mut command = Command::new("sh");
    command.arg("-c").arg(cmd);
    run_command(command, timeout)
}

/// Run `git -C <dir> <args>` with a timeout.
///
/// Execs git directly with an argument vector: no shell interpolation, no
/// process-wide `chdir()`: which makes this safe to call from worker
/// threads and immune to quoting hazards in `dir`.
pub fn run_git_in_dir(dir: &Path, args: &[&str], timeout: Duration) -> ExecResult {
    let mut command = Command::new("git");
    command.arg("-C").arg(dir).args(args);

    match run_command(command, timeout) {
        Ok(result) => result,
        Err(e) => {
            log::debug!("git {:?} failed to spawn: {}", args, e);
            ExecResult::default()
        }
    }
}

fn run_command(mut command: Command, timeout: Duration) -> std::io::Result<ExecResult> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;

    // Drain stdout on a separate thread so the child can never block on a
    // full pipe, even when it produces more output than we keep.
    let mut stdout_handle = child.stdout.take();
    let reader: JoinHandle<Vec<u8>> = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(ref mut out) = stdout_handle {
            let _ = out.read_to_end(&mut buf);
        }
        buf
    });

    match child.wait_timeout(timeout)? {
        Some(status) => {
            let raw = reader.join().unwrap_or_default();
            let mut stdout = String::from_utf8_lossy(&raw).into_owned();
            while stdout.ends_with('\n') || stdout.ends_with('\r') {
                stdout.pop();
            }
            Ok(ExecResult {
                exit_status: status.code(),
                stdout,
                timed_out: false,
            })
        }
        None => {
            terminate(&mut child);
            let _ = reader.join();
            Ok(ExecResult {
                exit_status: None,
                stdout: String::new(),
                timed_out: true,
            })
        }
    }
}

/// Kill a timed-out child: SIGTERM, a short grace wait, then SIGKILL.
/// The child is reaped on every path.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let _ = kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM);
        match child.wait_timeout(KILL_GRACE) {
            Ok(Some(_)) => return,
            Ok(None) | Err(_) => {}
        }
    }

    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn captures_stdout_and_exit_status() {
        let r = run_with_timeout("echo hello", SYNC_TIMEOUT).unwrap();
        assert!(r.success());
        assert_eq!(r.stdout, "hello");
        assert!(!r.timed_out);
    }

    #[test]
    fn strips_trailing_newlines_only() {
        let r = run_with_timeout("printf 'a\\nb\\n\\n'", SYNC_TIMEOUT).unwrap();
        assert_eq!(r.stdout, "a\nb");
    }

    #[test]
    fn nonzero_exit_is_reported() {
        let r = run_with_timeout("exit 3", SYNC_TIMEOUT).unwrap();
        assert_eq!(r.exit_status, Some(3));
        assert!(!r.success());
    }

    #[test]
    fn stderr_is_discarded() {
        let r = run_with_timeout("echo visible; echo hidden 1>&2", SYNC_TIMEOUT).unwrap();
        assert_eq!(r.stdout, "visible");
    }

    #[test]
    fn timeout_kills_promptly() {
        let start = Instant::now();
        let r = run_with_timeout("sleep 5", Duration::from_millis(100)).unwrap();
        assert!(r.timed_out);
        assert_eq!(r.exit_status, None);
        // SIGTERM + grace is well under a second.
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn large_output_does_not_deadlock() {
        // More than a pipe buffer's worth of output.
        let r = run_with_timeout("yes x | head -c 200000", SYNC_TIMEOUT).unwrap();
        assert!(r.success());
        assert!(r.stdout.len() >= 199_999);
    }

    #[test]
    fn git_in_dir_outside_repo_fails_cleanly() {
        let r = run_git_in_dir(Path::new("/"), &["rev-parse", "--git-dir"], SYNC_TIMEOUT);
        assert!(!r.success());
        assert!(!r.timed_out);
    }
}
