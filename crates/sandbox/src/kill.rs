//! Lethal-signal delivery
//!
//! The engine terminates violating processes through this trait so
//! that tests (and embeddings whose privileged context delivers
//! signals differently) can substitute their own sink.

use tracing::warn;

/// Delivers the lethal signal to a violating process.
pub trait ProcessKiller: Send + Sync {
    fn kill(&self, pid: u32);
}

/// Default killer: `kill(pid, SIGKILL)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SigKiller;

impl ProcessKiller for SigKiller {
    fn kill(&self, pid: u32) {
        // Safety: kill(2) with a valid signal number; an ESRCH result
        // just means the process is already gone.
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGKILL) };
        if rc != 0 {
            warn!(
                pid,
                errno = std::io::Error::last_os_error().raw_os_error(),
                "failed to deliver SIGKILL"
            );
        }
    }
}
