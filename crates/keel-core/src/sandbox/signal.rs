//! Termination signals for sandboxed process groups.
//!
//! Every child is spawned as the leader of its own process group, so a signal
//! sent to the group also reaches anything a shell started on its behalf.
//! On non-Unix platforms only the direct child can be stopped.

use std::io;

use tokio::process::Child;

/// Escalation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Signal {
    /// Ask the group to exit
    Terminate,
    /// Force the group down
    Kill,
}

#[cfg(unix)]
impl Signal {
    fn as_raw(self) -> libc::c_int {
        match self {
            Signal::Terminate => libc::SIGTERM,
            Signal::Kill => libc::SIGKILL,
        }
    }
}

/// Send `signal` to the process group led by `pid` (best-effort).
///
/// A group that has already exited is not an error.
#[cfg(unix)]
#[allow(unsafe_code)]
pub(crate) fn signal_group(pid: u32, signal: Signal) -> io::Result<()> {
    let pgid = pid as libc::pid_t;
    let result = unsafe { libc::killpg(pgid, signal.as_raw()) };
    if result == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn signal_group(_pid: u32, _signal: Signal) -> io::Result<()> {
    Ok(())
}

/// Signal the child's group, falling back to the child itself where groups
/// are unavailable.
pub(crate) fn signal_child(child: &mut Child, signal: Signal) -> io::Result<()> {
    match child.id() {
        Some(pid) if cfg!(unix) => {
            signal_group(pid, signal)?;
            if signal == Signal::Kill {
                child.start_kill()?;
            }
            Ok(())
        }
        Some(_) => child.start_kill(),
        // Already reaped
        None => Ok(()),
    }
}
