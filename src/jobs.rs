//! Foreground waiting, background detachment and child reaping.
//!
//! The SIGCHLD handler never reaps anything itself; it only raises an
//! atomic flag. Actual reaping happens synchronously at the top of each
//! line iteration, when no foreground wait can be pending, so the handler
//! can never consume an exit notification a foreground wait is about to
//! block on.

use crate::session::Session;
use nix::errno::Errno;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use std::sync::atomic::{AtomicBool, Ordering};

static CHILD_EXITED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigchld(_: nix::libc::c_int) {
    CHILD_EXITED.store(true, Ordering::Relaxed);
}

/// Install the SIGCHLD handler. Called once at startup; failure here is
/// fatal to the interpreter, since background children could otherwise
/// accumulate as zombies unnoticed.
pub fn install_sigchld_handler() -> anyhow::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_sigchld),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    unsafe { signal::sigaction(Signal::SIGCHLD, &action) }
        .map_err(|err| anyhow::anyhow!("unable to install SIGCHLD handler: {err}"))?;
    Ok(())
}

/// Block until every listed pid has been waited on, discarding statuses.
/// Returns only once all of them have exited.
pub fn wait_foreground(pids: &[Pid]) {
    for pid in pids {
        loop {
            match waitpid(*pid, None) {
                Ok(_) => break,
                Err(Errno::EINTR) => continue,
                Err(err) => {
                    log::warn!("waitpid({pid}) failed: {err}");
                    break;
                }
            }
        }
    }
}

/// Record a background pipeline's pids; control returns to the caller
/// immediately without waiting on any of them.
pub fn detach(session: &mut Session, pids: &[Pid]) {
    for pid in pids {
        log::debug!("detached background pid {pid}");
    }
    session.background.extend_from_slice(pids);
}

/// Non-blocking reap-all pass: collect every immediately reapable child.
///
/// Runs between lines, so the only unreaped children are background ones.
pub fn reap_background(session: &mut Session) {
    if !CHILD_EXITED.swap(false, Ordering::Relaxed) && session.background.is_empty() {
        return;
    }
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => {
                if let Some(pid) = status.pid() {
                    log::debug!("reaped background pid {pid}");
                    session.background.retain(|p| *p != pid);
                }
            }
            // ECHILD: no children left at all.
            Err(_) => break,
        }
    }
}
