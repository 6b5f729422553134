//! SIGINT adapter for session termination
//!
//! The handler only stores into a static atomic; the session loop polls the
//! flag once per interval. Single writer (the handler), single reader (the
//! loop), so no further synchronization is needed.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

static TERMINATE: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_terminate(_signum: libc::c_int) {
    TERMINATE.store(true, Ordering::SeqCst);
}

/// Install the SIGINT handler and return the flag it sets. The flag is
/// handed to the session loop rather than read globally, keeping the loop
/// testable with a locally owned flag.
pub fn install_termination_flag() -> Result<&'static AtomicBool> {
    let action = SigAction::new(
        SigHandler::Handler(handle_terminate),
        SaFlags::empty(),
        SigSet::empty(),
    );
    unsafe { sigaction(Signal::SIGINT, &action) }
        .context("failed to install SIGINT handler")?;
    Ok(&TERMINATE)
}
