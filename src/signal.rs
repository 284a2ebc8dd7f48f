//! SIGINT / SIGTERM turn into a cancellation flag the playback loop polls.
//!
//! No raw mode is enabled, so Ctrl-C still reaches us as a signal. The loop
//! stops at the next frame and every guard (terminal, worker, audio) unwinds
//! normally.

use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

static CANCEL: AtomicBool = AtomicBool::new(false);

pub fn cancel_flag() -> &'static AtomicBool {
    &CANCEL
}

pub fn is_cancelled() -> bool {
    CANCEL.load(Ordering::Relaxed)
}

pub fn install_cancel_handlers() {
    extern "C" fn on_signal(_: libc::c_int) {
        CANCEL.store(true, Ordering::SeqCst);
    }

    let action = SigAction::new(
        SigHandler::Handler(on_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );

    // Safety: the handler only stores to an atomic, which is async-signal-safe.
    unsafe {
        if let Err(e) = sigaction(Signal::SIGINT, &action) {
            tracing::error!("Failed to set SIGINT handler: {e}");
        }
        if let Err(e) = sigaction(Signal::SIGTERM, &action) {
            tracing::error!("Failed to set SIGTERM handler: {e}");
        }
    }
}
