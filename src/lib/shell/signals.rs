//! Cancellation of running pipelines. The interactive binary routes `SIGINT` to the session's
//! [`Interrupt`]; the executor and the reading builtins poll it.

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, OnceLock,
};

/// A shared cancellation flag. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self { Self::default() }

    pub fn raise(&self) { self.0.store(true, Ordering::SeqCst); }

    pub fn clear(&self) { self.0.store(false, Ordering::SeqCst); }

    pub fn is_raised(&self) -> bool { self.0.load(Ordering::SeqCst) }
}

static TARGET: OnceLock<Arc<AtomicBool>> = OnceLock::new();

extern "C" fn on_sigint(_: nix::libc::c_int) {
    if let Some(flag) = TARGET.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

/// Raises `interrupt` whenever the process receives `SIGINT`. Only the first interrupt
/// installed in a process is routed to.
pub fn install_handler(interrupt: &Interrupt) -> nix::Result<()> {
    let _ = TARGET.set(interrupt.0.clone());
    let action =
        SigAction::new(SigHandler::Handler(on_sigint), SaFlags::SA_RESTART, SigSet::empty());
    unsafe { signal::sigaction(Signal::SIGINT, &action) }.map(|_| ())
}
