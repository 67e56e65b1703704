//! Simulated interrupt contexts
use std::{panic, thread};

use spin::Mutex as SpinMutex;

use crate::threading::{self, ThreadRole};

/// Held while interrupts are "masked".
static INTERRUPT_MASK: SpinMutex<()> = SpinMutex::new(());

/// Run `f` in an interrupt context and return its result.
///
/// `f` runs on a separate thread, which the kernel sees as an interrupt
/// handler: task-only operations panic there. The calling thread is blocked
/// until `f` returns. A panic in `f` is propagated to the caller.
///
/// Unlike a real interrupt, `f` doesn't preempt the other tasks, and it's
/// not excluded by [`suspend_all`](crate::suspend_all).
pub fn run<R: Send>(f: impl FnOnce() -> R + Send) -> R {
    thread::scope(|scope| {
        let handler = scope.spawn(|| {
            threading::set_thread_role(ThreadRole::Interrupt);
            log::trace!("entering an interrupt handler");
            let result = f();
            log::trace!("leaving an interrupt handler");
            result
        });
        match handler.join() {
            Ok(result) => result,
            Err(e) => panic::resume_unwind(e),
        }
    })
}

/// Call `f` with interrupts masked. Must not be nested.
pub(crate) fn with_interrupts_masked<R>(f: impl FnOnce() -> R) -> R {
    let _guard = INTERRUPT_MASK.lock();
    f()
}
