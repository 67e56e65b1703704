//! The deferred-call service task
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    thread,
};

use eventbits_kernel::{DeferredCall, PendDeferredCallError};
use once_cell::sync::Lazy;

use crate::{config, StdPort};

struct Daemon {
    send: mpsc::SyncSender<DeferredCall<StdPort>>,

    /// `true` while the service thread is waiting for a request.
    idle: AtomicBool,
}

static DAEMON: Lazy<Daemon> = Lazy::new(|| {
    let queue_len = config::get().deferred_queue_len;
    let (send, recv) = mpsc::sync_channel::<DeferredCall<StdPort>>(queue_len);

    log::trace!("starting the deferred-call service thread (queue length = {queue_len})");
    let spawn_result = thread::Builder::new()
        .name("eventbits deferred-call service".to_owned())
        .spawn(move || {
            // The thread is adopted as a task when it first runs a call
            loop {
                DAEMON.idle.store(true, Ordering::Release);
                let call = match recv.recv() {
                    Ok(call) => call,
                    Err(mpsc::RecvError) => break,
                };
                DAEMON.idle.store(false, Ordering::Release);

                log::trace!("running {call:?}");
                call.run();
            }
            log::trace!("the deferred-call service thread is exiting");
        });

    if let Err(e) = spawn_result {
        panic!("failed to spawn the deferred-call service thread: {e}");
    }

    Daemon {
        send,
        idle: AtomicBool::new(false),
    }
});

/// Enqueue `call`. Returns `Ok(true)` if the service thread was waiting for a
/// request.
pub(crate) fn pend(call: DeferredCall<StdPort>) -> Result<bool, PendDeferredCallError> {
    let daemon = &*DAEMON;
    match daemon.send.try_send(call) {
        Ok(()) => Ok(daemon.idle.load(Ordering::Acquire)),
        Err(mpsc::TrySendError::Full(call)) => {
            log::trace!("deferred-call queue overflow; discarding {call:?}");
            Err(PendDeferredCallError::QueueOverflow)
        }
        Err(mpsc::TrySendError::Disconnected(call)) => {
            log::warn!("the deferred-call service thread is gone; discarding {call:?}");
            Err(PendDeferredCallError::QueueOverflow)
        }
    }
}
