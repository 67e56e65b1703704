#![doc = include_str!("./lib.md")]
#![deny(unsafe_op_in_unsafe_fn)]
use eventbits_kernel::{KernelState, PortInterrupts, PortThreading, PortTimer, TaskCb};
use once_cell::sync::{Lazy, OnceCell};
use std::{sync::Arc, time::Instant};

mod config;
mod daemon;
pub mod interrupt;
mod threading;


pub use self::{
    config::{init, Config},
    threading::TaskState,
};
pub use eventbits_kernel::{
    self as kernel, BadObjectStateError, CreateEventGroupError, EventBits, EventGroupWaitFlags,
    PendDeferredCallError, ResultCode, Timeout, UTicks, CONTROL_BITS, USABLE_BITS,
};

/// Used by tests and examples
#[doc(hidden)]
pub extern crate env_logger;

/// The port type.
#[derive(Debug, Clone, Copy)]
pub struct StdPort;

pub type EventGroup = eventbits_kernel::EventGroup<StdPort>;
pub type StaticEventGroup = eventbits_kernel::StaticEventGroup<StdPort>;
pub type DeferredCall = eventbits_kernel::DeferredCall<StdPort>;
pub type SchedulerSuspendGuard = eventbits_kernel::SchedulerSuspendGuard<StdPort>;

/// The internal state of the port.
struct State {
    cpu_lock: threading::CpuLock,
    kernel_state: OnceCell<KernelState>,
    origin: Lazy<Instant>,
}

static STATE: State = State {
    cpu_lock: threading::CpuLock::new(),
    kernel_state: OnceCell::new(),
    origin: Lazy::new(Instant::now),
};

/// Suspend the scheduler. See [`eventbits_kernel::suspend_all`].
#[track_caller]
pub fn suspend_all() -> SchedulerSuspendGuard {
    eventbits_kernel::suspend_all::<StdPort>()
}

/// Get the number of ticks elapsed since the port started.
pub fn tick_count() -> UTicks {
    eventbits_kernel::tick_count::<StdPort>()
}

/// Convert milliseconds to a [`Timeout`] at the configured tick rate.
pub fn timeout_ms(ms: u32) -> Timeout {
    Timeout::from_millis::<StdPort>(ms)
}

unsafe impl PortThreading for StdPort {
    type PortTaskState = TaskState;

    unsafe fn enter_cpu_lock() {
        STATE.cpu_lock.enter();
    }

    unsafe fn leave_cpu_lock() {
        STATE.cpu_lock.leave();
    }

    fn cpu_lock_depth() -> usize {
        STATE.cpu_lock.depth()
    }

    fn is_task_context() -> bool {
        threading::thread_role() != threading::ThreadRole::Interrupt
    }

    fn current_task() -> Arc<TaskCb<Self>> {
        threading::current_task()
    }

    unsafe fn park_current_task(timeout: Timeout) {
        assert_eq!(STATE.cpu_lock.depth(), 1);
        debug_assert!(!timeout.is_zero());

        let task = threading::current_task();
        let deadline = timeout
            .to_duration::<Self>()
            .map(|duration| Instant::now() + duration);

        log::trace!(
            "parking {:?} ({timeout:?})",
            task.port_task_state.thread_id()
        );

        STATE.cpu_lock.leave();
        let unparked = task.port_task_state.park(deadline);
        STATE.cpu_lock.enter();

        // Anyone who could unpark us has done so by now, and we are not in a
        // wait queue anymore once the kernel regains control
        task.port_task_state.reset();

        log::trace!(
            "{:?} resumed ({})",
            task.port_task_state.thread_id(),
            if unparked { "unparked" } else { "timed out" }
        );
    }

    fn unpark_task(task: &TaskCb<Self>) {
        log::trace!("unparking {:?}", task.port_task_state.thread_id());
        task.port_task_state.unpark();
    }

    fn state() -> &'static KernelState {
        STATE
            .kernel_state
            .get_or_init(|| KernelState::new(config::get().heap_event_groups))
    }
}

impl PortTimer for StdPort {
    fn tick_rate_hz() -> u32 {
        config::get().tick_rate_hz
    }

    fn tick_count() -> UTicks {
        let elapsed = STATE.origin.elapsed();
        let ticks = elapsed.as_nanos() * u128::from(Self::tick_rate_hz()) / 1_000_000_000;
        // Wrap around
        ticks as UTicks
    }
}

impl PortInterrupts for StdPort {
    fn is_interrupt_context() -> bool {
        threading::thread_role() == threading::ThreadRole::Interrupt
    }

    fn with_interrupts_masked<R>(f: impl FnOnce() -> R) -> R {
        interrupt::with_interrupts_masked(f)
    }

    fn pend_deferred_call(call: DeferredCall) -> Result<bool, PendDeferredCallError> {
        daemon::pend(call)
    }
}
