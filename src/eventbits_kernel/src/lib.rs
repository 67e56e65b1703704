#![doc = include_str!("./lib.md")]
#![cfg_attr(not(test), no_std)] // Link `std` only when building a test (`cfg(test)`)
#![deny(unsafe_op_in_unsafe_fn)]
extern crate alloc;

use alloc::sync::Arc;

pub mod bits;
mod deferred;
mod error;
mod event_group;
mod klock;
mod state;
mod task;
mod timeout;
mod wait;

pub use self::{
    bits::{EventBits, EventGroupWaitFlags, CONTROL_BITS, USABLE_BITS},
    deferred::DeferredCall,
    error::*,
    event_group::{EventGroup, StaticEventGroup},
    klock::{suspend_all, SchedulerSuspendGuard},
    state::KernelState,
    task::TaskCb,
    timeout::{tick_count, Timeout, UTicks},
};

/// Implemented by a port. Provides the scheduler-suspend region and the means
/// to block and release tasks.
///
/// # Safety
///
/// Implementing a port is inherently unsafe because the kernel relies on
/// [`enter_cpu_lock`](Self::enter_cpu_lock) providing mutual exclusion between
/// contexts. These methods are only meant to be called by the kernel.
pub unsafe trait PortThreading: Send + Sync + Sized + 'static {
    /// Port-specific per-task state, stored in [`TaskCb::port_task_state`].
    type PortTaskState: Send + Sync + 'static;

    /// Enter the scheduler-suspend region (*CPU Lock*), blocking until no
    /// other context holds it. If the current context already holds it, the
    /// nesting depth is incremented instead.
    ///
    /// Precondition: task context
    unsafe fn enter_cpu_lock();

    /// Undo one [`enter_cpu_lock`](Self::enter_cpu_lock). Other contexts may
    /// proceed when the depth reaches zero.
    ///
    /// Precondition: CPU Lock active
    unsafe fn leave_cpu_lock();

    /// Get the CPU Lock nesting depth held by the current context. Returns `0`
    /// if the current context doesn't hold CPU Lock.
    fn cpu_lock_depth() -> usize;

    /// Return a flag indicating whether the current context is a task context.
    fn is_task_context() -> bool;

    /// Get the control block of the currently running task.
    ///
    /// Precondition: task context
    fn current_task() -> Arc<TaskCb<Self>>;

    /// Release CPU Lock, block the current task until [`unpark_task`] is called
    /// for it or `timeout` elapses, and re-acquire CPU Lock.
    ///
    /// Precondition: CPU Lock active with a nesting depth of exactly one,
    /// `timeout` is not [`Timeout::ZERO`]
    ///
    /// [`unpark_task`]: Self::unpark_task
    unsafe fn park_current_task(timeout: Timeout);

    /// Release a task blocked in [`park_current_task`].
    ///
    /// Precondition: CPU Lock active
    ///
    /// [`park_current_task`]: Self::park_current_task
    fn unpark_task(task: &TaskCb<Self>);

    /// Access the kernel-global state.
    fn state() -> &'static KernelState;
}

/// Implemented by a port. Provides the kernel's notion of time.
pub trait PortTimer {
    /// The number of ticks per second.
    fn tick_rate_hz() -> u32;

    /// Get the number of ticks elapsed since the port was initialized. Wraps
    /// around on overflow.
    fn tick_count() -> UTicks;
}

/// Implemented by a port. Provides interrupt-context facilities.
pub trait PortInterrupts: PortThreading {
    /// Return a flag indicating whether the current context is an interrupt
    /// context.
    fn is_interrupt_context() -> bool;

    /// Call `f` inside a short critical section that is usable in an
    /// interrupt context.
    fn with_interrupts_masked<R>(f: impl FnOnce() -> R) -> R;

    /// Enqueue `call` for execution by the deferred-call service task.
    ///
    /// Returns `Ok(true)` if enqueueing the call made the service task
    /// runnable and the caller should request a context switch on returning
    /// from the interrupt handler.
    fn pend_deferred_call(call: DeferredCall<Self>) -> Result<bool, PendDeferredCallError>;
}

/// Represents a port type having sufficient trait `impl`s to instantiate the
/// kernel.
pub trait Port: PortThreading + PortTimer + PortInterrupts {}
impl<T: PortThreading + PortTimer + PortInterrupts> Port for T {}
