//! Wait queues
use alloc::{sync::Arc, vec::Vec};
use core::mem;

use crate::{
    bits::{EventBits, EventGroupWaitFlags},
    klock::{CpuLockCell, CpuLockGuard},
    task::TaskCb,
    timeout::Timeout,
    PortThreading,
};

/// The wait condition of a waiting task. This is kept separate from the event
/// group's bits, so the reserved control bits never need to be stored there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct WaitPayload {
    pub(super) bits: EventBits,
    pub(super) flags: EventGroupWaitFlags,
}

/// *A wait object* describing *which task* is waiting on *what condition*.
struct Wait<Traits: PortThreading> {
    /// The task that is waiting for something.
    task: Arc<TaskCb<Traits>>,

    payload: WaitPayload,
}

/// A queue of wait objects ([`Wait`]) waiting on a particular waitable object.
///
/// Wait objects are kept in the order they were inserted, but wake-uppers
/// don't promise anything about the order in which the released tasks
/// actually resume.
pub(super) struct WaitQueue<Traits: PortThreading> {
    /// Wait objects waiting on the waitable object associated with this
    /// instance of `WaitQueue`. The waiting tasks (`Wait::task`) are parked
    /// or about to be parked.
    waits: CpuLockCell<Traits, Vec<Wait<Traits>>>,
}

impl<Traits: PortThreading> WaitQueue<Traits> {
    /// Construct an empty `WaitQueue`.
    pub(super) const fn new() -> Self {
        Self {
            waits: CpuLockCell::new(Vec::new()),
        }
    }

    pub(super) fn is_empty(&self, lock: &CpuLockGuard<Traits>) -> bool {
        self.waits.read(lock).is_empty()
    }

    pub(super) fn len(&self, lock: &CpuLockGuard<Traits>) -> usize {
        self.waits.read(lock).len()
    }

    /// Insert a wait object pertaining to the currently running task to `self`
    /// and park the task until it's woken up or `timeout` elapses.
    ///
    /// Returns the value given by the wake-upper, or `None` if the wait timed
    /// out. Either way, the task isn't in `self` anymore when this method
    /// returns.
    ///
    /// The current context must be waitable, and `timeout` must not be zero
    /// (This function doesn't check that). The caller should use
    /// `expect_waitable_context` to do that.
    pub(super) fn wait_timeout(
        &self,
        lock: &mut CpuLockGuard<Traits>,
        payload: WaitPayload,
        timeout: Timeout,
    ) -> Option<EventBits> {
        debug_assert!(!timeout.is_zero());

        let task = Traits::current_task();
        task.unblock_value.replace(lock, None);

        self.waits.write(lock).push(Wait {
            task: Arc::clone(&task),
            payload,
        });

        // Release CPU Lock and sleep. This statement will complete when the
        // task is woken up or the timeout elapses. Any wake-upper must hold
        // CPU Lock, so by the time we get it back, the outcome is settled.
        // Safety: CPU Lock is active (we hold `lock`), and `timeout` is
        //         non-zero
        unsafe { Traits::park_current_task(timeout) };

        if let Some(value) = task.unblock_value.replace(lock, None) {
            // The wake-upper has already removed us from `self.waits`
            debug_assert!(!self.contains(lock, &task));
            return Some(value);
        }

        // Timed out. Leave the queue by ourselves.
        let waits = self.waits.write(lock);
        let i = waits
            .iter()
            .position(|wait| Arc::ptr_eq(&wait.task, &task))
            .expect("timed-out task is missing from the wait queue");
        waits.remove(i);

        None
    }

    fn contains(&self, lock: &CpuLockGuard<Traits>, task: &Arc<TaskCb<Traits>>) -> bool {
        self.waits
            .read(lock)
            .iter()
            .any(|wait| Arc::ptr_eq(&wait.task, task))
    }

    /// Examine every wait object in `self` once, in order. For each wait object
    /// for which `cond` returns `Some(value)`, remove it and wake up its task,
    /// delivering `value` as the task's unblock value.
    ///
    /// Returns `true` if at least one task was woken up.
    pub(super) fn wake_up_all_conditional(
        &self,
        lock: &mut CpuLockGuard<Traits>,
        mut cond: impl FnMut(&WaitPayload) -> Option<EventBits>,
    ) -> bool {
        // Move the list out of the cell so that the unblock value cells, which
        // are unlocked by the same token, can be written during the scan
        let mut waits = mem::take(self.waits.write(lock));
        let mut woke_up_any = false;

        waits.retain(|wait| match cond(&wait.payload) {
            Some(value) => {
                wake_up(lock, &wait.task, value);
                woke_up_any = true;
                false
            }
            None => true,
        });

        // Nobody could have inserted anything in the meantime; we have been
        // holding CPU Lock all along
        debug_assert!(self.waits.read(lock).is_empty());
        *self.waits.write(lock) = waits;

        woke_up_any
    }

    /// Wake up all tasks in `self`, delivering `value` to each of them.
    ///
    /// Returns the number of tasks woken up.
    pub(super) fn wake_up_all(&self, lock: &mut CpuLockGuard<Traits>, value: EventBits) -> usize {
        let waits = mem::take(self.waits.write(lock));
        let count = waits.len();
        for wait in waits {
            wake_up(lock, &wait.task, value);
        }
        count
    }
}

/// Deliver `value` to `task` and unpark it. `task` must have been removed from
/// its wait queue.
fn wake_up<Traits: PortThreading>(
    lock: &mut CpuLockGuard<Traits>,
    task: &TaskCb<Traits>,
    value: EventBits,
) {
    let old = task.unblock_value.replace(lock, Some(value));
    debug_assert_eq!(old, None, "task woken up twice");

    // Unpark while still holding CPU Lock. The woken task can't consume the
    // wake-up before it gets CPU Lock back, so it can't be confused by a
    // wake-up that arrives after it has already returned.
    Traits::unpark_task(task);
}
