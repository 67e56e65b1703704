use core::sync::atomic::{AtomicUsize, Ordering};

use crate::{timeout::Timeout, PortThreading};

/// Kernel-global state. A port owns one instance and exposes it through
/// [`PortThreading::state`].
#[derive(Debug)]
pub struct KernelState {
    /// The maximum number of event groups that may be allocated by
    /// [`EventGroup::create`](crate::EventGroup::create) at the same time.
    heap_event_group_limit: usize,

    /// The number of live, dynamically allocated event groups.
    heap_event_groups: AtomicUsize,
}

impl KernelState {
    /// Construct a `KernelState`. `None` means dynamic allocation never fails.
    pub const fn new(heap_event_group_limit: Option<usize>) -> Self {
        Self {
            heap_event_group_limit: match heap_event_group_limit {
                Some(x) => x,
                None => usize::MAX,
            },
            heap_event_groups: AtomicUsize::new(0),
        }
    }

    /// Get the number of dynamically allocated event groups that haven't been
    /// released yet.
    pub fn heap_event_groups_in_use(&self) -> usize {
        self.heap_event_groups.load(Ordering::Relaxed)
    }

    /// Reserve heap space for one event group. Returns `false` if the heap is
    /// exhausted.
    pub(super) fn try_reserve_event_group(&self) -> bool {
        let limit = self.heap_event_group_limit;
        self.heap_event_groups
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |x| {
                (x < limit).then(|| x + 1)
            })
            .is_ok()
    }

    /// Undo [`Self::try_reserve_event_group`].
    pub(super) fn release_event_group(&self) {
        let old = self.heap_event_groups.fetch_sub(1, Ordering::Relaxed);
        debug_assert_ne!(old, 0);
    }
}

/// If the current context is not a task context, panic.
#[track_caller]
pub(super) fn expect_task_context<Traits: PortThreading>() {
    assert!(
        Traits::is_task_context(),
        "this operation is only allowed in a task context"
    );
}

/// Panic if the current context can't block for `timeout`.
///
/// Blocking while the current task holds the scheduler-suspend region would
/// deadlock: no other task could ever release it.
#[track_caller]
pub(super) fn expect_waitable_context<Traits: PortThreading>(timeout: Timeout) {
    expect_task_context::<Traits>();
    assert!(
        timeout.is_zero() || Traits::cpu_lock_depth() == 0,
        "attempted to block while the scheduler is suspended"
    );
}
