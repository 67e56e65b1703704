//! Tasks
use core::fmt;

use crate::{bits::EventBits, klock::CpuLockCell, PortThreading};

/// *Task control block* - the state data of a task, as far as the kernel is
/// concerned.
pub struct TaskCb<Traits: PortThreading> {
    /// Port-specific state, e.g., what's needed to unpark the task.
    pub port_task_state: Traits::PortTaskState,

    /// The value delivered by the wake-upper when this task was released from
    /// a wait queue. `Some(bits)` means the task was released because its
    /// wait condition was met (or its event group was deleted), `bits` being
    /// the event group's value at that point. `None` after waking up means
    /// the wait timed out.
    pub(super) unblock_value: CpuLockCell<Traits, Option<EventBits>>,
}

impl<Traits: PortThreading> TaskCb<Traits> {
    /// Construct a `TaskCb`. Called by a port when it adopts a new task.
    pub const fn new(port_task_state: Traits::PortTaskState) -> Self {
        Self {
            port_task_state,
            unblock_value: CpuLockCell::new(None),
        }
    }
}

impl<Traits: PortThreading> fmt::Debug for TaskCb<Traits>
where
    Traits::PortTaskState: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TaskCb")
            .field("self", &(self as *const _))
            .field("port_task_state", &self.port_task_state)
            .finish_non_exhaustive()
    }
}
