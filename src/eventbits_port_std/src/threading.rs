//! Tasks backed by OS threads, and the scheduler-suspend region
use std::{
    cell::Cell,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread::{self, ThreadId},
    time::Instant,
};

use eventbits_kernel::TaskCb;
use once_cell::unsync::OnceCell;

use crate::StdPort;

/// The role of a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ThreadRole {
    /// A thread that hasn't declared itself. Treated as a task.
    Unknown,
    /// The backing thread for a task, adopted on first use.
    Task,
    /// The backing thread for an interrupt context.
    Interrupt,
}

thread_local! {
    /// The current thread's role.
    static THREAD_ROLE: Cell<ThreadRole> = Cell::new(ThreadRole::Unknown);

    /// The task control block of the current thread. Created when the thread
    /// first needs one.
    static CURRENT_TASK: OnceCell<Arc<TaskCb<StdPort>>> = OnceCell::new();
}

pub(crate) fn thread_role() -> ThreadRole {
    THREAD_ROLE.with(Cell::get)
}

pub(crate) fn set_thread_role(role: ThreadRole) {
    THREAD_ROLE.with(|r| r.set(role));
}

/// Get the current thread's task control block, adopting the thread as a task
/// if it hasn't been yet.
pub(crate) fn current_task() -> Arc<TaskCb<StdPort>> {
    assert_ne!(thread_role(), ThreadRole::Interrupt);
    CURRENT_TASK.with(|cell| {
        Arc::clone(cell.get_or_init(|| {
            let thread = thread::current();
            log::trace!(
                "adopting thread {:?} ({:?}) as a task",
                thread.id(),
                thread.name()
            );
            set_thread_role(ThreadRole::Task);
            Arc::new(TaskCb::new(TaskState::new(thread.id())))
        }))
    })
}

/// Lock a `std` mutex. The mutexes in this module are never held across user
/// code, so a poisoned one is still consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The port-specific state of a task.
#[derive(Debug)]
pub struct TaskState {
    thread: ThreadId,

    /// Set by `unpark`, cleared by `reset` (with CPU Lock active).
    token: Mutex<bool>,
    token_set: Condvar,
}

impl TaskState {
    fn new(thread: ThreadId) -> Self {
        Self {
            thread,
            token: Mutex::new(false),
            token_set: Condvar::new(),
        }
    }

    /// The thread backing the task.
    pub fn thread_id(&self) -> ThreadId {
        self.thread
    }

    /// Block the current thread until the token is set or `deadline` passes.
    /// Returns `true` if the token was set.
    pub(crate) fn park(&self, deadline: Option<Instant>) -> bool {
        debug_assert_eq!(thread::current().id(), self.thread);

        let mut token = lock(&self.token);
        while !*token {
            token = match deadline {
                None => self
                    .token_set
                    .wait(token)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    self.token_set
                        .wait_timeout(token, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
        *token
    }

    pub(crate) fn unpark(&self) {
        *lock(&self.token) = true;
        self.token_set.notify_one();
    }

    /// Discard a token left by `unpark`.
    pub(crate) fn reset(&self) {
        *lock(&self.token) = false;
    }
}

/// A process-wide lock that can be re-entered by the thread holding it.
#[derive(Debug)]
pub(crate) struct CpuLock {
    state: Mutex<CpuLockState>,
    released: Condvar,
}

#[derive(Debug)]
struct CpuLockState {
    owner: Option<ThreadId>,
    depth: usize,
}

impl CpuLock {
    pub(crate) const fn new() -> Self {
        Self {
            state: Mutex::new(CpuLockState {
                owner: None,
                depth: 0,
            }),
            released: Condvar::new(),
        }
    }

    pub(crate) fn enter(&self) {
        let me = thread::current().id();
        let mut state = lock(&self.state);

        if state.owner == Some(me) {
            state.depth += 1;
            return;
        }

        while state.owner.is_some() {
            state = self
                .released
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        state.owner = Some(me);
        state.depth = 1;
    }

    pub(crate) fn leave(&self) {
        let me = thread::current().id();
        let mut state = lock(&self.state);

        assert_eq!(
            state.owner,
            Some(me),
            "CPU Lock released by a thread not holding it"
        );

        state.depth -= 1;
        if state.depth == 0 {
            state.owner = None;
            drop(state);
            self.released.notify_one();
        }
    }

    /// Get the nesting depth held by the current thread.
    pub(crate) fn depth(&self) -> usize {
        let state = lock(&self.state);
        if state.owner == Some(thread::current().id()) {
            state.depth
        } else {
            0
        }
    }
}
