//! Kernel state locking mechanism
use core::{fmt, marker::PhantomData, mem, ops};
use tokenlock::UnsyncTokenLock;

use crate::{state, PortThreading};

pub(super) struct CpuLockTag<Traits>(Traits);

/// The key that "unlocks" [`CpuLockCell`].
pub(super) type CpuLockToken<Traits> = tokenlock::UnsyncSingletonToken<CpuLockTag<Traits>>;

/// The keyhole type for [`UnsyncTokenLock`] that can be "unlocked" by
/// [`CpuLockToken`].
pub(super) type CpuLockKeyhole<Traits> = tokenlock::SingletonTokenId<CpuLockTag<Traits>>;

/// Cell type that can be accessed by [`CpuLockToken`] (which can be obtained
/// by [`lock_cpu`]).
pub(super) struct CpuLockCell<Traits, T: ?Sized>(UnsyncTokenLock<T, CpuLockKeyhole<Traits>>);

impl<Traits, T> CpuLockCell<Traits, T> {
    pub(super) const fn new(x: T) -> Self {
        Self(UnsyncTokenLock::new(CpuLockKeyhole::new(), x))
    }
}

impl<Traits: PortThreading, T: ?Sized> CpuLockCell<Traits, T> {
    #[inline]
    pub(super) fn read<'a>(&'a self, lock: &'a CpuLockGuard<Traits>) -> &'a T {
        self.0.read(&**lock)
    }

    #[inline]
    pub(super) fn write<'a>(&'a self, lock: &'a mut CpuLockGuard<Traits>) -> &'a mut T {
        self.0.write(&mut **lock)
    }
}

impl<Traits: PortThreading, T> CpuLockCell<Traits, T> {
    #[inline]
    pub(super) fn get(&self, lock: &CpuLockGuard<Traits>) -> T
    where
        T: Copy,
    {
        *self.read(lock)
    }

    #[inline]
    pub(super) fn replace(&self, lock: &mut CpuLockGuard<Traits>, x: T) -> T {
        mem::replace(self.write(lock), x)
    }
}

impl<Traits, T: ?Sized> fmt::Debug for CpuLockCell<Traits, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // The contents can't be borrowed without CPU Lock, and acquiring it
        // here might block or nest inside a kernel operation
        f.write_str("CpuLockCell(..)")
    }
}

/// Enter CPU Lock and get an RAII guard.
///
/// Kernel code never calls this while holding another `CpuLockGuard`, so at
/// most one `CpuLockToken` exists at any point even though the port allows the
/// calling context to nest CPU Lock through [`suspend_all`].
#[track_caller]
pub(super) fn lock_cpu<Traits: PortThreading>() -> CpuLockGuard<Traits> {
    state::expect_task_context::<Traits>();

    // Safety: We are in a task context
    unsafe { Traits::enter_cpu_lock() };

    CpuLockGuard {
        // Safety: Other contexts are excluded by CPU Lock, and the kernel
        //         doesn't nest `lock_cpu` (see above)
        token: unsafe { CpuLockToken::new_unchecked() },
    }
}

/// RAII guard for a CPU Lock state.
///
/// [`CpuLockToken`] can be borrowed from this type.
pub(super) struct CpuLockGuard<Traits: PortThreading> {
    token: CpuLockToken<Traits>,
}

impl<Traits: PortThreading> Drop for CpuLockGuard<Traits> {
    fn drop(&mut self) {
        // Safety: CPU Lock is currently active, and it's us (the kernel) who
        // are currently controlling the CPU Lock state
        unsafe { Traits::leave_cpu_lock() };
    }
}

impl<Traits: PortThreading> ops::Deref for CpuLockGuard<Traits> {
    type Target = CpuLockToken<Traits>;
    fn deref(&self) -> &Self::Target {
        &self.token
    }
}

impl<Traits: PortThreading> ops::DerefMut for CpuLockGuard<Traits> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.token
    }
}

/// Suspend the scheduler: no other task touches any event group until the
/// returned guard is dropped. Calls nest; the scheduler resumes when the
/// outermost guard is dropped.
///
/// The calling task may still use event groups, but it must not block in
/// [`EventGroup::wait_bits`] or [`EventGroup::sync`] with a non-zero timeout
/// (this is checked by an assertion).
///
/// Tasks released while the scheduler is suspended (e.g., by
/// [`EventGroup::set_bits`]) start running when the scheduler resumes.
///
/// Panics if called from an interrupt context.
///
/// [`EventGroup::wait_bits`]: crate::EventGroup::wait_bits
/// [`EventGroup::sync`]: crate::EventGroup::sync
/// [`EventGroup::set_bits`]: crate::EventGroup::set_bits
#[track_caller]
pub fn suspend_all<Traits: PortThreading>() -> SchedulerSuspendGuard<Traits> {
    state::expect_task_context::<Traits>();
    // Safety: We are in a task context
    unsafe { Traits::enter_cpu_lock() };
    log::trace!("scheduler suspended (depth = {})", Traits::cpu_lock_depth());
    SchedulerSuspendGuard {
        _phantom: PhantomData,
    }
}

/// RAII guard returned by [`suspend_all`]. Resumes the scheduler when
/// dropped.
#[must_use = "the scheduler resumes as soon as the guard is dropped"]
pub struct SchedulerSuspendGuard<Traits: PortThreading> {
    // `!Send`: the suspend region belongs to the context that entered it
    _phantom: PhantomData<(Traits, *const ())>,
}

impl<Traits: PortThreading> Drop for SchedulerSuspendGuard<Traits> {
    fn drop(&mut self) {
        log::trace!("scheduler resuming (depth = {})", Traits::cpu_lock_depth());
        // Safety: Entered by `suspend_all`, on this context
        unsafe { Traits::leave_cpu_lock() };
    }
}

impl<Traits: PortThreading> fmt::Debug for SchedulerSuspendGuard<Traits> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("SchedulerSuspendGuard")
    }
}
