//! Event groups
use alloc::sync::Arc;
use core::{
    fmt,
    sync::atomic::{AtomicBool, AtomicU32, Ordering},
};

#[cfg(feature = "trace_facility")]
use core::sync::atomic::AtomicUsize;

use crate::{
    bits::{
        expect_user_bits, expect_wait_bits, predicate_met, AtomicEventBits, EventBits,
        EventGroupWaitFlags, CONTROL_BITS,
    },
    deferred::DeferredCall,
    error::{BadObjectStateError, CreateEventGroupError, PendDeferredCallError},
    klock::{self, CpuLockGuard},
    state,
    timeout::Timeout,
    wait::{WaitPayload, WaitQueue},
    Port, PortThreading,
};

/// *Event group control block* - the state data of an event group.
pub(super) struct EventGroupCb<Traits: PortThreading> {
    /// The current bits. Only written while CPU Lock is active. This isn't a
    /// `CpuLockCell` because [`EventGroup::get_bits_from_isr`] reads it
    /// without CPU Lock.
    bits: AtomicEventBits,

    wait_queue: WaitQueue<Traits>,

    /// Incremented by [`EventGroup::delete`]. A handle is valid only while its
    /// own generation matches this. Only written while CPU Lock is active.
    generation: AtomicU32,

    /// `true` if a live event group occupies this storage. Only meaningful for
    /// caller-provided storage.
    in_use: AtomicBool,

    statically_allocated: bool,

    #[cfg(feature = "trace_facility")]
    number: AtomicUsize,
}

impl<Traits: PortThreading> EventGroupCb<Traits> {
    const fn new(statically_allocated: bool) -> Self {
        Self {
            bits: AtomicEventBits::new(0),
            wait_queue: WaitQueue::new(),
            generation: AtomicU32::new(0),
            in_use: AtomicBool::new(false),
            statically_allocated,
            #[cfg(feature = "trace_facility")]
            number: AtomicUsize::new(0),
        }
    }
}

impl<Traits: PortThreading> Drop for EventGroupCb<Traits> {
    fn drop(&mut self) {
        if !self.statically_allocated {
            Traits::state().release_event_group();
        }
    }
}

impl<Traits: PortThreading> fmt::Debug for EventGroupCb<Traits> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EventGroupCb")
            .field("self", &(self as *const _))
            .field("bits", &self.bits)
            .field("generation", &self.generation)
            .field("statically_allocated", &self.statically_allocated)
            .finish_non_exhaustive()
    }
}

/// Caller-provided storage for an event group, to be passed to
/// [`EventGroup::create_static`].
///
/// The storage can be reused for a new event group after the previous one is
/// deleted.
///
/// ```rust,ignore
/// static STORAGE: StaticEventGroup<MyPort> = StaticEventGroup::new();
///
/// let group = EventGroup::create_static(&STORAGE);
/// ```
pub struct StaticEventGroup<Traits: PortThreading> {
    cb: EventGroupCb<Traits>,
}

impl<Traits: PortThreading> StaticEventGroup<Traits> {
    pub const fn new() -> Self {
        Self {
            cb: EventGroupCb::new(true),
        }
    }

    /// Return a flag indicating whether a live event group currently occupies
    /// `self`.
    pub fn is_in_use(&self) -> bool {
        self.cb.in_use.load(Ordering::Acquire)
    }
}

impl<Traits: PortThreading> Default for StaticEventGroup<Traits> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Traits: PortThreading> fmt::Debug for StaticEventGroup<Traits> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("StaticEventGroup")
            .field("cb", &self.cb)
            .field("in_use", &self.is_in_use())
            .finish()
    }
}

enum Storage<Traits: PortThreading> {
    Heap(Arc<EventGroupCb<Traits>>),
    Static(&'static StaticEventGroup<Traits>),
}

impl<Traits: PortThreading> Clone for Storage<Traits> {
    fn clone(&self) -> Self {
        match self {
            Self::Heap(cb) => Self::Heap(Arc::clone(cb)),
            Self::Static(buffer) => Self::Static(buffer),
        }
    }
}

/// A handle to an event group.
///
/// Handles are cheap to clone, and all clones refer to the same event group.
/// Once the event group is [deleted](Self::delete), using any of its handles
/// is a programming error and causes a panic. Storage released by deletion is
/// never accessed through such a handle.
pub struct EventGroup<Traits: PortThreading> {
    storage: Storage<Traits>,
    generation: u32,
}

impl<Traits: PortThreading> Clone for EventGroup<Traits> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            generation: self.generation,
        }
    }
}

impl<Traits: PortThreading> PartialEq for EventGroup<Traits> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.cb(), other.cb()) && self.generation == other.generation
    }
}

impl<Traits: PortThreading> Eq for EventGroup<Traits> {}

impl<Traits: PortThreading> fmt::Debug for EventGroup<Traits> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("EventGroup")
            .field("cb", &(self.cb() as *const _))
            .field("generation", &self.generation)
            .field("statically_allocated", &self.cb().statically_allocated)
            .finish()
    }
}

impl<Traits: PortThreading> EventGroup<Traits> {
    #[inline]
    fn cb(&self) -> &EventGroupCb<Traits> {
        match &self.storage {
            Storage::Heap(cb) => cb,
            Storage::Static(buffer) => &buffer.cb,
        }
    }

    /// Enter CPU Lock. Returns `None` (leaving CPU Lock) if the event group
    /// has been deleted.
    fn lock_if_live(&self) -> Option<CpuLockGuard<Traits>> {
        let lock = klock::lock_cpu::<Traits>();
        (self.cb().generation.load(Ordering::Relaxed) == self.generation).then(|| lock)
    }

    /// Enter CPU Lock. Panics if the event group has been deleted.
    #[track_caller]
    fn lock(&self) -> CpuLockGuard<Traits> {
        match self.lock_if_live() {
            Some(lock) => lock,
            None => panic!("event group used after deletion"),
        }
    }

    /// Check liveness without CPU Lock. The result is only a snapshot.
    #[track_caller]
    fn expect_live_unlocked(&self) {
        assert!(
            self.cb().generation.load(Ordering::Acquire) == self.generation,
            "event group used after deletion"
        );
    }

    #[inline]
    fn load_bits(&self) -> EventBits {
        self.cb().bits.load(Ordering::Acquire)
    }

    /// Update the bits. CPU Lock must be active.
    #[inline]
    fn store_bits(&self, _lock: &CpuLockGuard<Traits>, bits: EventBits) {
        self.cb().bits.store(bits, Ordering::Release);
    }

    /// Create an event group in the kernel heap.
    ///
    /// Returns [`CreateEventGroupError::OutOfMemory`] if the port's budget for
    /// dynamically allocated event groups is exhausted.
    ///
    /// Panics if called from an interrupt context.
    #[track_caller]
    pub fn create() -> Result<Self, CreateEventGroupError> {
        state::expect_task_context::<Traits>();

        if !Traits::state().try_reserve_event_group() {
            log::trace!("event group creation failed: heap budget exhausted");
            return Err(CreateEventGroupError::OutOfMemory);
        }

        let cb = Arc::new(EventGroupCb::new(false));
        log::trace!("created event group {:p}", &*cb);

        Ok(Self {
            storage: Storage::Heap(cb),
            generation: 0,
        })
    }

    /// Create an event group in caller-provided storage.
    ///
    /// Panics if `buffer` is still occupied by an event group that hasn't been
    /// deleted, or if called from an interrupt context.
    #[track_caller]
    pub fn create_static(buffer: &'static StaticEventGroup<Traits>) -> Self {
        state::expect_task_context::<Traits>();

        let cb = &buffer.cb;
        let was_in_use = cb.in_use.swap(true, Ordering::AcqRel);
        assert!(!was_in_use, "static event group storage is already in use");

        // We own the storage now. The previous incarnation's waiters were all
        // released by `delete`.
        cb.bits.store(0, Ordering::Release);
        #[cfg(feature = "trace_facility")]
        cb.number.store(0, Ordering::Relaxed);
        let generation = cb.generation.load(Ordering::Acquire);

        log::trace!("created event group {:p} in static storage", cb);

        Self {
            storage: Storage::Static(buffer),
            generation,
        }
    }

    /// Get the caller-provided storage of an event group created by
    /// [`create_static`](Self::create_static).
    ///
    /// Returns [`BadObjectStateError::BadObjectState`] if the event group was
    /// created by [`create`](Self::create).
    pub fn static_buffer(&self) -> Result<&'static StaticEventGroup<Traits>, BadObjectStateError> {
        self.expect_live_unlocked();
        match self.storage {
            Storage::Static(buffer) => Ok(buffer),
            Storage::Heap(_) => Err(BadObjectStateError::BadObjectState),
        }
    }

    /// Set the specified bits and release every waiting task whose wait
    /// condition is satisfied by the result.
    ///
    /// Every waiter is evaluated against the bits as they are right after
    /// setting. The bits requested to be cleared by the released waiters are
    /// cleared after that, all at once. Returns the bits after clearing.
    ///
    /// Panics if `bits` overlaps [`CONTROL_BITS`], if the event group has been
    /// deleted, or if called from an interrupt context.
    #[track_caller]
    pub fn set_bits(&self, bits: EventBits) -> EventBits {
        expect_user_bits(bits);
        let mut lock = self.lock();
        let result = self.set_core(&mut lock, bits);
        log::trace!("set_bits({:p}, {bits:#x}) -> {result:#x}", self.cb());
        result
    }

    fn set_core(&self, lock: &mut CpuLockGuard<Traits>, bits_to_set: EventBits) -> EventBits {
        let bits = self.load_bits() | bits_to_set;
        let mut bits_to_clear: EventBits = 0;

        let woke_up_any = self.cb().wait_queue.wake_up_all_conditional(lock, |payload| {
            if predicate_met(bits, payload.bits, payload.flags.contains(EventGroupWaitFlags::ALL))
            {
                if payload.flags.contains(EventGroupWaitFlags::CLEAR) {
                    bits_to_clear |= payload.bits;
                }
                Some(bits)
            } else {
                None
            }
        });

        let result = bits & !bits_to_clear;
        self.store_bits(lock, result);

        if woke_up_any {
            log::trace!(
                "{:p}: released waiters, cleared {bits_to_clear:#x}, {} still waiting",
                self.cb(),
                self.cb().wait_queue.len(lock)
            );
        }

        result
    }

    /// Clear the specified bits. Returns the bits before clearing.
    ///
    /// Panics if `bits` overlaps [`CONTROL_BITS`], if the event group has been
    /// deleted, or if called from an interrupt context.
    #[track_caller]
    pub fn clear_bits(&self, bits: EventBits) -> EventBits {
        expect_user_bits(bits);
        let lock = self.lock();
        let original = self.load_bits();
        self.store_bits(&lock, original & !bits);
        log::trace!("clear_bits({:p}, {bits:#x}) -> {original:#x}", self.cb());
        original
    }

    /// Get the current bits.
    ///
    /// Panics if the event group has been deleted, or if called from an
    /// interrupt context (use [`get_bits_from_isr`](Self::get_bits_from_isr)
    /// there).
    #[track_caller]
    pub fn get_bits(&self) -> EventBits {
        let _lock = self.lock();
        self.load_bits()
    }

    /// Get the number of tasks currently blocked on the event group.
    #[track_caller]
    pub fn num_waiting_tasks(&self) -> usize {
        let lock = self.lock();
        self.cb().wait_queue.len(&lock)
    }

    /// Wait until the specified bits are set.
    ///
    /// With [`EventGroupWaitFlags::ALL`], all of `bits` must be set; otherwise
    /// any one of them is enough. With [`EventGroupWaitFlags::CLEAR`], `bits`
    /// are cleared when the wait completes.
    ///
    /// Returns the bits observed when the wait completed (before clearing).
    /// There is no separate timeout indication: the caller tests the result
    /// against `bits`. A wait that times out may still return satisfying bits
    /// if they were set between the timeout and the task resuming. Deleting
    /// the event group releases the waiter with `0`.
    ///
    /// [`Timeout::ZERO`] makes this a poll, which is allowed while the
    /// scheduler is suspended.
    ///
    /// Panics if `bits` is zero or overlaps [`CONTROL_BITS`], if the event
    /// group has been deleted, if called from an interrupt context, or if
    /// `timeout` is non-zero and the scheduler is suspended by
    /// [`suspend_all`](crate::suspend_all).
    #[track_caller]
    pub fn wait_bits(
        &self,
        bits: EventBits,
        flags: EventGroupWaitFlags,
        timeout: Timeout,
    ) -> EventBits {
        expect_wait_bits(bits);
        state::expect_waitable_context::<Traits>(timeout);

        let mut lock = self.lock();
        let wait_for_all = flags.contains(EventGroupWaitFlags::ALL);
        let current = self.load_bits();

        if predicate_met(current, bits, wait_for_all) {
            if flags.contains(EventGroupWaitFlags::CLEAR) {
                self.store_bits(&lock, current & !bits);
            }
            log::trace!(
                "wait_bits({:p}, {bits:#x}, {flags:?}) satisfied immediately: {current:#x}",
                self.cb()
            );
            return current;
        }

        if timeout.is_zero() {
            return current;
        }

        log::trace!(
            "wait_bits({:p}, {bits:#x}, {flags:?}, {timeout:?}): blocking",
            self.cb()
        );

        let payload = WaitPayload { bits, flags };
        self.finish_wait(&mut lock, payload, timeout)
    }

    /// Set `bits_to_set`, then wait until all of `bits_to_wait_for` are set,
    /// as a rendezvous point between tasks. `bits_to_wait_for` is cleared when
    /// the rendezvous completes.
    ///
    /// Returns the bits observed when the rendezvous completed (before
    /// clearing), or the current bits if it timed out.
    ///
    /// Panics on the same conditions as [`wait_bits`](Self::wait_bits), or if
    /// `bits_to_set` overlaps [`CONTROL_BITS`].
    #[track_caller]
    pub fn sync(
        &self,
        bits_to_set: EventBits,
        bits_to_wait_for: EventBits,
        timeout: Timeout,
    ) -> EventBits {
        expect_user_bits(bits_to_set);
        expect_wait_bits(bits_to_wait_for);
        state::expect_waitable_context::<Traits>(timeout);

        let mut lock = self.lock();
        let original = self.load_bits();

        // This may release other tasks taking part in the rendezvous
        self.set_core(&mut lock, bits_to_set);

        let reached = original | bits_to_set;
        if reached & bits_to_wait_for == bits_to_wait_for {
            // All tasks have arrived. The bits may have been consumed by a
            // released waiter already; clearing again is harmless.
            let current = self.load_bits();
            self.store_bits(&lock, current & !bits_to_wait_for);
            log::trace!(
                "sync({:p}, {bits_to_set:#x}, {bits_to_wait_for:#x}) completed immediately: {reached:#x}",
                self.cb()
            );
            return reached;
        }

        if timeout.is_zero() {
            return self.load_bits();
        }

        log::trace!(
            "sync({:p}, {bits_to_set:#x}, {bits_to_wait_for:#x}, {timeout:?}): blocking",
            self.cb()
        );

        let payload = WaitPayload {
            bits: bits_to_wait_for,
            flags: EventGroupWaitFlags::ALL | EventGroupWaitFlags::CLEAR,
        };
        self.finish_wait(&mut lock, payload, timeout)
    }

    /// The blocking part of `wait_bits` and `sync`.
    fn finish_wait(
        &self,
        lock: &mut CpuLockGuard<Traits>,
        payload: WaitPayload,
        timeout: Timeout,
    ) -> EventBits {
        if let Some(value) = self.cb().wait_queue.wait_timeout(lock, payload, timeout) {
            // Released by `set_core` or `delete`. The event group might not
            // exist anymore, so don't touch it.
            log::trace!("wait on {:p} completed: {value:#x}", self.cb());
            return value & !CONTROL_BITS;
        }

        // Timed out. We were still in the wait queue, so the event group is
        // still alive. The bits might have been set after the timeout fired
        // and before we got CPU Lock back.
        let current = self.load_bits();
        if predicate_met(
            current,
            payload.bits,
            payload.flags.contains(EventGroupWaitFlags::ALL),
        ) && payload.flags.contains(EventGroupWaitFlags::CLEAR)
        {
            self.store_bits(lock, current & !payload.bits);
        }

        log::trace!("wait on {:p} timed out: {current:#x}", self.cb());
        current & !CONTROL_BITS
    }

    /// Delete the event group. Every waiting task is released with `0`.
    ///
    /// Caller-provided storage becomes available for
    /// [`create_static`](Self::create_static) again. Heap storage is released
    /// when the last handle is dropped. Any remaining handle becomes invalid.
    ///
    /// Panics if the event group has already been deleted, or if called from
    /// an interrupt context.
    #[track_caller]
    pub fn delete(self) {
        let mut lock = self.lock();
        let cb = self.cb();

        let released = cb.wait_queue.wake_up_all(&mut lock, 0);
        debug_assert!(cb.wait_queue.is_empty(&lock));

        cb.generation
            .store(self.generation.wrapping_add(1), Ordering::Release);
        drop(lock);

        log::trace!("deleted event group {:p}, released {released} waiter(s)", cb);

        if let Storage::Static(buffer) = self.storage {
            buffer.cb.in_use.store(false, Ordering::Release);
        }
    }

    /// The body of a deferred `set_bits`. Returns `None` if the event group
    /// has been deleted.
    pub(super) fn set_bits_if_live(&self, bits: EventBits) -> Option<EventBits> {
        let mut lock = self.lock_if_live()?;
        Some(self.set_core(&mut lock, bits))
    }

    /// The body of a deferred `clear_bits`. Returns `None` if the event group
    /// has been deleted.
    pub(super) fn clear_bits_if_live(&self, bits: EventBits) -> Option<EventBits> {
        let lock = self.lock_if_live()?;
        let original = self.load_bits();
        self.store_bits(&lock, original & !bits);
        Some(original)
    }

    /// Get the trace facility number.
    #[cfg(feature = "trace_facility")]
    pub fn number(&self) -> usize {
        self.expect_live_unlocked();
        self.cb().number.load(Ordering::Relaxed)
    }

    /// Set the trace facility number.
    #[cfg(feature = "trace_facility")]
    pub fn set_number(&self, number: usize) {
        self.expect_live_unlocked();
        self.cb().number.store(number, Ordering::Relaxed);
    }
}

impl<Traits: Port> EventGroup<Traits> {
    /// Get the current bits. Unlike [`get_bits`](Self::get_bits), this can be
    /// called from an interrupt context.
    pub fn get_bits_from_isr(&self) -> EventBits {
        Traits::with_interrupts_masked(|| {
            self.expect_live_unlocked();
            self.load_bits()
        })
    }

    /// Request the deferred-call service task to
    /// [`set_bits`](Self::set_bits). Usable in an interrupt context.
    ///
    /// Returns `Ok(true)` if the service task became runnable, in which case
    /// an interrupt handler should request a context switch before returning.
    /// Returns [`PendDeferredCallError::QueueOverflow`] if the request
    /// couldn't be queued.
    ///
    /// The resulting bits can't be known at this point. If the event group is
    /// deleted before the request is processed, the request is discarded.
    #[track_caller]
    pub fn set_bits_from_isr(&self, bits: EventBits) -> Result<bool, PendDeferredCallError> {
        expect_user_bits(bits);
        self.expect_live_unlocked();
        let result = Traits::pend_deferred_call(DeferredCall::SetBits(self.clone(), bits));
        log::trace!("set_bits_from_isr({:p}, {bits:#x}) -> {result:?}", self.cb());
        result
    }

    /// Request the deferred-call service task to
    /// [`clear_bits`](Self::clear_bits). Usable in an interrupt context.
    ///
    /// Returns [`PendDeferredCallError::QueueOverflow`] if the request
    /// couldn't be queued.
    #[track_caller]
    pub fn clear_bits_from_isr(&self, bits: EventBits) -> Result<(), PendDeferredCallError> {
        expect_user_bits(bits);
        self.expect_live_unlocked();
        let result =
            Traits::pend_deferred_call(DeferredCall::ClearBits(self.clone(), bits)).map(|_| ());
        log::trace!("clear_bits_from_isr({:p}, {bits:#x}) -> {result:?}", self.cb());
        result
    }
}
