//! Event bits and wait conditions
use core::sync::atomic::AtomicU32;

/// Unsigned integer type backing event groups.
pub type EventBits = u32;

/// The atomic counterpart of [`EventBits`].
pub(crate) type AtomicEventBits = AtomicU32;

/// The bits reserved for the kernel's own use. Event group operations reject
/// bit masks overlapping this range.
pub const CONTROL_BITS: EventBits = 0xff00_0000;

/// The bits available to applications.
pub const USABLE_BITS: EventBits = !CONTROL_BITS;

bitflags::bitflags! {
    /// Options for [`EventGroup::wait_bits`][1].
    ///
    /// [1]: crate::EventGroup::wait_bits
    pub struct EventGroupWaitFlags: u8 {
        /// Wait for all of the specified bits to be set.
        const ALL = 1 << 0;

        /// Clear the specified bits after waiting for them.
        const CLEAR = 1 << 1;
    }
}

/// Check if `current` satisfies a wait for `wanted`.
///
/// With `wait_for_all == false`, any one of `wanted` being set is enough.
/// With `wait_for_all == true`, every bit of `wanted` must be set.
#[inline]
pub fn predicate_met(current: EventBits, wanted: EventBits, wait_for_all: bool) -> bool {
    if wait_for_all {
        (current & wanted) == wanted
    } else {
        (current & wanted) != 0
    }
}

/// Panic if `bits` overlaps [`CONTROL_BITS`].
#[inline]
#[track_caller]
pub(crate) fn expect_user_bits(bits: EventBits) {
    assert!(
        bits & CONTROL_BITS == 0,
        "bits {bits:#010x} overlap the reserved control bits {CONTROL_BITS:#010x}"
    );
}

/// Panic if `bits` is not a valid wait condition.
#[inline]
#[track_caller]
pub(crate) fn expect_wait_bits(bits: EventBits) {
    expect_user_bits(bits);
    assert!(bits != 0, "attempted to wait for an empty set of bits");
}
