//! Operations deferred from an interrupt context
use core::fmt;

use crate::{bits::EventBits, event_group::EventGroup, PortThreading};

/// An event group operation requested from an interrupt context, to be
/// executed later by the port's deferred-call service task.
///
/// Created by [`EventGroup::set_bits_from_isr`] and
/// [`EventGroup::clear_bits_from_isr`] and handed to
/// [`PortInterrupts::pend_deferred_call`](crate::PortInterrupts::pend_deferred_call).
pub enum DeferredCall<Traits: PortThreading> {
    SetBits(EventGroup<Traits>, EventBits),
    ClearBits(EventGroup<Traits>, EventBits),
}

impl<Traits: PortThreading> DeferredCall<Traits> {
    /// Perform the operation. Must be called from a task context.
    ///
    /// The operation is skipped if the target event group was deleted after
    /// the call was requested.
    pub fn run(self) {
        match self {
            Self::SetBits(group, bits) => match group.set_bits_if_live(bits) {
                Some(result) => {
                    log::trace!("deferred set_bits({group:?}, {bits:#x}) -> {result:#x}")
                }
                None => log::warn!("deferred set_bits({bits:#x}) dropped: {group:?} was deleted"),
            },
            Self::ClearBits(group, bits) => match group.clear_bits_if_live(bits) {
                Some(result) => {
                    log::trace!("deferred clear_bits({group:?}, {bits:#x}) -> {result:#x}")
                }
                None => {
                    log::warn!("deferred clear_bits({bits:#x}) dropped: {group:?} was deleted")
                }
            },
        }
    }
}

impl<Traits: PortThreading> fmt::Debug for DeferredCall<Traits> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::SetBits(group, bits) => f
                .debug_tuple("SetBits")
                .field(group)
                .field(&format_args!("{bits:#x}"))
                .finish(),
            Self::ClearBits(group, bits) => f
                .debug_tuple("ClearBits")
                .field(group)
                .field(&format_args!("{bits:#x}"))
                .finish(),
        }
    }
}
