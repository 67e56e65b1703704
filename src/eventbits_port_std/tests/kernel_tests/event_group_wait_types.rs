//! Waits for an event group with various wait flags, never blocking.
use eventbits_port_std::{EventGroup, EventGroupWaitFlags, Timeout};
use quickcheck_macros::quickcheck;
use std::time::Instant;

use crate::common::{init_logger, PATIENCE};

#[test]
fn wait_types() {
    init_logger();
    let eg = EventGroup::create().unwrap();

    eg.set_bits(0b100011);
    eg.clear_bits(0b100000);
    assert_eq!(
        eg.wait_bits(0b11111, EventGroupWaitFlags::CLEAR, Timeout::FOREVER),
        0b11
    );
    assert_eq!(eg.get_bits(), 0b00);

    eg.set_bits(0b11);
    eg.wait_bits(0b11111, EventGroupWaitFlags::empty(), Timeout::FOREVER);
    assert_eq!(eg.get_bits(), 0b11);

    eg.set_bits(0b11);
    eg.wait_bits(
        0b1,
        EventGroupWaitFlags::ALL | EventGroupWaitFlags::CLEAR,
        Timeout::FOREVER,
    );
    assert_eq!(eg.get_bits(), 0b10);

    eg.delete();
}

#[test]
fn set_on_empty_group() {
    init_logger();
    let eg = EventGroup::create().unwrap();
    assert_eq!(eg.get_bits(), 0);
    assert_eq!(eg.set_bits(0x1), 0x1);
    assert_eq!(eg.get_bits(), 0x1);
    assert_eq!(eg.num_waiting_tasks(), 0);
}

#[test]
fn clear_returns_previous_value() {
    init_logger();
    let eg = EventGroup::create().unwrap();
    eg.set_bits(0x1);
    assert_eq!(eg.clear_bits(0x1), 0x1);
    assert_eq!(eg.get_bits(), 0x0);
}

/// Set is a monotonic OR, and clear is a monotonic AND-NOT.
#[quickcheck]
fn set_and_clear(initial: u32, set: u32, clear: u32) {
    let usable = eventbits_port_std::USABLE_BITS;
    let (initial, set, clear) = (initial & usable, set & usable, clear & usable);

    let eg = EventGroup::create().unwrap();
    eg.set_bits(initial);

    assert_eq!(eg.set_bits(set), initial | set);
    assert_eq!(eg.get_bits(), initial | set);

    assert_eq!(eg.clear_bits(clear), initial | set);
    assert_eq!(eg.get_bits(), (initial | set) & !clear);

    eg.delete();
}

/// An immediately satisfied wait returns the value before clearing, without
/// blocking.
#[quickcheck]
fn immediate_satisfaction(initial: u32, wanted: u32, all: bool, clear: bool) -> bool {
    let usable = eventbits_port_std::USABLE_BITS;
    let (initial, wanted) = (initial & usable, (wanted & usable).max(1));

    let mut flags = EventGroupWaitFlags::empty();
    flags.set(EventGroupWaitFlags::ALL, all);
    flags.set(EventGroupWaitFlags::CLEAR, clear);

    let satisfied = if all {
        initial & wanted == wanted
    } else {
        initial & wanted != 0
    };
    if !satisfied {
        // Would block forever
        return true;
    }

    let eg = EventGroup::create().unwrap();
    eg.set_bits(initial);

    let start = Instant::now();
    let result = eg.wait_bits(wanted, flags, Timeout::FOREVER);
    let elapsed = start.elapsed();

    let expected_after = if clear { initial & !wanted } else { initial };
    let ok = result == initial && eg.get_bits() == expected_after && elapsed < PATIENCE;
    eg.delete();
    ok
}

/// A poll doesn't block, and returns the current value even if unsatisfied.
#[test]
fn poll() {
    init_logger();
    let eg = EventGroup::create().unwrap();
    eg.set_bits(0b0101);

    assert_eq!(
        eg.wait_bits(0b0011, EventGroupWaitFlags::ALL | EventGroupWaitFlags::CLEAR, Timeout::ZERO),
        0b0101
    );
    // Unsatisfied, so nothing is cleared
    assert_eq!(eg.get_bits(), 0b0101);

    assert_eq!(
        eg.wait_bits(0b0011, EventGroupWaitFlags::CLEAR, Timeout::ZERO),
        0b0101
    );
    assert_eq!(eg.get_bits(), 0b0100);
}
