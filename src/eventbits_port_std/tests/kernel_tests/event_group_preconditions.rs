//! Precondition violations are reported by panicking.
use eventbits_port_std::{suspend_all, EventGroup, EventGroupWaitFlags, Timeout};

use crate::common::init_logger;

#[test]
#[should_panic(expected = "reserved control bits")]
fn set_control_bits() {
    init_logger();
    let eg = EventGroup::create().unwrap();
    eg.set_bits(0x0100_0000);
}

#[test]
#[should_panic(expected = "reserved control bits")]
fn clear_control_bits() {
    init_logger();
    let eg = EventGroup::create().unwrap();
    eg.clear_bits(0x8000_0001);
}

#[test]
#[should_panic(expected = "reserved control bits")]
fn wait_control_bits() {
    init_logger();
    let eg = EventGroup::create().unwrap();
    eg.wait_bits(0x0200_0000, EventGroupWaitFlags::empty(), Timeout::ZERO);
}

#[test]
#[should_panic(expected = "reserved control bits")]
fn set_bits_from_isr_control_bits() {
    init_logger();
    let eg = EventGroup::create().unwrap();
    let _ = eg.set_bits_from_isr(0x0400_0000);
}

#[test]
#[should_panic(expected = "empty set of bits")]
fn wait_zero_bits() {
    init_logger();
    let eg = EventGroup::create().unwrap();
    eg.wait_bits(0, EventGroupWaitFlags::ALL, Timeout::ZERO);
}

#[test]
#[should_panic(expected = "empty set of bits")]
fn sync_zero_bits() {
    init_logger();
    let eg = EventGroup::create().unwrap();
    eg.sync(0b1, 0, Timeout::ZERO);
}

#[test]
#[should_panic(expected = "while the scheduler is suspended")]
fn block_while_suspended() {
    init_logger();
    let eg = EventGroup::create().unwrap();
    let _guard = suspend_all();
    eg.wait_bits(0b1, EventGroupWaitFlags::empty(), Timeout::from_ticks(10));
}

#[test]
#[should_panic(expected = "while the scheduler is suspended")]
fn sync_while_suspended() {
    init_logger();
    let eg = EventGroup::create().unwrap();
    let _guard = suspend_all();
    eg.sync(0b1, 0b11, Timeout::FOREVER);
}

/// Polling is fine while the scheduler is suspended.
#[test]
fn poll_while_suspended() {
    init_logger();
    let eg = EventGroup::create().unwrap();
    let _guard = suspend_all();
    eg.set_bits(0b10);
    assert_eq!(
        eg.wait_bits(0b1, EventGroupWaitFlags::empty(), Timeout::ZERO),
        0b10
    );
    assert_eq!(eg.sync(0b1, 0b11, Timeout::ZERO), 0b11);
    assert_eq!(eg.get_bits(), 0);
}
