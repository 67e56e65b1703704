//! Miscellaneous properties of event groups.
use eventbits_port_std::{
    suspend_all, EventGroup, EventGroupWaitFlags, ResultCode, Timeout, CONTROL_BITS,
    USABLE_BITS,
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::sleep,
    time::Duration,
};

use crate::common::{init_logger, spawn_task, wait_for_waiters};

#[test]
fn all_usable_bits() {
    init_logger();
    let eg = EventGroup::create().unwrap();
    assert_eq!(USABLE_BITS & CONTROL_BITS, 0);
    assert_eq!(eg.set_bits(USABLE_BITS), USABLE_BITS);
    assert_eq!(
        eg.wait_bits(
            USABLE_BITS,
            EventGroupWaitFlags::ALL | EventGroupWaitFlags::CLEAR,
            Timeout::ZERO
        ),
        USABLE_BITS
    );
    assert_eq!(eg.get_bits(), 0);
}

#[cfg(feature = "trace_facility")]
#[test]
fn number() {
    init_logger();
    let eg = EventGroup::create().unwrap();
    assert_eq!(eg.number(), 0);
    eg.set_number(42);
    assert_eq!(eg.clone().number(), 42);
}

#[test]
fn handles_compare_by_identity() {
    init_logger();
    let eg1 = EventGroup::create().unwrap();
    let eg2 = EventGroup::create().unwrap();
    assert_eq!(eg1, eg1.clone());
    assert_ne!(eg1, eg2);

    let text = format!("{eg1:?}");
    assert!(text.starts_with("EventGroup"), "{text}");
}

#[test]
fn result_codes() {
    assert!(ResultCode::from(eventbits_port_std::PendDeferredCallError::QueueOverflow).is_err());
    assert_eq!(ResultCode::Success.as_str(), "Success");
}

/// Suspending the scheduler keeps other tasks from touching event groups.
#[test]
fn suspend_all_excludes_other_tasks() {
    init_logger();
    let eg = EventGroup::create().unwrap();
    let set = Arc::new(AtomicBool::new(false));

    let guard = suspend_all();
    let guard2 = suspend_all(); // nests

    let task = {
        let (eg, set) = (eg.clone(), Arc::clone(&set));
        spawn_task("task", move || {
            eg.set_bits(0b1);
            set.store(true, Ordering::Release);
        })
    };

    sleep(Duration::from_millis(50));
    assert!(!set.load(Ordering::Acquire));

    // The suspending task itself may still use the event group
    assert_eq!(eg.get_bits(), 0);

    drop(guard2);
    sleep(Duration::from_millis(50));
    assert!(!set.load(Ordering::Acquire));

    drop(guard);
    task.join().unwrap();
    assert!(set.load(Ordering::Acquire));
    assert_eq!(eg.get_bits(), 0b1);
}

/// A task released while the scheduler is suspended starts running when the
/// scheduler resumes.
#[test]
fn release_while_suspended() {
    init_logger();
    let eg = EventGroup::create().unwrap();
    let done = Arc::new(AtomicBool::new(false));

    let task = {
        let (eg, done) = (eg.clone(), Arc::clone(&done));
        spawn_task("task", move || {
            let result = eg.wait_bits(0b1, EventGroupWaitFlags::CLEAR, Timeout::FOREVER);
            done.store(true, Ordering::Release);
            result
        })
    };
    wait_for_waiters(&eg, 1);

    {
        let _guard = suspend_all();
        assert_eq!(eg.set_bits(0b1), 0);
        assert_eq!(eg.num_waiting_tasks(), 0);
        sleep(Duration::from_millis(50));
        assert!(!done.load(Ordering::Acquire));
    }

    assert_eq!(task.join().unwrap(), 0b1);
}
