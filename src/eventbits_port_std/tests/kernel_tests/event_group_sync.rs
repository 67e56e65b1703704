//! Rendezvous with `EventGroup::sync`.
use eventbits_port_std::{EventGroup, EventGroupWaitFlags, Timeout};
use std::sync::Barrier;
use std::sync::Arc;

use crate::common::{init_logger, spawn_task, wait_for_waiters};

const BIT_A: u32 = 1 << 0;
const BIT_B: u32 = 1 << 1;
const BIT_C: u32 = 1 << 2;

#[test]
fn two_tasks() {
    init_logger();
    let eg = EventGroup::create().unwrap();
    let barrier = Arc::new(Barrier::new(2));

    let tasks: Vec<_> = [BIT_A, BIT_B]
        .into_iter()
        .map(|bit| {
            let (eg, barrier) = (eg.clone(), Arc::clone(&barrier));
            spawn_task("sync", move || {
                barrier.wait();
                eg.sync(bit, BIT_A | BIT_B, Timeout::FOREVER)
            })
        })
        .collect();

    for task in tasks {
        let result = task.join().unwrap();
        assert_eq!(result & (BIT_A | BIT_B), BIT_A | BIT_B);
    }

    assert_eq!(eg.get_bits() & (BIT_A | BIT_B), 0);
}

#[test]
fn three_tasks_last_arrival_completes() {
    init_logger();
    let eg = EventGroup::create().unwrap();
    let all = BIT_A | BIT_B | BIT_C;

    let task_a = {
        let eg = eg.clone();
        spawn_task("task_a", move || eg.sync(BIT_A, all, Timeout::FOREVER))
    };
    wait_for_waiters(&eg, 1);

    let task_b = {
        let eg = eg.clone();
        spawn_task("task_b", move || eg.sync(BIT_B, all, Timeout::FOREVER))
    };
    wait_for_waiters(&eg, 2);
    assert_eq!(eg.get_bits(), BIT_A | BIT_B);

    // The last arrival doesn't block
    assert_eq!(eg.sync(BIT_C, all, Timeout::FOREVER), all);

    assert_eq!(task_a.join().unwrap(), all);
    assert_eq!(task_b.join().unwrap(), all);
    assert_eq!(eg.get_bits(), 0);
}

/// Setting the rendezvous bits may release ordinary waiters too.
#[test]
fn sync_releases_plain_waiter() {
    init_logger();
    let eg = EventGroup::create().unwrap();

    let observer = {
        let eg = eg.clone();
        spawn_task("observer", move || {
            eg.wait_bits(BIT_A, EventGroupWaitFlags::empty(), Timeout::FOREVER)
        })
    };
    wait_for_waiters(&eg, 1);

    // Completes immediately; only bit A was needed
    assert_eq!(eg.sync(BIT_A, BIT_A, Timeout::FOREVER), BIT_A);
    assert_eq!(observer.join().unwrap(), BIT_A);
    assert_eq!(eg.get_bits(), 0);
}

#[test]
fn sync_poll() {
    init_logger();
    let eg = EventGroup::create().unwrap();
    eg.set_bits(BIT_C);

    // Not satisfied; returns the current value with our bit set
    assert_eq!(eg.sync(BIT_A, BIT_A | BIT_B, Timeout::ZERO), BIT_A | BIT_C);

    // Satisfied; the rendezvous bits are consumed
    assert_eq!(
        eg.sync(BIT_B, BIT_A | BIT_B, Timeout::ZERO),
        BIT_A | BIT_B | BIT_C
    );
    assert_eq!(eg.get_bits(), BIT_C);
}
