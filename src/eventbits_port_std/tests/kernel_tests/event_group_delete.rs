//! Deletes event groups with and without waiters.
use eventbits_port_std::{timeout_ms, EventGroup, EventGroupWaitFlags, Timeout};
use std::time::Instant;

use crate::common::{init_logger, spawn_task, wait_for_waiters, PATIENCE};

#[test]
fn delete_releases_all_waiters() {
    init_logger();
    const NUM_TASKS: usize = 4;
    let eg = EventGroup::create().unwrap();

    let tasks: Vec<_> = (0..NUM_TASKS)
        .map(|i| {
            let eg = eg.clone();
            spawn_task(&format!("task{i}"), move || {
                let start = Instant::now();
                let result = if i % 2 == 0 {
                    eg.wait_bits(0b1, EventGroupWaitFlags::ALL, timeout_ms(60_000))
                } else {
                    eg.sync(0, 0b1, Timeout::FOREVER)
                };
                (result, start.elapsed())
            })
        })
        .collect();
    wait_for_waiters(&eg, NUM_TASKS);

    eg.delete();

    for task in tasks {
        let (result, elapsed) = task.join().unwrap();
        assert_eq!(result, 0);
        assert!(elapsed < PATIENCE, "{elapsed:?}");
    }
}

#[test]
fn delete_without_waiters() {
    init_logger();
    let eg = EventGroup::create().unwrap();
    eg.set_bits(0b1);
    eg.delete();
}

#[test]
#[should_panic(expected = "event group used after deletion")]
fn use_after_delete() {
    init_logger();
    let eg = EventGroup::create().unwrap();
    let eg2 = eg.clone();
    eg.delete();
    eg2.get_bits();
}

#[test]
#[should_panic(expected = "event group used after deletion")]
fn delete_twice() {
    init_logger();
    let eg = EventGroup::create().unwrap();
    let eg2 = eg.clone();
    eg.delete();
    eg2.delete();
}
