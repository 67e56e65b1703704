//! Utilities shared by the test binaries
#![allow(dead_code)]
use eventbits_port_std::EventGroup;
use std::{
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// How long a test waits for something that is supposed to happen promptly.
pub const PATIENCE: Duration = Duration::from_secs(10);

pub fn init_logger() {
    let _ = eventbits_port_std::env_logger::try_init();
}

/// Spawn a thread. It becomes a task when it first uses an event group.
pub fn spawn_task<R: Send + 'static>(
    name: &str,
    f: impl FnOnce() -> R + Send + 'static,
) -> JoinHandle<R> {
    thread::Builder::new()
        .name(name.to_owned())
        .spawn(f)
        .unwrap()
}

/// Poll `cond` until it returns `true`. Panics after [`PATIENCE`].
#[track_caller]
pub fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let start = Instant::now();
    while !cond() {
        assert!(start.elapsed() < PATIENCE, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

/// Wait until exactly `count` tasks are blocked on `group`.
#[track_caller]
pub fn wait_for_waiters(group: &EventGroup, count: usize) {
    wait_until(&format!("{count} waiter(s)"), || {
        group.num_waiting_tasks() == count
    });
}
