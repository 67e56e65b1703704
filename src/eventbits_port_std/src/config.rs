//! Port configuration
use once_cell::sync::OnceCell;

/// The configuration of the port. Installed by [`init`](crate::init).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The number of ticks per second. Timeouts are measured in ticks.
    pub tick_rate_hz: u32,

    /// The capacity of the deferred-call queue. Requests made by
    /// `set_bits_from_isr` and `clear_bits_from_isr` while the queue is full
    /// fail with `QueueOverflow`.
    pub deferred_queue_len: usize,

    /// The maximum number of dynamically allocated event groups that may exist
    /// at the same time. `None` means unlimited.
    pub heap_event_groups: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_rate_hz: 1000,
            deferred_queue_len: 10,
            heap_event_groups: None,
        }
    }
}

static CONFIG: OnceCell<Config> = OnceCell::new();

/// Install `config`. Returns `Err(config)` if a configuration has already been
/// installed, either by a previous call or implicitly by using the port.
///
/// Panics if `tick_rate_hz` or `deferred_queue_len` is zero.
pub fn init(config: Config) -> Result<(), Config> {
    assert_ne!(config.tick_rate_hz, 0, "`tick_rate_hz` must be non-zero");
    assert_ne!(
        config.deferred_queue_len, 0,
        "`deferred_queue_len` must be non-zero"
    );
    log::trace!("installing {config:?}");
    CONFIG.set(config)
}

/// Get the installed configuration, installing the default one if there's
/// none.
pub(crate) fn get() -> &'static Config {
    CONFIG.get_or_init(|| {
        log::trace!("no configuration was installed; using the default one");
        Config::default()
    })
}
