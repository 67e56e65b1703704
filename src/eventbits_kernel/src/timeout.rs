//! Tick-based timeouts
use core::{fmt, time::Duration};

use crate::PortTimer;

/// Unsigned integer type representing a tick count.
pub type UTicks = u32;

/// The maximum duration a blocking operation may wait for, measured in ticks.
///
/// [`Timeout::ZERO`] turns a blocking operation into a poll.
/// [`Timeout::FOREVER`] disables the timeout.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timeout(UTicks);

impl Timeout {
    /// Don't block at all.
    pub const ZERO: Self = Self(0);

    /// Block until the condition is met, however long it takes.
    pub const FOREVER: Self = Self(UTicks::MAX);

    /// Construct a `Timeout` from a tick count. `UTicks::MAX` means
    /// [`Self::FOREVER`].
    #[inline]
    pub const fn from_ticks(ticks: UTicks) -> Self {
        Self(ticks)
    }

    /// Convert milliseconds to ticks, rounding down. The result never becomes
    /// [`Self::FOREVER`] by saturation.
    pub fn from_millis<Traits: PortTimer>(ms: u32) -> Self {
        let ticks = u64::from(ms) * u64::from(Traits::tick_rate_hz()) / 1000;
        Self(ticks.min(u64::from(UTicks::MAX - 1)) as UTicks)
    }

    /// Get the tick count. Returns `UTicks::MAX` for [`Self::FOREVER`].
    #[inline]
    pub const fn ticks(self) -> UTicks {
        self.0
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_forever(self) -> bool {
        self.0 == UTicks::MAX
    }

    /// Convert `self` to a wall-clock duration. Returns `None` for
    /// [`Self::FOREVER`].
    pub fn to_duration<Traits: PortTimer>(self) -> Option<Duration> {
        if self.is_forever() {
            return None;
        }
        let hz = u64::from(Traits::tick_rate_hz().max(1));
        let nanos = u64::from(self.0) * 1_000_000_000 / hz;
        Some(Duration::from_nanos(nanos))
    }
}

impl fmt::Debug for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_forever() {
            f.write_str("Timeout::FOREVER")
        } else {
            write!(f, "Timeout({} ticks)", self.0)
        }
    }
}

/// Get the number of ticks elapsed since the port was initialized.
#[inline]
pub fn tick_count<Traits: PortTimer>() -> UTicks {
    Traits::tick_count()
}
