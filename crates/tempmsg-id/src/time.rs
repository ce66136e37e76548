use core::time::Duration;
use std::{
    sync::Arc,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use crate::{Error, Result};

/// Sonyflake epoch: Monday, September 1, 2014 00:00:00 UTC
pub const SONYFLAKE_EPOCH: Duration = Duration::from_secs(1_409_529_600);

/// The time quantum counted by the timestamp field.
pub const TICK: Duration = Duration::from_millis(10);

/// A trait for time sources that return the number of [`TICK`]s elapsed since
/// a configured epoch.
///
/// This abstraction allows you to plug in a monotonic timer, the wall clock,
/// or a mocked time source in tests.
///
/// # Example
///
/// ```
/// use tempmsg_id::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_ticks(&self) -> u64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTime.current_ticks(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in ticks since the configured epoch.
    fn current_ticks(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_ticks(&self) -> u64 {
        (**self).current_ticks()
    }
}

/// Converts a duration to whole ticks, saturating at `u64::MAX`.
pub fn duration_to_ticks(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos() / TICK.as_nanos()).unwrap_or(u64::MAX)
}

/// Converts a tick count to the duration it spans.
pub fn ticks_to_duration(ticks: u64) -> Duration {
    TICK.saturating_mul(u32::try_from(ticks).unwrap_or(u32::MAX))
}

/// A monotonic time source aligned to a user-defined epoch.
///
/// The clock captures `Instant::now()` at construction together with the
/// wall-clock distance to the epoch. Every reading adds the monotonic elapsed
/// time to that fixed offset, so timestamps never go backward even if the
/// system clock is adjusted externally (e.g. by NTP).
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    start: Instant,
    epoch_offset: Duration,
}

impl MonotonicClock {
    /// Constructs a monotonic clock using `epoch` (a [`Duration`] since
    /// 1970-01-01 UTC) as tick zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockBeforeEpoch`] if the current system time is
    /// earlier than `epoch`.
    ///
    /// # Example
    ///
    /// ```
    /// use tempmsg_id::{MonotonicClock, TimeSource, SONYFLAKE_EPOCH};
    ///
    /// let clock = MonotonicClock::with_epoch(SONYFLAKE_EPOCH).unwrap();
    /// let a = clock.current_ticks();
    /// std::thread::sleep(std::time::Duration::from_millis(20));
    /// assert!(clock.current_ticks() > a);
    /// ```
    pub fn with_epoch(epoch: Duration) -> Result<Self> {
        let start = Instant::now();
        let system_now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::ClockBeforeEpoch(e.duration() + epoch))?;
        let epoch_offset = system_now
            .checked_sub(epoch)
            .ok_or_else(|| Error::ClockBeforeEpoch(epoch - system_now))?;

        Ok(Self {
            start,
            epoch_offset,
        })
    }
}

impl TimeSource for MonotonicClock {
    fn current_ticks(&self) -> u64 {
        duration_to_ticks(self.epoch_offset + self.start.elapsed())
    }
}

/// A wall-clock time source that reads `SystemTime` on every call.
///
/// Unlike [`MonotonicClock`] this clock follows external adjustments and can
/// therefore move backward. Generators built on it rely on their regression
/// tolerance to decide whether to wait or fail. Readings before the epoch are
/// reported as tick zero.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    epoch: Duration,
}

impl SystemClock {
    pub const fn with_epoch(epoch: Duration) -> Self {
        Self { epoch }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::with_epoch(SONYFLAKE_EPOCH)
    }
}

impl TimeSource for SystemClock {
    fn current_ticks(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|now| now.checked_sub(self.epoch))
            .map_or(0, duration_to_ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_conversions() {
        assert_eq!(duration_to_ticks(Duration::from_millis(9)), 0);
        assert_eq!(duration_to_ticks(Duration::from_millis(10)), 1);
        assert_eq!(duration_to_ticks(Duration::from_secs(1)), 100);
        assert_eq!(ticks_to_duration(3), Duration::from_millis(30));
    }

    #[test]
    fn monotonic_clock_rejects_future_epoch() {
        let future = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            + Duration::from_secs(3600);
        assert!(matches!(
            MonotonicClock::with_epoch(future),
            Err(Error::ClockBeforeEpoch(_))
        ));
    }

    #[test]
    fn monotonic_clock_tracks_wall_clock_at_start() {
        let clock = MonotonicClock::with_epoch(SONYFLAKE_EPOCH).unwrap();
        let system = SystemClock::default();
        let diff = system.current_ticks().abs_diff(clock.current_ticks());
        assert!(diff <= 1, "clocks diverged by {diff} ticks");
    }

    #[test]
    fn monotonic_clock_never_goes_backward() {
        let clock = MonotonicClock::with_epoch(SONYFLAKE_EPOCH).unwrap();
        let mut last = clock.current_ticks();
        for _ in 0..10_000 {
            let now = clock.current_ticks();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn system_clock_before_epoch_reads_zero() {
        let far_future = Duration::from_secs(u64::from(u32::MAX) * 16);
        assert_eq!(SystemClock::with_epoch(far_future).current_ticks(), 0);
    }
}
