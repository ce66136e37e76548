use core::cmp::Ordering;

use parking_lot::Mutex;
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{Error, IdGenStatus, Result, SonyflakeId, TimeSource, ticks_to_duration};

/// A lock-based Sonyflake ID generator suitable for multi-threaded
/// environments.
///
/// The last issued ID doubles as the generator state: its timestamp is the
/// last tick seen and its sequence the last sequence handed out. That state is
/// guarded by a [`Mutex`], so one instance can be shared (e.g. behind an
/// `Arc`) by any number of callers while IDs stay unique and strictly
/// increasing.
///
/// ## Clock policy
///
/// - Sequence exhausted within a tick: [`IdGenStatus::Pending`] for one tick.
/// - Clock behind the last tick by at most `tolerance` ticks:
///   [`IdGenStatus::Pending`] until it catches up.
/// - Clock behind by more than `tolerance`: [`Error::ClockRegression`].
/// - Tick count past the 39-bit field: [`Error::TimestampOverflow`].
///
/// The tolerance defaults to [`DEFAULT_REGRESSION_TOLERANCE`].
pub struct SonyflakeGenerator<T>
where
    T: TimeSource,
{
    state: Mutex<SonyflakeId>,
    time: T,
    tolerance: u64,
}

/// Default number of ticks the clock may lag before generation fails.
pub const DEFAULT_REGRESSION_TOLERANCE: u64 = 0;

impl<T> SonyflakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a new [`SonyflakeGenerator`] for the given machine ID.
    ///
    /// The initial timestamp and sequence are zero; the first call that
    /// observes a later tick resets the sequence.
    ///
    /// # Example
    /// ```
    /// use tempmsg_id::{IdGenStatus, MonotonicClock, SonyflakeGenerator, SONYFLAKE_EPOCH};
    ///
    /// let generator = SonyflakeGenerator::new(1, MonotonicClock::with_epoch(SONYFLAKE_EPOCH).unwrap());
    ///
    /// let id = loop {
    ///     match generator.try_poll_id().unwrap() {
    ///         IdGenStatus::Ready { id } => break id,
    ///         IdGenStatus::Pending { .. } => std::thread::yield_now(),
    ///     }
    /// };
    /// assert_eq!(id.machine_id(), 1);
    /// ```
    pub fn new(machine_id: u16, time: T) -> Self {
        Self::from_components(0, 0, machine_id, time)
    }

    /// Creates a generator from explicit component values.
    ///
    /// Useful for restoring a generator after a restart or for driving the
    /// generator into specific states in tests. Prefer [`Self::new`]
    /// otherwise.
    pub fn from_components(timestamp: u64, sequence: u64, machine_id: u16, time: T) -> Self {
        Self {
            state: Mutex::new(SonyflakeId::from(
                timestamp,
                sequence,
                u64::from(machine_id),
            )),
            time,
            tolerance: DEFAULT_REGRESSION_TOLERANCE,
        }
    }

    /// Sets how many ticks the clock may move backward before generation
    /// fails instead of waiting.
    #[must_use]
    pub fn with_regression_tolerance(mut self, ticks: u64) -> Self {
        self.tolerance = ticks;
        self
    }

    /// The machine ID encoded into every ID from this generator.
    pub fn machine_id(&self) -> u16 {
        // Masked to 16 bits at construction.
        self.state.lock().machine_id() as u16
    }

    /// Attempts to generate the next ID without waiting.
    ///
    /// # Returns
    /// - `Ok(IdGenStatus::Ready { id })`: a new ID
    /// - `Ok(IdGenStatus::Pending { yield_for })`: ticks to wait before
    ///   polling again
    ///
    /// # Errors
    /// - [`Error::TimestampOverflow`] if the clock is past the timestamp field
    /// - [`Error::ClockRegression`] if the clock is behind by more than the
    ///   tolerance
    ///
    /// The generator state is unchanged whenever this returns `Pending` or an
    /// error.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<IdGenStatus> {
        let mut id = self.state.lock();

        // Sampled under the lock so a caller preempted between reading the
        // clock and acquiring the lock cannot observe a stale tick.
        let now = self.time.current_ticks();
        if now > SonyflakeId::max_timestamp() {
            return Err(Error::TimestampOverflow {
                ticks: now,
                max: SonyflakeId::max_timestamp(),
            });
        }

        let current_ts = id.timestamp();
        match now.cmp(&current_ts) {
            Ordering::Equal => {
                if id.has_sequence_room() {
                    *id = id.increment_sequence();
                    Ok(IdGenStatus::Ready { id: *id })
                } else {
                    Ok(IdGenStatus::Pending { yield_for: 1 })
                }
            }
            Ordering::Greater => {
                *id = id.rollover_to_timestamp(now);
                Ok(IdGenStatus::Ready { id: *id })
            }
            Ordering::Less => self.cold_clock_behind(now, current_ts),
        }
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(&self, now: u64, current_ts: u64) -> Result<IdGenStatus> {
        let behind = current_ts - now;
        if behind > self.tolerance {
            #[cfg(feature = "tracing")]
            tracing::warn!(behind, tolerance = self.tolerance, "clock moved backward");
            return Err(Error::ClockRegression {
                behind,
                tolerance: self.tolerance,
            });
        }
        Ok(IdGenStatus::Pending { yield_for: behind })
    }

    /// Generates the next ID, sleeping the current thread while the generator
    /// is pending.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Self::try_poll_id`].
    pub fn next_id(&self) -> Result<SonyflakeId> {
        loop {
            match self.try_poll_id()? {
                IdGenStatus::Ready { id } => return Ok(id),
                IdGenStatus::Pending { yield_for } => {
                    std::thread::sleep(ticks_to_duration(yield_for));
                }
            }
        }
    }
}
