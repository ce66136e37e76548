use core::time::Duration;

/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `tempmsg-id` can emit.
///
/// None of these are retried internally. A generator that reports one of them
/// leaves its state untouched, so the caller may decide whether to try again.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The tick count since the epoch no longer fits in the timestamp field.
    #[error("timestamp {ticks} exceeds the maximum of {max} ticks")]
    TimestampOverflow { ticks: u64, max: u64 },

    /// The clock moved backward by more than the generator tolerates.
    ///
    /// Both values are expressed in ticks.
    #[error("clock moved backward by {behind} ticks (tolerance {tolerance})")]
    ClockRegression { behind: u64, tolerance: u64 },

    /// The wall clock reads earlier than the configured epoch.
    #[error("system clock is {0:?} before the configured epoch")]
    ClockBeforeEpoch(Duration),

    /// A machine ID does not fit in the 16-bit machine field.
    #[error("machine id {0} is out of range")]
    MachineIdOutOfRange(u64),

    /// No private IPv4 address could be found to derive a machine ID from.
    #[error("no private IPv4 address available")]
    NoPrivateAddress,
}
