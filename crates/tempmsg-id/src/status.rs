use crate::SonyflakeId;

/// Represents the result of attempting to generate a new ID.
///
/// - [`IdGenStatus::Ready`] indicates a new ID was generated.
/// - [`IdGenStatus::Pending`] means the generator cannot produce an ID until
///   the clock advances by `yield_for` ticks, either because the sequence for
///   the current tick is exhausted or because the clock is catching up after
///   moving backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdGenStatus {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated ID.
        id: SonyflakeId,
    },
    /// No ID could be generated right now.
    Pending {
        /// Number of ticks to wait before polling again.
        yield_for: u64,
    },
}
