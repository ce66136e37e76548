use core::fmt;

use crate::{Error, Result};

/// A 64-bit Sonyflake-style ID.
///
/// - 1 bit reserved (always zero)
/// - 39 bits timestamp (10 ms ticks since [`SONYFLAKE_EPOCH`])
/// - 8 bits sequence
/// - 16 bits machine ID
///
/// ```text
///  Bit Index:  63           63 62             24 23            16 15              0
///              +--------------+-----------------+---------------+-----------------+
///  Field:      | reserved (1) | timestamp (39)  | sequence (8)  | machine ID (16) |
///              +--------------+-----------------+---------------+-----------------+
///              |<------------ MSB ----------- 64 bits ------------ LSB ---------->|
/// ```
///
/// Because the timestamp occupies the most significant bits and the sequence
/// sits above the machine ID, IDs from one generator compare in the order they
/// were issued.
///
/// [`SONYFLAKE_EPOCH`]: crate::SONYFLAKE_EPOCH
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SonyflakeId {
    id: u64,
}

impl SonyflakeId {
    /// Bitmask for the 39-bit timestamp field. Occupies bits 24 through 62.
    pub const TIMESTAMP_MASK: u64 = (1 << 39) - 1;

    /// Bitmask for the 8-bit sequence field. Occupies bits 16 through 23.
    pub const SEQUENCE_MASK: u64 = (1 << 8) - 1;

    /// Bitmask for the 16-bit machine ID field. Occupies bits 0 through 15.
    pub const MACHINE_ID_MASK: u64 = (1 << 16) - 1;

    /// Number of bits to shift the timestamp to its position (bit 24).
    pub const TIMESTAMP_SHIFT: u64 = 24;

    /// Number of bits to shift the sequence to its position (bit 16).
    pub const SEQUENCE_SHIFT: u64 = 16;

    /// Number of bits to shift the machine ID (bit 0).
    pub const MACHINE_ID_SHIFT: u64 = 0;

    /// Packs the three components, truncating each to its field width.
    pub const fn from(timestamp: u64, sequence: u64, machine_id: u64) -> Self {
        let timestamp = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let sequence = (sequence & Self::SEQUENCE_MASK) << Self::SEQUENCE_SHIFT;
        let machine_id = (machine_id & Self::MACHINE_ID_MASK) << Self::MACHINE_ID_SHIFT;
        Self {
            id: timestamp | sequence | machine_id,
        }
    }

    /// Packs the three components, rejecting values that do not fit.
    ///
    /// # Errors
    ///
    /// - [`Error::TimestampOverflow`] if `timestamp` exceeds
    ///   [`Self::max_timestamp`].
    /// - [`Error::MachineIdOutOfRange`] if `machine_id` exceeds
    ///   [`Self::max_machine_id`].
    pub fn try_from_components(timestamp: u64, sequence: u64, machine_id: u64) -> Result<Self> {
        if timestamp > Self::max_timestamp() {
            return Err(Error::TimestampOverflow {
                ticks: timestamp,
                max: Self::max_timestamp(),
            });
        }
        if machine_id > Self::max_machine_id() {
            return Err(Error::MachineIdOutOfRange(machine_id));
        }
        debug_assert!(sequence <= Self::max_sequence(), "sequence overflow");
        Ok(Self::from(timestamp, sequence, machine_id))
    }

    /// Extracts the timestamp (ticks since the epoch).
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    /// Extracts the sequence number.
    pub const fn sequence(&self) -> u64 {
        (self.id >> Self::SEQUENCE_SHIFT) & Self::SEQUENCE_MASK
    }

    /// Extracts the machine ID.
    pub const fn machine_id(&self) -> u64 {
        (self.id >> Self::MACHINE_ID_SHIFT) & Self::MACHINE_ID_MASK
    }

    pub const fn max_timestamp() -> u64 {
        Self::TIMESTAMP_MASK
    }

    pub const fn max_sequence() -> u64 {
        Self::SEQUENCE_MASK
    }

    pub const fn max_machine_id() -> u64 {
        Self::MACHINE_ID_MASK
    }

    /// Returns true if the sequence can be incremented within this tick.
    pub const fn has_sequence_room(&self) -> bool {
        self.sequence() < Self::max_sequence()
    }

    /// Returns a new ID with the sequence incremented.
    pub const fn increment_sequence(&self) -> Self {
        Self::from(self.timestamp(), self.sequence() + 1, self.machine_id())
    }

    /// Returns a new ID for a newer timestamp with the sequence reset to zero.
    pub const fn rollover_to_timestamp(&self, timestamp: u64) -> Self {
        Self::from(timestamp, 0, self.machine_id())
    }

    /// Converts this ID into its raw `u64` representation.
    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// Wraps a raw `u64`. The reserved bit is cleared.
    pub const fn from_raw(raw: u64) -> Self {
        Self {
            id: raw & !(1 << 63),
        }
    }
}

impl From<SonyflakeId> for u64 {
    fn from(id: SonyflakeId) -> Self {
        id.to_raw()
    }
}

/// Renders the decimal form used as the storage key.
impl fmt::Display for SonyflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for SonyflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SonyflakeId")
            .field("id", &self.id)
            .field("timestamp", &self.timestamp())
            .field("sequence", &self.sequence())
            .field("machine_id", &self.machine_id())
            .finish()
    }
}
