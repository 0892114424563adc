//! Unified error type for waterbot.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` for efficient on-target logging.

use core::fmt;

/// Top-level error type used across the control core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Shared state
    /// The Context lock was not acquired within `LOCK_TIMEOUT_MS`.
    /// Callers treat this as "try again on the next input or tick".
    LockTimeout,

    // Peripherals
    /// The soil sensor could not be sampled.
    Sensor,

    /// The servo rejected a position command.
    Actuator,

    /// The actuator task did not report idle in time.
    ActuationTimeout,

    // Storage
    /// Key/value persistence failed.
    Storage(StorageError),

    // UI / Display
    /// I²C transaction to the display failed.
    Display,

    // Startup
    /// Startup configuration is unusable.
    Config(ConfigError),

    // Generic
    /// Buffer too small for the requested operation.
    BufferOverflow,
}

/// Failure modes of the settings store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// No value stored under this key.
    NotFound,
    /// The stored value does not fit the caller's buffer.
    BufferTooSmall,
    /// The store has no room for another key.
    Full,
    /// Flash read/write/erase failed.
    Flash,
    /// Stored bytes could not be decoded.
    Corrupt,
}

/// Reasons a `ControllerConfig` is rejected at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Check interval of zero minutes.
    ZeroCheckInterval,
    /// Desired reading outside the sensor's reading range.
    DesiredOutOfRange,
    /// Sensor binding with an empty reading range.
    EmptyReadingRange,
    /// Watering policy allows zero sprays per check.
    ZeroSprayCap,
    /// Debounce window of zero milliseconds.
    ZeroDebounceWindow,
    /// Menu built without any lines.
    EmptyMenu,
}

// Convenience conversions

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::Storage(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::LockTimeout => f.write_str("context busy"),
            Error::Sensor => f.write_str("sensor read failed"),
            Error::Actuator => f.write_str("servo command failed"),
            Error::ActuationTimeout => f.write_str("sprayer did not finish"),
            Error::Storage(e) => write!(f, "storage: {:?}", e),
            Error::Display => f.write_str("display write failed"),
            Error::Config(e) => write!(f, "bad config: {:?}", e),
            Error::BufferOverflow => f.write_str("buffer overflow"),
        }
    }
}
