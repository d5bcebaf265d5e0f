//! Log error taxonomy
//!
//! Every failure is a caller-visible result; the engine never retries
//! internally and treats nothing as fatal. Retry policy, if any, belongs
//! to the device implementation.

use palimpsest_hal::DeviceError;

use crate::geometry::GeometryError;

/// Errors from log operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LogError {
    /// Payload exceeds `page_size - 1` bytes
    PayloadTooLarge,
    /// Operation attempted while the device is powered down
    DeviceNotReady,
    /// Appending would erase unconsumed records
    LogFull,
    /// No unconsumed record at the tail
    LogEmpty,
    /// The record at the tail never reached `Written`; its payload is
    /// not durable and is never surfaced as data
    IncompleteRecord,
    /// The boot scan found no unique written/empty boundary
    ScanAmbiguous,
    /// Record value could not be encoded or decoded
    Serialization,
    /// Invalid page/block/capacity configuration
    Geometry(GeometryError),
    /// The device reported a bus or transfer failure
    Device(DeviceError),
}

impl From<GeometryError> for LogError {
    fn from(e: GeometryError) -> Self {
        LogError::Geometry(e)
    }
}

impl From<DeviceError> for LogError {
    fn from(e: DeviceError) -> Self {
        LogError::Device(e)
    }
}
