use thiserror::Error;

use crate::bus::BusError;
use crate::packet::DecodeError;

/// Reasons a poll cycle produced no frame.
///
/// None of these are fatal: the caller skips the cycle and tries again.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("bus unavailable: {0}")]
    BusUnavailable(#[from] BusError),
    #[error("corrupt packet: {0}")]
    Decode(#[from] DecodeError),
}
