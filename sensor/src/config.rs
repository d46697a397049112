use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::calibration::CalibrationPolicy;
use crate::packet::{GeometryLayout, I2C_ADDRESS};
use crate::registers::DeviceSettings;

/// The sensor's output changes at roughly 5 FPS.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Settings for a [`crate::PersonSensor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub address: u8,
    pub poll_interval: Duration,
    pub layout: GeometryLayout,
    /// Run the calibration controller on every frame.
    pub recognition: bool,
    pub device: DeviceSettings,
    pub policy: CalibrationPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: I2C_ADDRESS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            layout: GeometryLayout::default(),
            recognition: true,
            device: DeviceSettings::default(),
            policy: CalibrationPolicy::default(),
        }
    }
}
