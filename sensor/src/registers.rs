//! Configuration registers of the sensor.
//!
//! A register is set by writing its address byte followed by a value byte.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    Mode = 0x01,
    SingleShot = 0x02,
    EnableId = 0x03,
    /// Start learning the face in view under the given label.
    LabelId = 0x04,
    EnableSmoothing = 0x05,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Mode {
    /// Only capture when a single shot is requested.
    Standby = 0,
    #[default]
    Continuous = 1,
}

/// Register values written once before polling starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSettings {
    pub mode: Mode,
    pub enable_id: bool,
    pub smoothing: bool,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            mode: Mode::Continuous,
            enable_id: true,
            smoothing: true,
        }
    }
}

impl DeviceSettings {
    /// Register writes in the order they should be issued.
    pub fn writes(&self) -> [(Register, u8); 3] {
        [
            (Register::Mode, self.mode as u8),
            (Register::EnableId, u8::from(self.enable_id)),
            (Register::EnableSmoothing, u8::from(self.smoothing)),
        ]
    }
}
