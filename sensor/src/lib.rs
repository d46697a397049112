//! Host-side driver for the Useful Sensors person sensor.
//!
//! The sensor sits on an I2C bus and reports up to four faces per frame in a
//! fixed 40 byte packet. [`packet`] decodes that packet, [`calibration`]
//! decides when to teach the sensor a new identity and [`PersonSensor`] ties
//! both to a [`Bus`] and streams the results as [`Sensation`]s.

pub mod bus;
pub mod calibration;
pub mod config;
pub mod error;
#[cfg(feature = "linux")]
pub mod linux;
pub mod packet;
pub mod poller;
pub mod registers;
pub mod sensation;
pub mod sensor;

pub use bus::{Bus, BusError, ScriptedBus};
pub use calibration::{CalibrateCommand, CalibrationPolicy, CalibrationState, Calibrator, Phase};
pub use config::Config;
pub use error::SensorError;
pub use packet::{decode, decode_with, DecodeError, FaceRecord, Frame, GeometryLayout};
pub use poller::PersonSensor;
pub use registers::{DeviceSettings, Mode, Register};
pub use sensation::{Observation, Sensation};
pub use sensor::Sensor;
