use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::packet::Frame;

/// What a single poll of the sensor produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    /// A valid frame, possibly with no faces in it.
    Faces(Frame),
    /// The cycle was skipped.
    NoData { reason: String },
    /// The sensor was asked to learn the face in view as `id`.
    CalibrationStarted { id: u8 },
    /// The countdown after a calibration request ran out.
    CalibrationFinished,
    /// Every identity label is in use; no further calibration will happen.
    CapacityExhausted,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Sensation {
    /// Timestamp of when the observation was made
    pub when: DateTime<Utc>,
    pub what: Observation,
}

impl Sensation {
    /// Create a new sensation with the current timestamp
    pub fn new(what: Observation) -> Self {
        Self {
            when: Utc::now(),
            what,
        }
    }

    pub fn no_data(reason: impl Into<String>) -> Self {
        Self::new(Observation::NoData {
            reason: reason.into(),
        })
    }
}
