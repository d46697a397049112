//! Assigns identity labels to faces the sensor does not yet know.
//!
//! A face that stays alone, confidently detected, unrecognized and facing
//! the camera for [`CalibrationPolicy::run_threshold`] consecutive frames is
//! handed to the sensor for learning under the next free identity. While the
//! sensor learns, no further triggers are evaluated.

use serde::{Deserialize, Serialize};

use crate::packet::Frame;
use crate::registers::Register;

/// Tunables for the calibration trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationPolicy {
    /// Minimum `box_confidence`, on the raw 0 to 255 scale.
    pub confidence_threshold: u8,
    /// Consecutive qualifying frames needed before calibrating.
    pub run_threshold: u32,
    /// Frames to leave the sensor alone after a calibration command.
    pub countdown_frames: u32,
    /// Identity capacity of the sensor. Labels `1..max_ids` are assignable.
    pub max_ids: u8,
    /// Register the calibration command is written to.
    pub register: u8,
}

impl Default for CalibrationPolicy {
    fn default() -> Self {
        Self {
            confidence_threshold: 95,
            run_threshold: 5,
            countdown_frames: 20,
            max_ids: 7,
            register: Register::LabelId as u8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Accumulating,
    Calibrating,
}

/// Everything the controller remembers between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationState {
    pub next_unused_id: u8,
    pub unrecognized_run_length: u32,
    pub calibration_frames_remaining: u32,
}

impl Default for CalibrationState {
    fn default() -> Self {
        Self {
            next_unused_id: 1,
            unrecognized_run_length: 0,
            calibration_frames_remaining: 0,
        }
    }
}

impl CalibrationState {
    pub fn phase(&self) -> Phase {
        if self.calibration_frames_remaining > 0 {
            Phase::Calibrating
        } else if self.unrecognized_run_length > 0 {
            Phase::Accumulating
        } else {
            Phase::Idle
        }
    }

    /// True once every assignable identity has been handed out.
    pub fn capacity_exhausted(&self, policy: &CalibrationPolicy) -> bool {
        self.next_unused_id >= policy.max_ids
    }
}

/// Request for the sensor to learn the face in view as `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrateCommand {
    pub register: u8,
    pub id: u8,
}

impl CalibrateCommand {
    /// Register byte followed by the value byte, as written to the bus.
    pub fn as_bytes(&self) -> [u8; 2] {
        [self.register, self.id]
    }
}

fn qualifies(frame: &Frame, state: &CalibrationState, policy: &CalibrationPolicy) -> bool {
    match frame.faces() {
        [face] => {
            face.box_confidence >= policy.confidence_threshold
                && !face.is_recognized()
                && face.is_facing
                && !state.capacity_exhausted(policy)
        }
        _ => false,
    }
}

/// Advance the controller by one decoded frame.
///
/// Frames that failed to decode must not be passed here at all.
pub fn step(
    state: CalibrationState,
    frame: &Frame,
    policy: &CalibrationPolicy,
) -> (CalibrationState, Option<CalibrateCommand>) {
    let mut next = state;
    if next.calibration_frames_remaining > 0 {
        next.calibration_frames_remaining -= 1;
        return (next, None);
    }
    if !qualifies(frame, &next, policy) {
        next.unrecognized_run_length = 0;
        return (next, None);
    }
    next.unrecognized_run_length += 1;
    if next.unrecognized_run_length < policy.run_threshold {
        return (next, None);
    }
    let command = CalibrateCommand {
        register: policy.register,
        id: next.next_unused_id,
    };
    next.calibration_frames_remaining = policy.countdown_frames;
    next.next_unused_id += 1;
    next.unrecognized_run_length = 0;
    (next, Some(command))
}

/// Caller-owned controller holding its policy and state.
#[derive(Debug, Clone, Default)]
pub struct Calibrator {
    policy: CalibrationPolicy,
    state: CalibrationState,
}

impl Calibrator {
    pub fn new(policy: CalibrationPolicy) -> Self {
        Self {
            policy,
            state: CalibrationState::default(),
        }
    }

    /// Resume from a previously captured state.
    pub fn with_state(policy: CalibrationPolicy, state: CalibrationState) -> Self {
        Self { policy, state }
    }

    pub fn observe(&mut self, frame: &Frame) -> Option<CalibrateCommand> {
        let (state, command) = step(self.state, frame, &self.policy);
        self.state = state;
        command
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    pub fn policy(&self) -> &CalibrationPolicy {
        &self.policy
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn capacity_exhausted(&self) -> bool {
        self.state.capacity_exhausted(&self.policy)
    }
}
