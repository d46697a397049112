use person_sensor::calibration::{step, CalibrationPolicy, CalibrationState, Calibrator, Phase};
use person_sensor::packet::{BoundingBox, FaceRecord, Frame};

fn stranger() -> FaceRecord {
    FaceRecord {
        box_confidence: 200,
        bounds: BoundingBox {
            left: 100,
            top: 80,
            width: 60,
            height: 70,
        },
        id_confidence: 0,
        id: 0,
        is_facing: true,
    }
}

fn frame_of(faces: &[FaceRecord]) -> Frame {
    Frame::new(faces).unwrap()
}

fn qualifying() -> Frame {
    frame_of(&[stranger()])
}

#[test]
fn starts_idle_with_first_identity() {
    let c = Calibrator::default();
    assert_eq!(c.phase(), Phase::Idle);
    assert_eq!(
        *c.state(),
        CalibrationState {
            next_unused_id: 1,
            unrecognized_run_length: 0,
            calibration_frames_remaining: 0
        }
    );
}

#[test]
fn five_qualifying_frames_request_identity_one() {
    let mut c = Calibrator::default();
    for _ in 0..4 {
        assert!(c.observe(&qualifying()).is_none());
        assert_eq!(c.phase(), Phase::Accumulating);
    }
    let cmd = c.observe(&qualifying()).expect("calibration");
    assert_eq!(cmd.id, 1);
    assert_eq!(cmd.as_bytes(), [0x04, 1]);
    assert_eq!(c.state().next_unused_id, 2);
    assert_eq!(c.state().calibration_frames_remaining, 20);
    assert_eq!(c.state().unrecognized_run_length, 0);
    assert_eq!(c.phase(), Phase::Calibrating);
}

#[test]
fn interruption_resets_the_run() {
    let mut c = Calibrator::default();
    let mut frames: Vec<Frame> = (0..4).map(|_| qualifying()).collect();
    frames.push(Frame::empty());
    frames.extend((0..5).map(|_| qualifying()));
    let fired: Vec<usize> = frames
        .iter()
        .enumerate()
        .filter_map(|(i, f)| c.observe(f).map(|_| i + 1))
        .collect();
    assert_eq!(fired, vec![10]);
}

#[test]
fn countdown_suspends_triggering() {
    let mut c = Calibrator::default();
    for _ in 0..5 {
        c.observe(&qualifying());
    }
    for i in 0..20 {
        assert!(c.observe(&qualifying()).is_none(), "frame {i} of countdown");
    }
    assert_eq!(c.phase(), Phase::Idle);
    for _ in 0..4 {
        assert!(c.observe(&qualifying()).is_none());
    }
    assert_eq!(c.observe(&qualifying()).map(|c| c.id), Some(2));
}

#[test]
fn countdown_leaves_run_counter_alone() {
    let state = CalibrationState {
        next_unused_id: 3,
        unrecognized_run_length: 0,
        calibration_frames_remaining: 2,
    };
    let policy = CalibrationPolicy::default();
    let (next, cmd) = step(state, &Frame::empty(), &policy);
    assert!(cmd.is_none());
    assert_eq!(next.calibration_frames_remaining, 1);
    assert_eq!(next.next_unused_id, 3);
}

#[test]
fn step_is_pure() {
    let policy = CalibrationPolicy::default();
    let state = CalibrationState {
        next_unused_id: 2,
        unrecognized_run_length: 4,
        calibration_frames_remaining: 0,
    };
    let a = step(state, &qualifying(), &policy);
    let b = step(state, &qualifying(), &policy);
    assert_eq!(a, b);
    assert_eq!(state.unrecognized_run_length, 4);
}

#[test]
fn non_qualifying_faces_reset() {
    let policy = CalibrationPolicy::default();
    let primed = CalibrationState {
        next_unused_id: 1,
        unrecognized_run_length: 3,
        calibration_frames_remaining: 0,
    };
    let low = FaceRecord {
        box_confidence: 94,
        ..stranger()
    };
    let known = FaceRecord {
        id_confidence: 40,
        id: 1,
        ..stranger()
    };
    let turned = FaceRecord {
        is_facing: false,
        ..stranger()
    };
    let cases = [
        frame_of(&[low]),
        frame_of(&[known]),
        frame_of(&[turned]),
        frame_of(&[stranger(), stranger()]),
        Frame::empty(),
    ];
    for frame in &cases {
        let (next, cmd) = step(primed, frame, &policy);
        assert!(cmd.is_none());
        assert_eq!(next.unrecognized_run_length, 0, "{frame:?}");
    }
}

#[test]
fn threshold_is_inclusive() {
    let policy = CalibrationPolicy::default();
    let edge = FaceRecord {
        box_confidence: 95,
        ..stranger()
    };
    let (next, _) = step(CalibrationState::default(), &frame_of(&[edge]), &policy);
    assert_eq!(next.unrecognized_run_length, 1);
}

#[test]
fn identities_stop_at_capacity() {
    let policy = CalibrationPolicy {
        max_ids: 3,
        countdown_frames: 0,
        ..CalibrationPolicy::default()
    };
    let mut c = Calibrator::new(policy);
    let mut ids = Vec::new();
    for _ in 0..100 {
        if let Some(cmd) = c.observe(&qualifying()) {
            ids.push(cmd.id);
        }
        assert!(c.state().next_unused_id <= policy.max_ids);
    }
    assert_eq!(ids, vec![1, 2]);
    assert!(c.capacity_exhausted());
    assert_eq!(c.phase(), Phase::Idle);
}

#[test]
fn custom_policy_is_honoured() {
    let policy = CalibrationPolicy {
        confidence_threshold: 250,
        run_threshold: 2,
        countdown_frames: 1,
        max_ids: 7,
        register: 0x10,
    };
    let mut c = Calibrator::new(policy);
    assert!(c.observe(&qualifying()).is_none());
    assert_eq!(c.phase(), Phase::Idle);

    let sharp = frame_of(&[FaceRecord {
        box_confidence: 255,
        ..stranger()
    }]);
    assert!(c.observe(&sharp).is_none());
    let cmd = c.observe(&sharp).unwrap();
    assert_eq!(cmd.as_bytes(), [0x10, 1]);
}

#[test]
fn resumes_a_captured_run() {
    let policy = CalibrationPolicy::default();
    let captured = CalibrationState {
        next_unused_id: 4,
        unrecognized_run_length: 4,
        calibration_frames_remaining: 0,
    };
    let mut c = Calibrator::with_state(policy, captured);
    assert_eq!(c.phase(), Phase::Accumulating);
    let cmd = c.observe(&qualifying()).expect("fifth frame triggers");
    assert_eq!(cmd.id, 4);
    assert_eq!(c.state().next_unused_id, 5);
}
