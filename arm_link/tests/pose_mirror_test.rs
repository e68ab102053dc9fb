mod common;

use arm_link::packets::ArmCommand;
use arm_link::{ArmError, Pose, PoseMirror};
use common::RecordingSink;

#[test]
fn test_set_joint_clamps_every_arm_joint_to_0_180() {
    let sink = RecordingSink::open();
    let mut mirror = PoseMirror::new();

    for index in 0..5 {
        for requested in [-500, -1, 0, 1, 90, 179, 180, 181, 1000] {
            let applied = mirror.set_joint(index, requested, &*sink).unwrap();
            assert_eq!(applied, requested.clamp(0, 180), "joint {} asked for {}", index, requested);
            assert_eq!(mirror.snapshot().get(index), Some(applied));
        }
    }
}

#[test]
fn test_set_joint_clamps_gripper_to_50_150() {
    let sink = RecordingSink::open();
    let mut mirror = PoseMirror::new();

    for requested in [-10, 0, 49, 50, 51, 100, 149, 150, 151, 180] {
        let applied = mirror.set_joint(5, requested, &*sink).unwrap();
        assert_eq!(applied, requested.clamp(50, 150));
    }
    // Every send carries the clamped value, never the raw one.
    for command in sink.sent() {
        match command {
            ArmCommand::SetJoint { index: 5, degrees } => assert!((50..=150).contains(&degrees)),
            other => panic!("unexpected command {:?}", other),
        }
    }
}

#[test]
fn test_set_joint_rejects_index_past_gripper() {
    let sink = RecordingSink::open();
    let mut mirror = PoseMirror::new();
    assert_eq!(mirror.set_joint(6, 90, &*sink), Err(ArmError::InvalidJoint(6)));
    assert_eq!(sink.count(), 0);
}

#[test]
fn test_set_full_pose_replaces_all_six() {
    let sink = RecordingSink::open();
    let mut mirror = PoseMirror::new();

    mirror.set_full_pose(Pose([10, 20, 30, 40, 50, 60]), &*sink);
    assert_eq!(mirror.snapshot(), Pose([10, 20, 30, 40, 50, 60]));
    assert_eq!(sink.sent(), vec![ArmCommand::set_pose(Pose([10, 20, 30, 40, 50, 60]))]);
}

#[test]
fn test_set_full_pose_rejects_partial_input() {
    let sink = RecordingSink::open();
    let mut mirror = PoseMirror::new();

    assert_eq!(mirror.set_full_pose_from(&[1, 2, 3, 4, 5], &*sink), Err(ArmError::InvalidPose(5)));
    assert_eq!(mirror.set_full_pose_from(&[1, 2, 3, 4, 5, 6, 7], &*sink), Err(ArmError::InvalidPose(7)));
    assert_eq!(mirror.snapshot(), Pose::STARTUP);
    assert_eq!(sink.count(), 0);

    mirror.set_full_pose_from(&[1, 2, 3, 4, 5, 60], &*sink).unwrap();
    assert_eq!(mirror.snapshot(), Pose([1, 2, 3, 4, 5, 60]));
}

#[test]
fn test_remote_pose_sends_nothing() {
    let sink = RecordingSink::open();
    let mut mirror = PoseMirror::new();
    let before = mirror.revision();

    mirror.apply_remote_pose(Pose([10, 20, 30, 40, 50, 60]));

    assert_eq!(mirror.snapshot(), Pose([10, 20, 30, 40, 50, 60]));
    assert!(mirror.revision() > before);
    assert_eq!(sink.count(), 0);
}

#[test]
fn test_local_edits_while_disconnected_still_update_mirror() {
    let sink = RecordingSink::closed();
    let mut mirror = PoseMirror::new();
    mirror.set_joint(0, 45, &*sink).unwrap();
    assert_eq!(mirror.snapshot().get(0), Some(45));
    assert_eq!(sink.count(), 0);
}
