//! Local mirror of the arm's joint angles.
//!
//! The mirror is the only place the client's idea of the current pose lives.
//! Local edits go through [`PoseMirror::set_joint`] / [`PoseMirror::set_full_pose`],
//! which also send the matching command; broadcasts from the controller go
//! through [`PoseMirror::apply_remote_pose`], which sends nothing.

use tracing::trace;

use crate::drivers::CommandSink;
use crate::packets::ArmCommand;
use crate::{ArmError, JointLimits, Pose, GRIPPER_JOINT};

pub const GRIP_OPEN_DEGREES: i32 = 150;
pub const GRIP_CLOSED_DEGREES: i32 = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct PoseMirror {
    pose: Pose,
    revision: u64,
}

impl PoseMirror {
    pub fn new() -> Self {
        Self::with_pose(Pose::STARTUP)
    }

    pub fn with_pose(pose: Pose) -> Self {
        Self { pose, revision: 0 }
    }

    /// Copy of the current pose.
    pub fn snapshot(&self) -> Pose {
        self.pose
    }

    /// Bumped on every change, so views can tell when to redraw.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Sets one joint, clamped to its legal range, and sends it.
    ///
    /// Returns the angle actually applied.
    pub fn set_joint(&mut self, index: usize, degrees: i32, sink: &dyn CommandSink) -> Result<i32, ArmError> {
        let limits = JointLimits::for_joint(index)?;
        let applied = limits.clamp(degrees);
        self.pose.0[index] = applied;
        self.touch();
        sink.send(ArmCommand::set_joint(index as u8, applied));
        Ok(applied)
    }

    /// Replaces all six angles in one assignment and sends the full pose.
    pub fn set_full_pose(&mut self, pose: Pose, sink: &dyn CommandSink) {
        self.pose = pose.clamped();
        self.touch();
        sink.send(ArmCommand::set_pose(self.pose));
    }

    /// Like [`set_full_pose`](Self::set_full_pose) for loosely typed input;
    /// anything but six angles is rejected and nothing changes.
    pub fn set_full_pose_from(&mut self, angles: &[i32], sink: &dyn CommandSink) -> Result<(), ArmError> {
        let pose = Pose::from_slice(angles)?;
        self.set_full_pose(pose, sink);
        Ok(())
    }

    /// Sends the mirrored pose again without changing it.
    pub fn resend(&self, sink: &dyn CommandSink) {
        sink.send(ArmCommand::set_pose(self.pose));
    }

    pub fn grip_open(&mut self, sink: &dyn CommandSink) -> Result<i32, ArmError> {
        self.set_joint(GRIPPER_JOINT, GRIP_OPEN_DEGREES, sink)
    }

    pub fn grip_close(&mut self, sink: &dyn CommandSink) -> Result<i32, ArmError> {
        self.set_joint(GRIPPER_JOINT, GRIP_CLOSED_DEGREES, sink)
    }

    /// Overwrites the mirror with the controller's pose. Sends nothing.
    pub fn apply_remote_pose(&mut self, pose: Pose) {
        trace!(%pose, "remote pose");
        self.pose = pose;
        self.touch();
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

impl Default for PoseMirror {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<ArmCommand>>);

    impl CommandSink for Recording {
        fn is_open(&self) -> bool {
            true
        }
        fn send(&self, command: ArmCommand) {
            self.0.lock().unwrap().push(command);
        }
    }

    #[test]
    fn set_joint_clamps_and_sends_applied_value() {
        let sink = Recording::default();
        let mut mirror = PoseMirror::new();
        assert_eq!(mirror.set_joint(5, 10, &sink).unwrap(), 50);
        assert_eq!(mirror.set_joint(1, 300, &sink).unwrap(), 180);
        assert_eq!(mirror.snapshot().get(5), Some(50));
        assert_eq!(
            *sink.0.lock().unwrap(),
            vec![ArmCommand::set_joint(5, 50), ArmCommand::set_joint(1, 180)]
        );
    }

    #[test]
    fn bad_index_changes_nothing() {
        let sink = Recording::default();
        let mut mirror = PoseMirror::new();
        assert_eq!(mirror.set_joint(6, 90, &sink), Err(ArmError::InvalidJoint(6)));
        assert_eq!(mirror.snapshot(), Pose::STARTUP);
        assert_eq!(mirror.revision(), 0);
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn grip_shortcuts_use_gripper_limits() {
        let sink = Recording::default();
        let mut mirror = PoseMirror::new();
        mirror.grip_open(&sink).unwrap();
        assert_eq!(mirror.snapshot().get(5), Some(150));
        mirror.grip_close(&sink).unwrap();
        assert_eq!(mirror.snapshot().get(5), Some(50));
    }
}
