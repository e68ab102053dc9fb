use serde::{Deserialize, Serialize};
use std::fmt;

pub mod drivers;

pub mod packets;
pub mod errors;
pub use errors::*;

pub mod pose;
pub mod jog;
pub mod recorder;
pub mod actions;
pub mod library;
pub mod client;

pub use actions::{ActionTransfer, TransferTiming};
pub use client::{ArmClient, ClientEvent, UiEvent};
pub use jog::{JogController, JogSession, JogSettings, JogStopCause};
pub use library::{LibraryEntry, LibraryMirror};
pub use pose::PoseMirror;
pub use recorder::{parse_hold, DraftAction, FrameRow, Recorder};

/// Number of servos on the arm, S1 (base) through S6 (gripper).
pub const JOINT_COUNT: usize = 6;

/// Index of the gripper servo, which has a narrower safe range.
pub const GRIPPER_JOINT: usize = 5;

pub const JOINT_NAMES: [&str; JOINT_COUNT] = [
    "S1 Base",
    "S2 Pitch1",
    "S3 Pitch2",
    "S4 Pitch3",
    "S5 Roll",
    "S6 Gripper",
];

/// Legal angle range for one servo, in degrees.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointLimits {
    pub min: i32,
    pub max: i32,
}

impl JointLimits {
    pub const ARM: JointLimits = JointLimits { min: 0, max: 180 };
    pub const GRIPPER: JointLimits = JointLimits { min: 50, max: 150 };

    /// Limits for the servo at `index`, or `InvalidJoint` past S6.
    pub fn for_joint(index: usize) -> Result<JointLimits, ArmError> {
        match index {
            GRIPPER_JOINT => Ok(Self::GRIPPER),
            i if i < JOINT_COUNT => Ok(Self::ARM),
            i => Err(ArmError::InvalidJoint(i)),
        }
    }

    pub fn clamp(&self, degrees: i32) -> i32 {
        degrees.clamp(self.min, self.max)
    }
}

/// The six joint angles of the arm, in degrees.
///
/// Serializes as a bare JSON array (`[88,0,180,180,90,90]`), which is the
/// shape the controller uses for the `p` field of every pose-carrying message.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Pose(pub [i32; JOINT_COUNT]);

impl Pose {
    /// Pose assumed before the controller reports its own.
    pub const STARTUP: Pose = Pose([88, 0, 180, 180, 90, 90]);

    /// Fallback for loaded frames that carry no pose.
    pub const NEUTRAL: Pose = Pose([90; JOINT_COUNT]);

    pub fn get(&self, index: usize) -> Option<i32> {
        self.0.get(index).copied()
    }

    /// Builds a pose from exactly six angles; any other length is rejected.
    pub fn from_slice(values: &[i32]) -> Result<Pose, ArmError> {
        let angles: [i32; JOINT_COUNT] = values
            .try_into()
            .map_err(|_| ArmError::InvalidPose(values.len()))?;
        Ok(Pose(angles))
    }

    /// Builds a pose from JSON numbers, truncating fractions.
    ///
    /// Returns `None` unless there are exactly six finite values.
    pub fn from_wire(values: &[f64]) -> Option<Pose> {
        if values.len() != JOINT_COUNT || values.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let mut angles = [0; JOINT_COUNT];
        for (slot, value) in angles.iter_mut().zip(values) {
            *slot = value.trunc() as i32;
        }
        Some(Pose(angles))
    }

    /// Copy of this pose with every joint forced into its legal range.
    pub fn clamped(&self) -> Pose {
        let mut angles = self.0;
        for (index, angle) in angles.iter_mut().enumerate() {
            let limits = if index == GRIPPER_JOINT { JointLimits::GRIPPER } else { JointLimits::ARM };
            *angle = limits.clamp(*angle);
        }
        Pose(angles)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::STARTUP
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{}", joined)
    }
}

/// One stop in a recorded motion: where to go and how long to dwell there.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keyframe {
    #[serde(rename = "p")]
    pub pose: Pose,
    /// Dwell before the next keyframe starts, in milliseconds.
    pub hold: u32,
}

impl Keyframe {
    pub fn new(pose: Pose, hold: u32) -> Self {
        Self { pose, hold }
    }
}
