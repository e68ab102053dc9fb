use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ArmError;

/// Logical jog axes understood by the controller.
///
/// `Reach` and `Lift` are virtual: the controller couples the shoulder and
/// elbow servos to move the tool forward/back or up/down. No inverse
/// kinematics happens on this side.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JogAxis {
    Yaw,
    Reach,
    Lift,
    Pitch,
    Roll,
    Grip,
}

impl JogAxis {
    pub const ALL: [JogAxis; 6] = [
        JogAxis::Yaw,
        JogAxis::Reach,
        JogAxis::Lift,
        JogAxis::Pitch,
        JogAxis::Roll,
        JogAxis::Grip,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            JogAxis::Yaw => "yaw",
            JogAxis::Reach => "reach",
            JogAxis::Lift => "lift",
            JogAxis::Pitch => "pitch",
            JogAxis::Roll => "roll",
            JogAxis::Grip => "grip",
        }
    }

    /// Human label for a direction on this axis, as printed on the controls.
    pub fn direction_label(&self, direction: JogDirection) -> &'static str {
        match (self, direction) {
            (JogAxis::Yaw, JogDirection::Negative) => "Yaw -",
            (JogAxis::Yaw, JogDirection::Positive) => "Yaw +",
            (JogAxis::Reach, JogDirection::Negative) => "Back",
            (JogAxis::Reach, JogDirection::Positive) => "Forward",
            (JogAxis::Lift, JogDirection::Negative) => "Down",
            (JogAxis::Lift, JogDirection::Positive) => "Up",
            (JogAxis::Pitch, JogDirection::Negative) => "Pitch down",
            (JogAxis::Pitch, JogDirection::Positive) => "Pitch up",
            (JogAxis::Roll, JogDirection::Negative) => "Roll -",
            (JogAxis::Roll, JogDirection::Positive) => "Roll +",
            (JogAxis::Grip, JogDirection::Negative) => "Grip close",
            (JogAxis::Grip, JogDirection::Positive) => "Grip open",
        }
    }
}

impl fmt::Display for JogAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sign of a jog step. Travels on the wire as `-1` / `1`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(into = "i8", try_from = "i64")]
pub enum JogDirection {
    Negative,
    Positive,
}

impl JogDirection {
    pub fn sign(&self) -> i32 {
        match self {
            JogDirection::Negative => -1,
            JogDirection::Positive => 1,
        }
    }
}

impl From<JogDirection> for i8 {
    fn from(direction: JogDirection) -> i8 {
        direction.sign() as i8
    }
}

impl TryFrom<i64> for JogDirection {
    type Error = ArmError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(JogDirection::Negative),
            1 => Ok(JogDirection::Positive),
            other => Err(ArmError::InvalidJogDirection(other)),
        }
    }
}
