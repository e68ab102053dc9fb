use std::error::Error;
use std::fmt;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ArmError {
    Serialization(String),
    /// Inbound text that is not one of the known message shapes.
    MalformedMessage(String),
    InvalidJoint(usize),
    /// A pose with the wrong number of angles (carries the length seen).
    InvalidPose(usize),
    InvalidJogDirection(i64),
    EmptyActionName,
    EmptyDraft,
    SaveInProgress,
    FrameOutOfRange { index: usize, len: usize },
    InvalidConfig(String),
    FailedToConnect(String),
    Disconnected,
}

impl Error for ArmError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl fmt::Display for ArmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ArmError::Serialization(ref msg) => write!(f, "Serialization error: {}", msg),
            ArmError::MalformedMessage(ref msg) => write!(f, "Malformed message: {}", msg),
            ArmError::InvalidJoint(index) => write!(f, "Joint index {} is out of range (0-5)", index),
            ArmError::InvalidPose(len) => write!(f, "A pose needs 6 angles, got {}", len),
            ArmError::InvalidJogDirection(dir) => write!(f, "Jog direction must be -1 or 1, got {}", dir),
            ArmError::EmptyActionName => write!(f, "Please enter an action name"),
            ArmError::EmptyDraft => write!(f, "No frames recorded yet"),
            ArmError::SaveInProgress => write!(f, "A save is still being sent"),
            ArmError::FrameOutOfRange { index, len } => {
                write!(f, "Frame #{} does not exist ({} frames recorded)", index, len)
            }
            ArmError::InvalidConfig(ref msg) => write!(f, "Invalid configuration: {}", msg),
            ArmError::FailedToConnect(ref msg) => write!(f, "ConnectError: {}", msg),
            ArmError::Disconnected => write!(f, "Arm appears to be disconnected"),
        }
    }
}

impl From<serde_json::Error> for ArmError {
    fn from(e: serde_json::Error) -> Self {
        ArmError::Serialization(e.to_string())
    }
}
