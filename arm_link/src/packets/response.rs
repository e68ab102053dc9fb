use serde::{Deserialize, Serialize};

use crate::{ArmError, Keyframe, Pose};

pub const IDLE_PLAY_STATE: &str = "IDLE";

/// Messages pushed by the controller. The `type` field selects the verb.
///
/// Only [`ArmResponse::parse`] turns text into a response: the wire form is
/// looser than this type (missing fields, fractional angles) and is
/// normalised on the way in.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ArmResponse {
    /// The controller's current pose; authoritative.
    #[serde(rename = "pose")]
    Pose {
        #[serde(rename = "p")]
        pose: Pose,
    },

    /// Names in the controller's action library.
    #[serde(rename = "act_list")]
    ActList { list: Vec<String> },

    /// Advisory text, shown to the user and otherwise ignored.
    #[serde(rename = "status")]
    Status { msg: String },

    /// Coarse playback state label, e.g. `IDLE` or `RUNNING`.
    #[serde(rename = "play")]
    Play { state: String },

    /// Full frame set of a loaded action.
    #[serde(rename = "act")]
    Action { name: String, frames: Vec<Keyframe> },
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
enum WireResponse {
    #[serde(rename = "pose")]
    Pose { p: Vec<f64> },

    #[serde(rename = "act_list")]
    ActList {
        #[serde(default)]
        list: Option<Vec<String>>,
    },

    #[serde(rename = "status")]
    Status {
        #[serde(default)]
        msg: Option<String>,
    },

    #[serde(rename = "play")]
    Play {
        #[serde(default)]
        state: Option<String>,
    },

    #[serde(rename = "act")]
    Action {
        #[serde(default)]
        name: Option<String>,
        frames: Vec<WireFrame>,
    },
}

#[derive(Deserialize, Debug)]
struct WireFrame {
    #[serde(default)]
    p: Option<Vec<f64>>,
    #[serde(default)]
    hold: Option<f64>,
}

impl WireFrame {
    fn into_keyframe(self) -> Result<Keyframe, ArmError> {
        let pose = match self.p {
            None => Pose::NEUTRAL,
            Some(values) => Pose::from_wire(&values).ok_or(ArmError::InvalidPose(values.len()))?,
        };
        // Negative, fractional or NaN holds saturate into 0..=u32::MAX.
        let hold = self.hold.unwrap_or(0.0).trunc() as u32;
        Ok(Keyframe { pose, hold })
    }
}

impl TryFrom<WireResponse> for ArmResponse {
    type Error = ArmError;

    fn try_from(wire: WireResponse) -> Result<Self, Self::Error> {
        Ok(match wire {
            WireResponse::Pose { p } => ArmResponse::Pose {
                pose: Pose::from_wire(&p).ok_or(ArmError::InvalidPose(p.len()))?,
            },
            WireResponse::ActList { list } => ArmResponse::ActList { list: list.unwrap_or_default() },
            WireResponse::Status { msg } => ArmResponse::Status { msg: msg.unwrap_or_default() },
            WireResponse::Play { state } => ArmResponse::Play {
                state: state
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| IDLE_PLAY_STATE.to_string()),
            },
            WireResponse::Action { name, frames } => ArmResponse::Action {
                name: name.unwrap_or_default(),
                frames: frames
                    .into_iter()
                    .map(WireFrame::into_keyframe)
                    .collect::<Result<Vec<_>, _>>()?,
            },
        })
    }
}

impl ArmResponse {
    /// Parses one inbound text frame.
    ///
    /// Anything that is not valid JSON, has an unknown `type`, or has the
    /// wrong shape (e.g. a pose that is not six numbers) is `MalformedMessage`.
    pub fn parse(text: &str) -> Result<Self, ArmError> {
        let wire: WireResponse =
            serde_json::from_str(text).map_err(|e| ArmError::MalformedMessage(e.to_string()))?;
        ArmResponse::try_from(wire).map_err(|e| ArmError::MalformedMessage(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, ArmError> {
        serde_json::to_string(self).map_err(|e| ArmError::Serialization(e.to_string()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ArmResponse::Pose { .. } => "pose",
            ArmResponse::ActList { .. } => "act_list",
            ArmResponse::Status { .. } => "status",
            ArmResponse::Play { .. } => "play",
            ArmResponse::Action { .. } => "act",
        }
    }
}
