use serde::{Deserialize, Serialize};

use super::{JogAxis, JogDirection};
use crate::{ArmError, Keyframe, Pose};

/// Every message the client can send to the controller.
///
/// The `cmd` field selects the verb. Commands are fire-and-forget: the
/// controller never acknowledges them, state changes come back as
/// broadcasts (see [`ArmResponse`](super::ArmResponse)).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "cmd")]
pub enum ArmCommand {
    /// Ask for the current pose.
    #[serde(rename = "get")]
    GetPose,

    #[serde(rename = "home")]
    Home,

    #[serde(rename = "ready")]
    Ready,

    /// Stop whatever action is playing.
    #[serde(rename = "act_stop")]
    ActStop,

    #[serde(rename = "j")]
    SetJoint {
        #[serde(rename = "i")]
        index: u8,
        #[serde(rename = "deg")]
        degrees: i32,
    },

    #[serde(rename = "p")]
    SetPose {
        #[serde(rename = "p")]
        pose: Pose,
    },

    /// One relative step on a logical axis.
    #[serde(rename = "jog")]
    Jog {
        #[serde(rename = "a")]
        axis: JogAxis,
        #[serde(rename = "dir")]
        direction: JogDirection,
        step: u32,
    },

    #[serde(rename = "act_save_begin")]
    ActSaveBegin { name: String, count: usize },

    #[serde(rename = "act_save_frame")]
    ActSaveFrame {
        name: String,
        idx: usize,
        #[serde(rename = "p")]
        pose: Pose,
        hold: u32,
    },

    #[serde(rename = "act_save_end")]
    ActSaveEnd { name: String },

    #[serde(rename = "act_list")]
    ActList,

    #[serde(rename = "act_run")]
    ActRun { name: String },

    #[serde(rename = "act_load")]
    ActLoad { name: String },

    #[serde(rename = "act_delete")]
    ActDelete { name: String },
}

impl ArmCommand {
    pub fn set_joint(index: u8, degrees: i32) -> Self {
        ArmCommand::SetJoint { index, degrees }
    }

    pub fn set_pose(pose: Pose) -> Self {
        ArmCommand::SetPose { pose }
    }

    pub fn jog(axis: JogAxis, direction: JogDirection, step: u32) -> Self {
        ArmCommand::Jog { axis, direction, step }
    }

    pub fn save_begin(name: &str, count: usize) -> Self {
        ArmCommand::ActSaveBegin { name: name.to_string(), count }
    }

    pub fn save_frame(name: &str, idx: usize, frame: &Keyframe) -> Self {
        ArmCommand::ActSaveFrame {
            name: name.to_string(),
            idx,
            pose: frame.pose,
            hold: frame.hold,
        }
    }

    pub fn save_end(name: &str) -> Self {
        ArmCommand::ActSaveEnd { name: name.to_string() }
    }

    /// The `cmd` string this command travels under.
    pub fn verb(&self) -> &'static str {
        match self {
            ArmCommand::GetPose => "get",
            ArmCommand::Home => "home",
            ArmCommand::Ready => "ready",
            ArmCommand::ActStop => "act_stop",
            ArmCommand::SetJoint { .. } => "j",
            ArmCommand::SetPose { .. } => "p",
            ArmCommand::Jog { .. } => "jog",
            ArmCommand::ActSaveBegin { .. } => "act_save_begin",
            ArmCommand::ActSaveFrame { .. } => "act_save_frame",
            ArmCommand::ActSaveEnd { .. } => "act_save_end",
            ArmCommand::ActList => "act_list",
            ArmCommand::ActRun { .. } => "act_run",
            ArmCommand::ActLoad { .. } => "act_load",
            ArmCommand::ActDelete { .. } => "act_delete",
        }
    }

    pub fn to_json(&self) -> Result<String, ArmError> {
        serde_json::to_string(self).map_err(|e| ArmError::Serialization(e.to_string()))
    }

    /// Parses one inbound command frame (controller side).
    pub fn parse(text: &str) -> Result<Self, ArmError> {
        serde_json::from_str(text).map_err(|e| ArmError::MalformedMessage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn value(command: &ArmCommand) -> serde_json::Value {
        serde_json::from_str(&command.to_json().unwrap()).unwrap()
    }

    #[test]
    fn lifecycle_commands_carry_only_cmd() {
        assert_eq!(value(&ArmCommand::GetPose), json!({"cmd": "get"}));
        assert_eq!(value(&ArmCommand::Home), json!({"cmd": "home"}));
        assert_eq!(value(&ArmCommand::Ready), json!({"cmd": "ready"}));
        assert_eq!(value(&ArmCommand::ActStop), json!({"cmd": "act_stop"}));
        assert_eq!(value(&ArmCommand::ActList), json!({"cmd": "act_list"}));
    }

    #[test]
    fn jog_uses_short_field_names() {
        let cmd = ArmCommand::jog(JogAxis::Yaw, JogDirection::Negative, 2);
        assert_eq!(value(&cmd), json!({"cmd": "jog", "a": "yaw", "dir": -1, "step": 2}));
    }

    #[test]
    fn joint_and_pose_shapes() {
        assert_eq!(
            value(&ArmCommand::set_joint(5, 150)),
            json!({"cmd": "j", "i": 5, "deg": 150})
        );
        assert_eq!(
            value(&ArmCommand::set_pose(Pose([1, 2, 3, 4, 5, 6]))),
            json!({"cmd": "p", "p": [1, 2, 3, 4, 5, 6]})
        );
    }

    #[test]
    fn parse_reads_what_to_json_writes() {
        let cmd = ArmCommand::jog(JogAxis::Lift, JogDirection::Positive, 4);
        assert_eq!(ArmCommand::parse(&cmd.to_json().unwrap()).unwrap(), cmd);
        assert!(ArmCommand::parse(r#"{"cmd":"jog","a":"yaw","dir":0,"step":1}"#).is_err());
        assert!(ArmCommand::parse(r#"{"cmd":"dance"}"#).is_err());
    }
}
