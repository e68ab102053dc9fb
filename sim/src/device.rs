use std::collections::BTreeMap;

use arm_link::packets::{ArmCommand, ArmResponse, JogAxis, IDLE_PLAY_STATE};
use arm_link::{JointLimits, Keyframe, Pose, GRIPPER_JOINT};

pub const RUNNING_PLAY_STATE: &str = "RUNNING";

/// Largest action the simulated flash will accept.
pub const MAX_FRAMES: usize = 64;

/// Largest jog step honoured; a full joint range.
pub const MAX_JOG_STEP: u32 = 180;

pub const HOME_POSE: Pose = Pose::STARTUP;
pub const READY_POSE: Pose = Pose([90, 60, 120, 90, 90, 100]);

/// What the server should do after a command was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Answer only the client that sent the command.
    Reply(ArmResponse),
    /// Push to every connected client.
    Broadcast(ArmResponse),
    StartPlayback { name: String, frames: Vec<Keyframe> },
    StopPlayback,
}

#[derive(Debug, Clone, PartialEq)]
struct PendingSave {
    name: String,
    slots: Vec<Option<Keyframe>>,
}

/// Everything the controller keeps: current pose, stored actions and
/// the play state label.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceState {
    pose: Pose,
    library: BTreeMap<String, Vec<Keyframe>>,
    pending: Option<PendingSave>,
    play_state: String,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            pose: HOME_POSE,
            library: BTreeMap::new(),
            pending: None,
            play_state: IDLE_PLAY_STATE.to_string(),
        }
    }
}

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn play_state(&self) -> &str {
        &self.play_state
    }

    pub fn action(&self, name: &str) -> Option<&[Keyframe]> {
        self.library.get(name).map(Vec::as_slice)
    }

    pub fn action_names(&self) -> Vec<String> {
        self.library.keys().cloned().collect()
    }

    pub fn set_play_state(&mut self, state: &str) -> ArmResponse {
        self.play_state = state.to_string();
        ArmResponse::Play { state: self.play_state.clone() }
    }

    /// Moves to `pose` (clamped) and returns the broadcast announcing it.
    pub fn move_to(&mut self, pose: Pose) -> ArmResponse {
        self.pose = pose.clamped();
        ArmResponse::Pose { pose: self.pose }
    }

    pub fn apply(&mut self, command: ArmCommand) -> Vec<Effect> {
        match command {
            ArmCommand::GetPose => vec![Effect::Reply(ArmResponse::Pose { pose: self.pose })],
            ArmCommand::Home => vec![Effect::Broadcast(self.move_to(HOME_POSE))],
            ArmCommand::Ready => vec![Effect::Broadcast(self.move_to(READY_POSE))],
            ArmCommand::ActStop => vec![Effect::StopPlayback],
            ArmCommand::SetJoint { index, degrees } => {
                let index = index as usize;
                match JointLimits::for_joint(index) {
                    Ok(limits) => {
                        let mut pose = self.pose;
                        pose.0[index] = limits.clamp(degrees);
                        vec![Effect::Broadcast(self.move_to(pose))]
                    }
                    Err(e) => vec![status(e.to_string())],
                }
            }
            ArmCommand::SetPose { pose } => vec![Effect::Broadcast(self.move_to(pose))],
            ArmCommand::Jog { axis, direction, step } => {
                let delta = direction.sign().saturating_mul(step.min(MAX_JOG_STEP) as i32);
                vec![Effect::Broadcast(self.move_to(jogged(self.pose, axis, delta)))]
            }
            ArmCommand::ActSaveBegin { name, count } => self.save_begin(name, count),
            ArmCommand::ActSaveFrame { name, idx, pose, hold } => self.save_frame(&name, idx, Keyframe::new(pose, hold)),
            ArmCommand::ActSaveEnd { name } => self.save_end(&name),
            ArmCommand::ActList => vec![Effect::Reply(ArmResponse::ActList { list: self.action_names() })],
            ArmCommand::ActRun { name } => match self.library.get(&name) {
                Some(frames) => vec![Effect::StartPlayback {
                    name,
                    frames: frames.clone(),
                }],
                None => vec![status(format!("no action {}", name))],
            },
            ArmCommand::ActLoad { name } => match self.library.get(&name) {
                Some(frames) => vec![Effect::Reply(ArmResponse::Action {
                    frames: frames.clone(),
                    name,
                })],
                None => vec![status(format!("no action {}", name))],
            },
            ArmCommand::ActDelete { name } => match self.library.remove(&name) {
                Some(_) => vec![status(format!("deleted {}", name))],
                None => vec![status(format!("no action {}", name))],
            },
        }
    }

    fn save_begin(&mut self, name: String, count: usize) -> Vec<Effect> {
        let name = name.trim().to_string();
        if name.is_empty() || count == 0 || count > MAX_FRAMES {
            self.pending = None;
            return vec![status(format!("save rejected: {} frames for '{}'", count, name))];
        }
        self.pending = Some(PendingSave {
            name,
            slots: vec![None; count],
        });
        Vec::new()
    }

    fn save_frame(&mut self, name: &str, idx: usize, frame: Keyframe) -> Vec<Effect> {
        match self.pending.as_mut() {
            Some(pending) if pending.name == name && idx < pending.slots.len() => {
                pending.slots[idx] = Some(Keyframe::new(frame.pose.clamped(), frame.hold));
                Vec::new()
            }
            _ => vec![status(format!("unexpected frame {} for '{}'", idx, name))],
        }
    }

    fn save_end(&mut self, name: &str) -> Vec<Effect> {
        let Some(pending) = self.pending.take() else {
            return vec![status(format!("no save in progress for '{}'", name))];
        };
        if pending.name != name {
            return vec![status(format!("save of '{}' interrupted", pending.name))];
        }
        let expected = pending.slots.len();
        let frames: Option<Vec<Keyframe>> = pending.slots.into_iter().collect();
        match frames {
            Some(frames) => {
                self.library.insert(pending.name, frames);
                vec![status(format!("saved {} ({} frames)", name, expected))]
            }
            None => vec![status(format!("save of '{}' incomplete, discarded", name))],
        }
    }
}

fn status(msg: String) -> Effect {
    Effect::Reply(ArmResponse::Status { msg })
}

/// Applies one jog step. Reach and lift drive the shoulder and elbow
/// together; everything else maps to a single servo.
fn jogged(mut pose: Pose, axis: JogAxis, delta: i32) -> Pose {
    let p = &mut pose.0;
    match axis {
        JogAxis::Yaw => p[0] = p[0].saturating_add(delta),
        JogAxis::Reach => {
            p[1] = p[1].saturating_add(delta);
            p[2] = p[2].saturating_add(delta);
        }
        JogAxis::Lift => {
            p[1] = p[1].saturating_add(delta);
            p[2] = p[2].saturating_sub(delta);
        }
        JogAxis::Pitch => p[3] = p[3].saturating_add(delta),
        JogAxis::Roll => p[4] = p[4].saturating_add(delta),
        JogAxis::Grip => p[GRIPPER_JOINT] = p[GRIPPER_JOINT].saturating_add(delta),
    }
    pose
}
