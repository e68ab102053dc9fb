use serde::{Deserialize, Serialize};

use crate::drivers::CommandSink;
use crate::pose::PoseMirror;
use crate::{ArmError, Keyframe, Pose};

/// Hold duration the console offers by default, in milliseconds.
pub const DEFAULT_HOLD_MS: u32 = 300;

/// The action being edited: a name and its keyframes, in order.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftAction {
    pub name: String,
    pub frames: Vec<Keyframe>,
}

impl DraftAction {
    pub fn new(name: impl Into<String>, frames: Vec<Keyframe>) -> Self {
        Self {
            name: name.into(),
            frames,
        }
    }
}

/// One line of the frame table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRow {
    pub index: usize,
    pub hold: u32,
    pub pose: Pose,
}

/// Keyframe buffer for the draft action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recorder {
    draft: DraftAction,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the draft and starts an empty, unnamed one.
    pub fn new_action(&mut self) {
        self.draft = DraftAction::default();
    }

    pub fn draft(&self) -> &DraftAction {
        &self.draft
    }

    pub fn name(&self) -> &str {
        &self.draft.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.draft.name = name.into();
    }

    pub fn frames(&self) -> &[Keyframe] {
        &self.draft.frames
    }

    pub fn frame_count(&self) -> usize {
        self.draft.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draft.frames.is_empty()
    }

    /// Appends the mirror's current pose with `hold_ms` (0 when absent).
    ///
    /// Returns the index of the new frame.
    pub fn add_frame(&mut self, pose: &PoseMirror, hold_ms: Option<u32>) -> usize {
        self.draft.frames.push(Keyframe::new(pose.snapshot(), hold_ms.unwrap_or(0)));
        self.draft.frames.len() - 1
    }

    pub fn undo_last(&mut self) -> Option<Keyframe> {
        self.draft.frames.pop()
    }

    /// Removes one frame; later frames shift down by one.
    pub fn delete_at(&mut self, index: usize) -> Result<Keyframe, ArmError> {
        self.check_index(index)?;
        Ok(self.draft.frames.remove(index))
    }

    /// Moves the arm to a recorded frame without touching the buffer.
    pub fn preview_at(&self, index: usize, pose: &mut PoseMirror, sink: &dyn CommandSink) -> Result<Pose, ArmError> {
        self.check_index(index)?;
        let target = self.draft.frames[index].pose;
        pose.set_full_pose(target, sink);
        Ok(target)
    }

    /// Swaps in a whole draft, e.g. one loaded from the library. No merge.
    pub fn replace(&mut self, draft: DraftAction) {
        self.draft = draft;
    }

    pub fn rows(&self) -> impl Iterator<Item = FrameRow> + '_ {
        self.draft.frames.iter().enumerate().map(|(index, frame)| FrameRow {
            index,
            hold: frame.hold,
            pose: frame.pose,
        })
    }

    fn check_index(&self, index: usize) -> Result<(), ArmError> {
        let len = self.draft.frames.len();
        if index >= len {
            return Err(ArmError::FrameOutOfRange { index, len });
        }
        Ok(())
    }
}

/// Reads a hold duration typed by the user.
///
/// Takes the leading integer the way a lenient number field would
/// (`"300ms"` is 300); anything without one is 0, and negatives floor at 0.
pub fn parse_hold(text: &str) -> u32 {
    let text = text.trim();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    let digits = &digits[..end];
    if digits.is_empty() || negative {
        return 0;
    }
    digits.parse::<u64>().map(|v| v.min(u32::MAX as u64) as u32).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_frame_copies_current_pose() {
        let mut recorder = Recorder::new();
        let mirror = PoseMirror::with_pose(Pose([1, 2, 3, 4, 5, 6]));
        assert_eq!(recorder.add_frame(&mirror, Some(100)), 0);
        assert_eq!(recorder.add_frame(&mirror, None), 1);
        assert_eq!(recorder.frames()[0], Keyframe::new(Pose([1, 2, 3, 4, 5, 6]), 100));
        assert_eq!(recorder.frames()[1].hold, 0);
    }

    #[test]
    fn undo_on_empty_is_a_no_op() {
        let mut recorder = Recorder::new();
        assert_eq!(recorder.undo_last(), None);
        assert!(recorder.is_empty());
    }

    #[test]
    fn delete_out_of_range_is_rejected() {
        let mut recorder = Recorder::new();
        recorder.add_frame(&PoseMirror::new(), Some(1));
        assert_eq!(recorder.delete_at(3), Err(ArmError::FrameOutOfRange { index: 3, len: 1 }));
        assert_eq!(recorder.frame_count(), 1);
    }

    #[test]
    fn new_action_clears_name_and_frames() {
        let mut recorder = Recorder::new();
        recorder.set_name("pick_1");
        recorder.add_frame(&PoseMirror::new(), None);
        recorder.new_action();
        assert_eq!(recorder.draft(), &DraftAction::default());
    }

    #[test]
    fn parse_hold_is_lenient() {
        assert_eq!(parse_hold("300"), 300);
        assert_eq!(parse_hold(" 250ms"), 250);
        assert_eq!(parse_hold("abc"), 0);
        assert_eq!(parse_hold(""), 0);
        assert_eq!(parse_hold("-40"), 0);
        assert_eq!(parse_hold("99999999999"), u32::MAX);
    }
}
