use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::drivers::CommandSink;
use crate::packets::ArmCommand;
use crate::recorder::DraftAction;
use crate::ArmError;

/// Pacing of the library protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferTiming {
    /// Pause after each `act_save_frame`, so the controller's receive buffer keeps up.
    pub frame_gap: Duration,
    /// Wait after `act_save_end` before refreshing the library.
    pub settle: Duration,
    /// Wait after `act_delete` before refreshing the library.
    pub delete_refresh: Duration,
}

impl Default for TransferTiming {
    fn default() -> Self {
        Self {
            frame_gap: Duration::from_millis(6),
            settle: Duration::from_millis(200),
            delete_refresh: Duration::from_millis(300),
        }
    }
}

/// Builds the complete save handshake for `draft`, in send order:
/// `act_save_begin`, one `act_save_frame` per keyframe, `act_save_end`.
///
/// The name is trimmed. An empty name or an empty draft is rejected
/// before anything is produced.
pub fn save_sequence(draft: &DraftAction) -> Result<Vec<ArmCommand>, ArmError> {
    let name = draft.name.trim();
    if name.is_empty() {
        return Err(ArmError::EmptyActionName);
    }
    if draft.frames.is_empty() {
        return Err(ArmError::EmptyDraft);
    }

    let mut sequence = Vec::with_capacity(draft.frames.len() + 2);
    sequence.push(ArmCommand::save_begin(name, draft.frames.len()));
    for (idx, frame) in draft.frames.iter().enumerate() {
        sequence.push(ArmCommand::save_frame(name, idx, frame));
    }
    sequence.push(ArmCommand::save_end(name));
    Ok(sequence)
}

/// Save/list/run/load/delete against the controller's action library.
///
/// Nothing here waits for an acknowledgement, because the controller sends
/// none. Saves and deletes are followed by a delayed `act_list` so the
/// library view catches up with whatever the controller actually stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionTransfer {
    timing: TransferTiming,
}

impl ActionTransfer {
    pub fn new(timing: TransferTiming) -> Self {
        Self { timing }
    }

    /// Streams `draft` to the library from a background task.
    ///
    /// Validation happens here, synchronously; on error nothing is sent.
    /// The draft is copied, so later edits do not affect a save in flight.
    /// Once started a save cannot be cancelled.
    pub fn save(&self, draft: &DraftAction, sink: Arc<dyn CommandSink>) -> Result<JoinHandle<()>, ArmError> {
        let sequence = save_sequence(draft)?;
        let timing = self.timing;
        info!(name = draft.name.trim(), frames = draft.frames.len(), "saving action");
        Ok(tokio::spawn(async move {
            stream_save(sequence, timing, sink).await;
        }))
    }

    pub fn list(&self, sink: &dyn CommandSink) {
        sink.send(ArmCommand::ActList);
    }

    pub fn run(&self, name: &str, sink: &dyn CommandSink) {
        sink.send(ArmCommand::ActRun { name: name.to_string() });
    }

    /// Asks for an action's frames; they arrive later as an `act` message.
    pub fn load(&self, name: &str, sink: &dyn CommandSink) {
        sink.send(ArmCommand::ActLoad { name: name.to_string() });
    }

    pub fn stop(&self, sink: &dyn CommandSink) {
        sink.send(ArmCommand::ActStop);
    }

    /// Deletes `name` and refreshes the library a little later.
    pub fn delete(&self, name: &str, sink: Arc<dyn CommandSink>) -> JoinHandle<()> {
        sink.send(ArmCommand::ActDelete { name: name.to_string() });
        let delay = self.timing.delete_refresh;
        tokio::spawn(async move {
            sleep(delay).await;
            sink.send(ArmCommand::ActList);
        })
    }
}

async fn stream_save(sequence: Vec<ArmCommand>, timing: TransferTiming, sink: Arc<dyn CommandSink>) {
    for command in sequence {
        let is_frame = matches!(command, ArmCommand::ActSaveFrame { .. });
        sink.send(command);
        if is_frame {
            sleep(timing.frame_gap).await;
        }
    }
    debug!("save handshake sent, waiting to refresh library");
    sleep(timing.settle).await;
    sink.send(ArmCommand::ActList);
}
