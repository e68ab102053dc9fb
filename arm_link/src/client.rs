use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::actions::{ActionTransfer, TransferTiming};
use crate::drivers::{CommandSink, DriverEvent, LinkState};
use crate::jog::{JogController, JogSettings, JogStopCause};
use crate::library::LibraryMirror;
use crate::packets::{ArmCommand, ArmResponse, JogAxis, JogDirection, IDLE_PLAY_STATE};
use crate::pose::PoseMirror;
use crate::recorder::{DraftAction, Recorder};
use crate::{ArmError, Pose};

/// Status messages kept for display.
pub const STATUS_LOG_LEN: usize = 50;

/// Discrete user intents, whatever front end produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    SetJoint { index: usize, degrees: i32 },
    SetPose(Pose),
    /// Send the mirrored pose again.
    ApplyPose,
    GripOpen,
    GripClose,
    Home,
    Ready,
    /// Stop action playback.
    Stop,
    JogPress { axis: JogAxis, direction: JogDirection },
    JogRelease(JogStopCause),
    SetJogSettings(JogSettings),
    NewAction,
    SetActionName(String),
    AddFrame { hold_ms: Option<u32> },
    UndoFrame,
    DeleteFrame(usize),
    PreviewFrame(usize),
    SaveAction,
    RefreshLibrary,
    RunAction(String),
    LoadAction(String),
    DeleteAction(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Ui(UiEvent),
    Driver(DriverEvent),
}

/// Client-side state of one arm, driven one event at a time.
///
/// Owns the pose mirror, jog controller, keyframe recorder and library
/// mirror. Nothing else mutates them: UI intents arrive through
/// [`handle_ui`](ArmClient::handle_ui), transport events through
/// [`handle_driver`](ArmClient::handle_driver), and each call runs to
/// completion before the next. Background tasks (jog repeat, save
/// handshake, delete refresh) only ever talk to the [`CommandSink`].
pub struct ArmClient {
    sink: Arc<dyn CommandSink>,
    pose: PoseMirror,
    jog: JogController,
    recorder: Recorder,
    library: LibraryMirror,
    transfer: ActionTransfer,
    link: LinkState,
    play_state: String,
    status_log: VecDeque<String>,
    save_task: Option<JoinHandle<()>>,
}

impl ArmClient {
    pub fn new(sink: Arc<dyn CommandSink>) -> Self {
        Self::with_settings(sink, JogSettings::default(), TransferTiming::default())
    }

    pub fn with_settings(sink: Arc<dyn CommandSink>, jog: JogSettings, timing: TransferTiming) -> Self {
        Self {
            sink,
            pose: PoseMirror::new(),
            jog: JogController::new(jog),
            recorder: Recorder::new(),
            library: LibraryMirror::new(),
            transfer: ActionTransfer::new(timing),
            link: LinkState::Disconnected,
            play_state: IDLE_PLAY_STATE.to_string(),
            status_log: VecDeque::new(),
            save_task: None,
        }
    }

    pub fn handle(&mut self, event: ClientEvent) -> Result<(), ArmError> {
        match event {
            ClientEvent::Ui(event) => self.handle_ui(event),
            ClientEvent::Driver(event) => {
                self.handle_driver(event);
                Ok(())
            }
        }
    }

    /// Applies one user intent.
    ///
    /// Invalid input (bad joint index, missing frame, empty name or draft on
    /// save) is returned as an error before anything is sent.
    pub fn handle_ui(&mut self, event: UiEvent) -> Result<(), ArmError> {
        let sink = &*self.sink;
        match event {
            UiEvent::SetJoint { index, degrees } => {
                self.pose.set_joint(index, degrees, sink)?;
            }
            UiEvent::SetPose(pose) => self.pose.set_full_pose(pose, sink),
            UiEvent::ApplyPose => self.pose.resend(sink),
            UiEvent::GripOpen => {
                self.pose.grip_open(sink)?;
            }
            UiEvent::GripClose => {
                self.pose.grip_close(sink)?;
            }
            UiEvent::Home => sink.send(ArmCommand::Home),
            UiEvent::Ready => sink.send(ArmCommand::Ready),
            UiEvent::Stop => self.transfer.stop(sink),
            UiEvent::JogPress { axis, direction } => {
                self.jog.press(axis, direction, Arc::clone(&self.sink));
            }
            UiEvent::JogRelease(cause) => {
                self.jog.stop(cause);
            }
            UiEvent::SetJogSettings(settings) => self.jog.set_settings(settings),
            UiEvent::NewAction => self.recorder.new_action(),
            UiEvent::SetActionName(name) => self.recorder.set_name(name),
            UiEvent::AddFrame { hold_ms } => {
                self.recorder.add_frame(&self.pose, hold_ms);
            }
            UiEvent::UndoFrame => {
                self.recorder.undo_last();
            }
            UiEvent::DeleteFrame(index) => {
                self.recorder.delete_at(index)?;
            }
            UiEvent::PreviewFrame(index) => {
                self.recorder.preview_at(index, &mut self.pose, sink)?;
            }
            UiEvent::SaveAction => {
                if self.is_saving() {
                    return Err(ArmError::SaveInProgress);
                }
                let task = self.transfer.save(self.recorder.draft(), Arc::clone(&self.sink))?;
                self.save_task = Some(task);
            }
            UiEvent::RefreshLibrary => self.library.refresh(sink),
            UiEvent::RunAction(name) => self.transfer.run(&name, sink),
            UiEvent::LoadAction(name) => self.transfer.load(&name, sink),
            UiEvent::DeleteAction(name) => {
                // The refresh task runs detached; the next act_list is the only confirmation.
                self.transfer.delete(&name, Arc::clone(&self.sink));
            }
        }
        Ok(())
    }

    pub fn handle_driver(&mut self, event: DriverEvent) {
        match event {
            DriverEvent::Connected => {
                info!("arm connected, resyncing");
                self.link = LinkState::Connected;
                self.sink.send(ArmCommand::GetPose);
                self.library.refresh(&*self.sink);
            }
            DriverEvent::Disconnected => {
                if self.link == LinkState::Connected {
                    warn!("arm disconnected");
                }
                self.link = LinkState::Disconnected;
                self.jog.stop(JogStopCause::ConnectionLost);
            }
            DriverEvent::Message(response) => self.apply_response(response),
        }
    }

    fn apply_response(&mut self, response: ArmResponse) {
        match response {
            ArmResponse::Pose { pose } => self.pose.apply_remote_pose(pose),
            ArmResponse::ActList { list } => {
                debug!(count = list.len(), "library refreshed");
                self.library.replace(list);
            }
            ArmResponse::Status { msg } => {
                info!(status = %msg, "arm status");
                self.status_log.push_back(msg);
                while self.status_log.len() > STATUS_LOG_LEN {
                    self.status_log.pop_front();
                }
            }
            ArmResponse::Play { state } => self.play_state = state,
            ArmResponse::Action { name, frames } => {
                info!(name = %name, frames = frames.len(), "action loaded into editor");
                self.recorder.replace(DraftAction::new(name, frames));
            }
        }
    }

    /// Waits for the next driver event and applies it.
    ///
    /// Returns `false` once the driver's channel is closed.
    pub async fn pump(&mut self, events: &mut broadcast::Receiver<DriverEvent>) -> bool {
        match events.recv().await {
            Ok(event) => {
                self.handle_driver(event);
                true
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "driver events lagged, resyncing link state");
                // A lost Connected still owes the pose and library resync.
                if self.sink.is_open() {
                    self.handle_driver(DriverEvent::Connected);
                } else {
                    self.handle_driver(DriverEvent::Disconnected);
                }
                true
            }
            Err(RecvError::Closed) => false,
        }
    }

    pub fn pose(&self) -> &PoseMirror {
        &self.pose
    }

    pub fn jog(&self) -> &JogController {
        &self.jog
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn library(&self) -> &LibraryMirror {
        &self.library
    }

    pub fn link_state(&self) -> LinkState {
        self.link
    }

    pub fn play_state(&self) -> &str {
        &self.play_state
    }

    pub fn status_log(&self) -> impl Iterator<Item = &str> {
        self.status_log.iter().map(String::as_str)
    }

    /// True while a save handshake is still being streamed.
    pub fn is_saving(&self) -> bool {
        self.save_task.as_ref().is_some_and(|task| !task.is_finished())
    }
}
