use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::mem;
use tracing::{debug, warn};

use arm_link::packets::{JogAxis, JogDirection};
use arm_link::recorder::DEFAULT_HOLD_MS;
use arm_link::{parse_hold, ArmClient, JogStopCause, UiEvent, JOINT_COUNT};

/// Upper bound of the hold field, in milliseconds.
pub const MAX_HOLD_MS: u32 = 5000;

const PERIOD_STEP_MS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    EditName(String),
    EditHold(String),
    ConfirmDelete(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Frames,
    Library,
}

/// Console state around one [`ArmClient`]: cursors, input modes and the
/// prompt line. Every key press ends up as zero or more `UiEvent`s.
pub struct App {
    pub client: ArmClient,
    pub mode: Mode,
    pub focus: Focus,
    pub selected_joint: usize,
    pub frame_cursor: usize,
    pub library_cursor: usize,
    pub hold_ms: u32,
    /// True when the terminal reports key releases, so jog keys can be held.
    pub release_events: bool,
    pub prompt: String,
    pub should_quit: bool,
    held_jog: Option<KeyCode>,
}

impl App {
    pub fn new(client: ArmClient, release_events: bool) -> Self {
        Self {
            client,
            mode: Mode::Normal,
            focus: Focus::Frames,
            selected_joint: 0,
            frame_cursor: 0,
            library_cursor: 0,
            hold_ms: DEFAULT_HOLD_MS,
            release_events,
            prompt: String::new(),
            should_quit: false,
            held_jog: None,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        // A lost connection stops the jog behind our back.
        if !self.client.jog().is_active() {
            self.held_jog = None;
        }

        match key.kind {
            KeyEventKind::Release => self.key_released(key.code),
            // The jog controller does its own repeating.
            KeyEventKind::Repeat => {}
            KeyEventKind::Press => {
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    self.quit();
                    return;
                }
                match mem::replace(&mut self.mode, Mode::Normal) {
                    Mode::Normal => self.normal_key(key.code),
                    Mode::EditName(buffer) => self.edit_name(buffer, key.code),
                    Mode::EditHold(buffer) => self.edit_hold(buffer, key.code),
                    Mode::ConfirmDelete(name) => self.confirm_delete(name, key.code),
                }
            }
        }
        self.clamp_cursors();
    }

    /// The terminal lost focus; a held key will never report its release.
    pub fn focus_lost(&mut self) {
        if self.held_jog.take().is_some() {
            self.dispatch(UiEvent::JogRelease(JogStopCause::PointerLeave));
        }
    }

    pub fn selected_action(&self) -> Option<String> {
        self.client.library().get(self.library_cursor).map(|e| e.name.clone())
    }

    fn normal_key(&mut self, code: KeyCode) {
        if let Some((axis, direction)) = jog_binding(code) {
            self.jog_key(code, axis, direction);
            return;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit(),
            KeyCode::Char(c @ '1'..='6') => {
                self.selected_joint = (c as usize - '1' as usize).min(JOINT_COUNT - 1);
            }
            KeyCode::Left => self.nudge(-1),
            KeyCode::Right => self.nudge(1),
            KeyCode::PageDown => self.nudge(-10),
            KeyCode::PageUp => self.nudge(10),
            KeyCode::Char('H') => {
                let _ = self.dispatch(UiEvent::Home);
            }
            KeyCode::Char('Y') => {
                let _ = self.dispatch(UiEvent::Ready);
            }
            KeyCode::Char(' ') => {
                let _ = self.dispatch(UiEvent::Stop);
            }
            KeyCode::Char('O') => {
                let _ = self.dispatch(UiEvent::GripOpen);
            }
            KeyCode::Char('C') => {
                let _ = self.dispatch(UiEvent::GripClose);
            }
            KeyCode::Char('P') => {
                let _ = self.dispatch(UiEvent::ApplyPose);
            }
            KeyCode::Char('.') => self.adjust_step(1),
            KeyCode::Char(',') => self.adjust_step(-1),
            KeyCode::Char('>') => self.adjust_period(true),
            KeyCode::Char('<') => self.adjust_period(false),
            KeyCode::Char('n') => {
                self.dispatch(UiEvent::NewAction);
                self.frame_cursor = 0;
            }
            KeyCode::Char('e') => self.mode = Mode::EditName(self.client.recorder().name().to_string()),
            KeyCode::Char('m') => self.mode = Mode::EditHold(self.hold_ms.to_string()),
            KeyCode::Char('k') => {
                self.dispatch(UiEvent::AddFrame {
                    hold_ms: Some(self.hold_ms),
                });
                self.frame_cursor = self.client.recorder().frame_count().saturating_sub(1);
            }
            KeyCode::Char('u') => {
                let _ = self.dispatch(UiEvent::UndoFrame);
            }
            KeyCode::Char('X') => {
                let _ = self.dispatch(UiEvent::DeleteFrame(self.frame_cursor));
            }
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Frames => Focus::Library,
                    Focus::Library => Focus::Frames,
                }
            }
            KeyCode::Up => self.move_cursor(-1),
            KeyCode::Down => self.move_cursor(1),
            KeyCode::Enter => match self.focus {
                Focus::Frames => {
                let _ = self.dispatch(UiEvent::PreviewFrame(self.frame_cursor));
            }
                Focus::Library => {
                    if let Some(name) = self.selected_action() {
                        self.dispatch(UiEvent::LoadAction(name));
                    }
                }
            },
            KeyCode::Char('S') => {
                if self.dispatch(UiEvent::SaveAction) {
                    self.prompt = format!("Saving '{}'", self.client.recorder().name().trim());
                }
            }
            KeyCode::Char('L') => {
                let _ = self.dispatch(UiEvent::RefreshLibrary);
            }
            KeyCode::Char('R') => {
                if let Some(name) = self.selected_action() {
                    self.dispatch(UiEvent::RunAction(name));
                }
            }
            KeyCode::Char('D') => match self.selected_action() {
                Some(name) => {
                    self.prompt = format!("Delete '{}'? (y/n)", name);
                    self.mode = Mode::ConfirmDelete(name);
                }
                None => self.prompt = "No action selected".to_string(),
            },
            _ => {}
        }
    }

    fn jog_key(&mut self, code: KeyCode, axis: JogAxis, direction: JogDirection) {
        if !self.release_events && self.held_jog == Some(code) {
            // Without release events the second press is the release.
            self.held_jog = None;
            self.dispatch(UiEvent::JogRelease(JogStopCause::Release));
            return;
        }
        if self.held_jog == Some(code) {
            return;
        }
        self.held_jog = Some(code);
        self.dispatch(UiEvent::JogPress { axis, direction });
    }

    fn key_released(&mut self, code: KeyCode) {
        if self.held_jog == Some(code) {
            self.held_jog = None;
            self.dispatch(UiEvent::JogRelease(JogStopCause::Release));
        }
    }

    fn edit_name(&mut self, mut buffer: String, code: KeyCode) {
        match code {
            KeyCode::Enter => {
                self.dispatch(UiEvent::SetActionName(buffer));
                return;
            }
            KeyCode::Esc => return,
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(c) => buffer.push(c),
            _ => {}
        }
        self.mode = Mode::EditName(buffer);
    }

    fn edit_hold(&mut self, mut buffer: String, code: KeyCode) {
        match code {
            KeyCode::Enter => {
                self.hold_ms = parse_hold(&buffer).min(MAX_HOLD_MS);
                self.prompt = format!("Hold set to {} ms", self.hold_ms);
                return;
            }
            KeyCode::Esc => return,
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(c) => buffer.push(c),
            _ => {}
        }
        self.mode = Mode::EditHold(buffer);
    }

    fn confirm_delete(&mut self, name: String, code: KeyCode) {
        if matches!(code, KeyCode::Char('y') | KeyCode::Char('Y')) {
            self.prompt = format!("Deleting '{}'", name);
            self.dispatch(UiEvent::DeleteAction(name));
        } else {
            self.prompt = "Delete cancelled".to_string();
        }
    }

    fn nudge(&mut self, delta: i32) {
        let current = self.client.pose().snapshot().get(self.selected_joint).unwrap_or_default();
        self.dispatch(UiEvent::SetJoint {
            index: self.selected_joint,
            degrees: current + delta,
        });
    }

    fn adjust_step(&mut self, delta: i32) {
        let settings = self.client.jog().settings();
        let step = settings.step_degrees().saturating_add_signed(delta);
        self.dispatch(UiEvent::SetJogSettings(settings.with_step(step)));
    }

    fn adjust_period(&mut self, slower: bool) {
        let settings = self.client.jog().settings();
        let period = if slower {
            settings.period_ms() + PERIOD_STEP_MS
        } else {
            settings.period_ms().saturating_sub(PERIOD_STEP_MS)
        };
        self.dispatch(UiEvent::SetJogSettings(settings.with_period(period)));
    }

    fn move_cursor(&mut self, delta: isize) {
        let cursor = match self.focus {
            Focus::Frames => &mut self.frame_cursor,
            Focus::Library => &mut self.library_cursor,
        };
        *cursor = cursor.saturating_add_signed(delta);
        self.clamp_cursors();
    }

    pub fn clamp_cursors(&mut self) {
        self.frame_cursor = self.frame_cursor.min(self.client.recorder().frame_count().saturating_sub(1));
        self.library_cursor = self.library_cursor.min(self.client.library().len().saturating_sub(1));
    }

    fn quit(&mut self) {
        if self.held_jog.take().is_some() {
            self.dispatch(UiEvent::JogRelease(JogStopCause::PointerCancel));
        }
        self.should_quit = true;
    }

    /// Hands `event` to the client; a rejection becomes the prompt line.
    fn dispatch(&mut self, event: UiEvent) -> bool {
        debug!(?event, "ui event");
        match self.client.handle_ui(event) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "ui event rejected");
                self.prompt = e.to_string();
                false
            }
        }
    }
}

fn jog_binding(code: KeyCode) -> Option<(JogAxis, JogDirection)> {
    use JogDirection::{Negative, Positive};
    let binding = match code {
        KeyCode::Char('a') => (JogAxis::Yaw, Negative),
        KeyCode::Char('d') => (JogAxis::Yaw, Positive),
        KeyCode::Char('w') => (JogAxis::Reach, Positive),
        KeyCode::Char('s') => (JogAxis::Reach, Negative),
        KeyCode::Char('r') => (JogAxis::Lift, Positive),
        KeyCode::Char('f') => (JogAxis::Lift, Negative),
        KeyCode::Char('t') => (JogAxis::Pitch, Positive),
        KeyCode::Char('g') => (JogAxis::Pitch, Negative),
        KeyCode::Char('z') => (JogAxis::Roll, Negative),
        KeyCode::Char('x') => (JogAxis::Roll, Positive),
        KeyCode::Char('[') => (JogAxis::Grip, Negative),
        KeyCode::Char(']') => (JogAxis::Grip, Positive),
        _ => return None,
    };
    Some(binding)
}

/// Key hints for the help panel, in display order.
pub const KEY_HELP: &[(&str, &str)] = &[
    ("a/d w/s r/f t/g z/x [/]", "jog yaw reach lift pitch roll grip"),
    ("1-6 \u{2190}/\u{2192} PgUp/PgDn", "select joint, nudge 1\u{b0} / 10\u{b0}"),
    (", . < >", "jog step, jog period"),
    ("H Y space O C P", "home ready stop open close apply"),
    ("n e m k u X Enter", "new name hold add undo delete preview"),
    ("Tab \u{2191}/\u{2193} S L R D", "focus, select, save list run delete"),
    ("q", "quit"),
];
