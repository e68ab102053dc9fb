use std::mem;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::drivers::CommandSink;
use crate::packets::{ArmCommand, JogAxis, JogDirection};

/// Step size and repeat period used by the next press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JogSettings {
    step_degrees: u32,
    period_ms: u64,
}

impl JogSettings {
    pub const STEP_RANGE: RangeInclusive<u32> = 1..=15;
    pub const PERIOD_RANGE: RangeInclusive<u64> = 40..=300;

    /// Builds settings, pulling both values into their supported ranges.
    pub fn new(step_degrees: u32, period_ms: u64) -> Self {
        Self {
            step_degrees: step_degrees.clamp(*Self::STEP_RANGE.start(), *Self::STEP_RANGE.end()),
            period_ms: period_ms.clamp(*Self::PERIOD_RANGE.start(), *Self::PERIOD_RANGE.end()),
        }
    }

    pub fn step_degrees(&self) -> u32 {
        self.step_degrees
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    pub fn with_step(self, step_degrees: u32) -> Self {
        Self::new(step_degrees, self.period_ms)
    }

    pub fn with_period(self, period_ms: u64) -> Self {
        Self::new(self.step_degrees, period_ms)
    }
}

impl Default for JogSettings {
    fn default() -> Self {
        Self {
            step_degrees: 2,
            period_ms: 80,
        }
    }
}

/// One held jog control, from press to release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JogSession {
    pub axis: JogAxis,
    pub direction: JogDirection,
    pub step_degrees: u32,
    pub period_ms: u64,
}

impl JogSession {
    pub fn command(&self) -> ArmCommand {
        ArmCommand::jog(self.axis, self.direction, self.step_degrees)
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

/// Why a jog ended. Stopping is silent whatever the cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JogStopCause {
    Release,
    PointerLeave,
    PointerCancel,
    ConnectionLost,
    Replaced,
}

#[derive(Debug)]
enum JogState {
    Idle,
    Active { session: JogSession, ticker: JoinHandle<()> },
}

/// Hold-to-move controller.
///
/// IDLE until [`press`](JogController::press), which sends one jog step
/// straight away and then repeats it every `period_ms` from a background
/// task. [`stop`](JogController::stop) aborts that task and returns to IDLE.
/// There is never more than one repeat task: a press while ACTIVE stops the
/// previous session first.
///
/// The repeat task must run on the same single-threaded runtime as the
/// owner, so that aborting it guarantees no further tick is sent.
#[derive(Debug)]
pub struct JogController {
    state: JogState,
    settings: JogSettings,
}

impl JogController {
    pub fn new(settings: JogSettings) -> Self {
        Self {
            state: JogState::Idle,
            settings,
        }
    }

    pub fn settings(&self) -> JogSettings {
        self.settings
    }

    /// New settings apply from the next press; a running session keeps its own.
    pub fn set_settings(&mut self, settings: JogSettings) {
        self.settings = settings;
    }

    pub fn active(&self) -> Option<JogSession> {
        match &self.state {
            JogState::Idle => None,
            JogState::Active { session, .. } => Some(*session),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active().is_some()
    }

    /// Starts jogging `axis` in `direction` with the current settings.
    pub fn press(&mut self, axis: JogAxis, direction: JogDirection, sink: Arc<dyn CommandSink>) -> JogSession {
        self.stop(JogStopCause::Replaced);

        let session = JogSession {
            axis,
            direction,
            step_degrees: self.settings.step_degrees,
            period_ms: self.settings.period_ms,
        };

        sink.send(session.command());
        let ticker = tokio::spawn(repeat(session, sink));
        debug!(axis = %axis, dir = direction.sign(), step = session.step_degrees, period_ms = session.period_ms, "jog started");

        self.state = JogState::Active { session, ticker };
        session
    }

    /// Ends the active session, if any. Calling it while IDLE does nothing.
    pub fn stop(&mut self, cause: JogStopCause) -> Option<JogSession> {
        match mem::replace(&mut self.state, JogState::Idle) {
            JogState::Idle => None,
            JogState::Active { session, ticker } => {
                ticker.abort();
                debug!(axis = %session.axis, ?cause, "jog stopped");
                Some(session)
            }
        }
    }
}

impl Default for JogController {
    fn default() -> Self {
        Self::new(JogSettings::default())
    }
}

impl Drop for JogController {
    fn drop(&mut self) {
        self.stop(JogStopCause::PointerCancel);
    }
}

async fn repeat(session: JogSession, sink: Arc<dyn CommandSink>) {
    let period = session.period();
    // The first step went out on press; ticks start one period later.
    let mut tick = interval_at(Instant::now() + period, period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tick.tick().await;
        sink.send(session.command());
    }
}
