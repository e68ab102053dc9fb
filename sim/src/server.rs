use futures_util::{SinkExt, StreamExt};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use arm_link::packets::{ArmCommand, ArmResponse, IDLE_PLAY_STATE};
use arm_link::Keyframe;

use crate::device::{DeviceState, Effect, RUNNING_PLAY_STATE};

/// Shared controller: one device, any number of WebSocket clients.
#[derive(Clone)]
pub struct Simulator {
    state: Arc<Mutex<DeviceState>>,
    updates: broadcast::Sender<String>,
    playback: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(100);
        Self {
            state: Arc::new(Mutex::new(DeviceState::new())),
            updates,
            playback: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn snapshot(&self) -> DeviceState {
        self.state.lock().await.clone()
    }

    /// Applies one inbound text frame and returns the replies meant for
    /// its sender. Broadcasts go out to every client, sender included.
    pub async fn handle_text(&self, text: &str) -> Vec<String> {
        let command = match ArmCommand::parse(text) {
            Ok(command) => command,
            Err(e) => {
                debug!("Ignoring command {}: {}", text, e);
                return encode(&ArmResponse::Status {
                    msg: format!("unknown command: {}", text),
                })
                .into_iter()
                .collect();
            }
        };

        debug!("Received {}", command.verb());
        let effects = self.state.lock().await.apply(command);

        let mut replies = Vec::new();
        for effect in effects {
            match effect {
                Effect::Reply(response) => replies.extend(encode(&response)),
                Effect::Broadcast(response) => self.broadcast(&response),
                Effect::StartPlayback { name, frames } => self.start_playback(name, frames).await,
                Effect::StopPlayback => self.stop_playback().await,
            }
        }
        replies
    }

    fn broadcast(&self, response: &ArmResponse) {
        if let Some(text) = encode(response) {
            // No subscribers just means nobody is connected.
            let _ = self.updates.send(text);
        }
    }

    async fn start_playback(&self, name: String, frames: Vec<Keyframe>) {
        let mut playback = self.playback.lock().await;
        if let Some(previous) = playback.take() {
            previous.abort();
        }
        info!("Playing {} ({} frames)", name, frames.len());
        let sim = self.clone();
        *playback = Some(tokio::spawn(async move {
            sim.play(frames).await;
        }));
    }

    async fn play(&self, frames: Vec<Keyframe>) {
        let running = self.state.lock().await.set_play_state(RUNNING_PLAY_STATE);
        self.broadcast(&running);
        for frame in frames {
            let pose = self.state.lock().await.move_to(frame.pose);
            self.broadcast(&pose);
            tokio::time::sleep(Duration::from_millis(frame.hold as u64)).await;
        }
        let idle = self.state.lock().await.set_play_state(IDLE_PLAY_STATE);
        self.broadcast(&idle);
    }

    async fn stop_playback(&self) {
        let handle = self.playback.lock().await.take();
        if let Some(handle) = handle {
            handle.abort();
            info!("Playback stopped");
        }
        let idle = self.state.lock().await.set_play_state(IDLE_PLAY_STATE);
        self.broadcast(&idle);
    }
}

fn encode(response: &ArmResponse) -> Option<String> {
    match response.to_json() {
        Ok(text) => Some(text),
        Err(e) => {
            error!("Failed to encode {}: {}", response.kind(), e);
            None
        }
    }
}

/// Accepts WebSocket clients on `listener` until the task is dropped.
pub async fn serve(listener: TcpListener, sim: Simulator) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("Simulator listening on {}", listener.local_addr()?);
    loop {
        let (socket, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            }
        };

        let sim = sim.clone();
        tokio::spawn(async move {
            info!("Client {} connected", addr);
            if let Err(e) = handle_connection(socket, sim).await {
                warn!("Client {} dropped: {}", addr, e);
            }
            info!("Client {} disconnected", addr);
        });
    }
}

async fn handle_connection(stream: TcpStream, sim: Simulator) -> Result<(), Box<dyn Error + Send + Sync>> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let mut updates = sim.updates.subscribe();

    loop {
        tokio::select! {
            msg = ws_receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    for reply in sim.handle_text(&text).await {
                        ws_sender.send(Message::Text(reply)).await?;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(Box::new(e)),
            },
            update = updates.recv() => match update {
                Ok(text) => ws_sender.send(Message::Text(text)).await?,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Client lagged behind by {} updates", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}
