use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use super::{ArmDriverConfig, CommandSink, DriverEvent};
use crate::packets::{ArmCommand, ArmResponse};
use crate::ArmError;

type ArmSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// The single persistent connection to the arm controller.
///
/// The driver keeps itself connected: when the socket closes or errors it
/// publishes [`DriverEvent::Disconnected`], waits
/// [`reconnect_delay`](ArmDriverConfig::reconnect_delay) and dials again,
/// forever, until [`shutdown`](ArmDriver::shutdown).
///
/// Every connection gets its own outbound queue. Commands sent while no
/// connection is open are dropped, and anything still queued when a
/// connection dies is dropped with it.
#[derive(Debug, Clone)]
pub struct ArmDriver {
    pub config: ArmDriverConfig,
    pub event_tx: broadcast::Sender<DriverEvent>,
    outbound: Arc<Mutex<Option<mpsc::UnboundedSender<ArmCommand>>>>,
    supervisor: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ArmDriver {
    /// Starts the connection supervisor for `config` and returns at once.
    ///
    /// The first connection attempt happens in the background; subscribe
    /// with [`subscribe`](ArmDriver::subscribe) to learn when it opens.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration does not validate.
    /// Network failures are never returned, they show up as
    /// `DriverEvent::Disconnected` instead.
    pub async fn connect(config: ArmDriverConfig) -> Result<ArmDriver, ArmError> {
        config.validate()?;

        let (event_tx, _rx) = broadcast::channel(256);
        let driver = Self {
            config,
            event_tx,
            outbound: Arc::new(Mutex::new(None)),
            supervisor: Arc::new(Mutex::new(None)),
        };

        let driver_clone = driver.clone();
        let handle = tokio::spawn(async move {
            driver_clone.supervise().await;
        });
        *lock(&driver.supervisor) = Some(handle);

        Ok(driver)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DriverEvent> {
        self.event_tx.subscribe()
    }

    /// Stops reconnecting and closes the current connection, if any.
    pub fn shutdown(&self) {
        if let Some(handle) = lock(&self.supervisor).take() {
            handle.abort();
        }
        if lock(&self.outbound).take().is_some() {
            self.publish(DriverEvent::Disconnected);
        }
        info!(url = %self.config.connection_url(), "arm driver shut down");
    }

    fn publish(&self, event: DriverEvent) {
        // No subscribers is fine; events are advisory.
        let _ = self.event_tx.send(event);
    }

    async fn supervise(&self) {
        let url = self.config.connection_url();
        loop {
            debug!(%url, "connecting to arm");
            match connect_async(url.as_str()).await {
                Ok((socket, _response)) => {
                    info!(%url, "connected to arm");
                    self.run_connection(socket).await;
                    info!(%url, "connection to arm closed");
                }
                Err(e) => {
                    let error = ArmError::FailedToConnect(e.to_string());
                    warn!(%url, %error, "failed to connect to arm");
                }
            }

            lock(&self.outbound).take();
            self.publish(DriverEvent::Disconnected);

            sleep(self.config.reconnect_delay()).await;
        }
    }

    async fn run_connection(&self, socket: ArmSocket) {
        let (mut write, mut read) = socket.split();
        let (queue_tx, mut queue_rx) = mpsc::unbounded_channel::<ArmCommand>();

        *lock(&self.outbound) = Some(queue_tx);
        self.publish(DriverEvent::Connected);

        loop {
            tokio::select! {
                Some(command) = queue_rx.recv() => {
                    let text = match command.to_json() {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(cmd = command.verb(), error = %e, "failed to serialize command");
                            continue;
                        }
                    };
                    if let Err(e) = write.send(Message::Text(text)).await {
                        warn!(error = %e, "failed to send to arm");
                        break;
                    }
                    trace!(cmd = command.verb(), "sent");
                }
                incoming = read.next() => match incoming {
                    Some(Ok(Message::Text(text))) => self.process_text(&text),
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "arm closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "connection to arm failed");
                        break;
                    }
                    None => break,
                },
            }
        }

        lock(&self.outbound).take();
        let _ = write.close().await;
    }

    fn process_text(&self, text: &str) {
        match ArmResponse::parse(text) {
            Ok(response) => {
                trace!(kind = response.kind(), "received");
                self.publish(DriverEvent::Message(response));
            }
            Err(e) => {
                debug!(error = %e, text, "discarding unrecognised message");
            }
        }
    }
}

impl ArmDriver {
    /// Queues `command` on the open connection.
    ///
    /// # Errors
    ///
    /// Returns `Disconnected` when no connection is open or the open one is
    /// closing; the command is dropped.
    pub fn try_send(&self, command: ArmCommand) -> Result<(), ArmError> {
        match lock(&self.outbound).as_ref() {
            Some(queue) => queue.send(command).map_err(|_| ArmError::Disconnected),
            None => Err(ArmError::Disconnected),
        }
    }
}

impl CommandSink for ArmDriver {
    fn is_open(&self) -> bool {
        lock(&self.outbound).is_some()
    }

    fn send(&self, command: ArmCommand) {
        let verb = command.verb();
        if let Err(e) = self.try_send(command) {
            trace!(cmd = verb, error = %e, "command dropped");
        }
    }
}

impl Drop for ArmDriver {
    fn drop(&mut self) {
        // Last handle outside the supervisor itself: stop reconnecting.
        if Arc::strong_count(&self.supervisor) == 2 {
            if let Some(handle) = lock(&self.supervisor).take() {
                handle.abort();
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
