//! Feed connection lifecycle and heartbeat supervision.
//!
//! One task owns the transport and the liveness deadline. Everything that
//! changes them (heartbeats, reconnect requests, maintenance pauses,
//! shutdown) arrives as a [`Command`] on a channel and is handled in order,
//! so a heartbeat can never race a timeout and two reconnects never overlap.
//!
//! The deadline is polled in the same `select!` as the command channel:
//! arming replaces the previous deadline, disarming sets it to `None`.

use crate::{BitfinexAdapter, FeedError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

/// Authenticated streaming session the connection drives.
///
/// `open` connects and sends the auth handshake. `close` must be
/// idempotent: it is called before every reconnect, whether or not a
/// session is currently up.
#[async_trait]
pub trait Transport: Send {
    async fn open(&mut self) -> Result<(), FeedError>;
    async fn close(&mut self);
    async fn send(&mut self, text: String) -> Result<(), FeedError>;
}

/// Lifecycle controls the dispatcher needs from the connection.
pub trait ConnectionControl: Send + Sync {
    fn heartbeat(&self);
    fn reconnect(&self);
    fn pause(&self);
    fn unpause(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Authenticating,
    Streaming,
    /// Exchange maintenance: transport closed, timer disarmed.
    Paused,
    /// Terminal.
    Closed,
}

/// Point-in-time view of the liveness timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessSnapshot {
    pub state: ConnectionState,
    pub armed: bool,
    pub remaining: Option<Duration>,
}

#[derive(Debug)]
enum Command {
    Heartbeat,
    Reconnect,
    Pause,
    Unpause,
    Calc(Vec<String>),
    Inspect(oneshot::Sender<LivenessSnapshot>),
    Close,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Heartbeat => "heartbeat",
            Command::Reconnect => "reconnect",
            Command::Pause => "pause",
            Command::Unpause => "unpause",
            Command::Calc(_) => "calc",
            Command::Inspect(_) => "inspect",
            Command::Close => "close",
        }
    }
}

/// Receiving end of a [`FeedHandle`], consumed by [`FeedConnection::spawn`].
pub struct CommandReceiver(mpsc::UnboundedReceiver<Command>);

/// Cheap, cloneable control handle for a running connection.
///
/// All calls are fire-and-forget. Once the connection is closed they are
/// no-ops.
#[derive(Debug, Clone)]
pub struct FeedHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl FeedHandle {
    /// Create a handle before the connection exists, so the dispatcher can
    /// hold one while the connection is still being wired up.
    pub fn channel() -> (Self, CommandReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, CommandReceiver(rx))
    }

    fn send(&self, command: Command) {
        if let Err(e) = self.tx.send(command) {
            debug!("Feed connection closed, ignoring {}", e.0.name());
        }
    }

    pub fn heartbeat(&self) {
        self.send(Command::Heartbeat);
    }

    pub fn reconnect(&self) {
        self.send(Command::Reconnect);
    }

    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    pub fn unpause(&self) {
        self.send(Command::Unpause);
    }

    /// Ask the exchange to recalculate the given values (`margin_sym_tBTCUSD`,
    /// `position_tIOTUSD`, ...). Dropped unless the feed is streaming.
    pub fn calc(&self, requests: Vec<String>) {
        self.send(Command::Calc(requests));
    }

    pub fn close(&self) {
        self.send(Command::Close);
    }

    /// Current liveness state, or `None` once the connection has exited.
    pub async fn snapshot(&self) -> Option<LivenessSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(Command::Inspect(tx)).ok()?;
        rx.await.ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl ConnectionControl for FeedHandle {
    fn heartbeat(&self) {
        FeedHandle::heartbeat(self);
    }

    fn reconnect(&self) {
        FeedHandle::reconnect(self);
    }

    fn pause(&self) {
        FeedHandle::pause(self);
    }

    fn unpause(&self) {
        FeedHandle::unpause(self);
    }
}

/// The actor owning transport and liveness timer.
pub struct FeedConnection<T: Transport> {
    transport: T,
    timeout: Duration,
    state: ConnectionState,
    deadline: Option<Instant>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl<T: Transport + 'static> FeedConnection<T> {
    pub fn new(transport: T, timeout: Duration, commands: CommandReceiver) -> Self {
        Self {
            transport,
            timeout,
            state: ConnectionState::Disconnected,
            deadline: None,
            commands: commands.0,
        }
    }

    /// Start the connection on its own task.
    pub fn spawn(transport: T, timeout: Duration, commands: CommandReceiver) -> JoinHandle<()> {
        tokio::spawn(Self::new(transport, timeout, commands).run())
    }

    /// Authenticate, then serve commands and timeouts until closed.
    pub async fn run(mut self) {
        self.start().await;

        loop {
            let deadline = self.deadline;
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(command) => {
                        if !self.handle(command).await {
                            break;
                        }
                    }
                    None => {
                        debug!("All feed handles dropped, closing connection");
                        self.shutdown().await;
                        break;
                    }
                },
                _ = wait_for(deadline) => self.on_timeout().await,
            }
        }

        debug!("Feed connection task finished");
    }

    /// Returns false once the connection is closed.
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Heartbeat => {
                if matches!(self.state, ConnectionState::Paused | ConnectionState::Closed) {
                    debug!("Heartbeat while {:?}, ignoring", self.state);
                } else {
                    self.arm();
                }
            }
            Command::Reconnect => {
                info!("Reconnecting feed");
                self.reconnect().await;
            }
            Command::Pause => {
                info!("Pausing feed until maintenance ends");
                self.transport.close().await;
                self.deadline = None;
                self.state = ConnectionState::Paused;
            }
            Command::Unpause => match self.state {
                ConnectionState::Paused | ConnectionState::Disconnected => {
                    info!("Resuming feed");
                    self.start().await;
                }
                _ => self.arm(),
            },
            Command::Calc(requests) => {
                if self.state == ConnectionState::Streaming {
                    let message = BitfinexAdapter::calc_message(&requests);
                    if let Err(e) = self.transport.send(message).await {
                        warn!("Failed to send calc request: {}", e);
                    }
                } else {
                    debug!("Feed is {:?}, dropping calc request", self.state);
                }
            }
            Command::Inspect(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::Close => {
                self.shutdown().await;
                return false;
            }
        }
        true
    }

    async fn start(&mut self) {
        self.state = ConnectionState::Authenticating;
        match self.transport.open().await {
            Ok(()) => {
                info!("Feed authenticated and streaming");
                self.state = ConnectionState::Streaming;
            }
            Err(e) => {
                // Retried through the timeout path.
                error!("Feed authentication failed: {}", e);
                self.state = ConnectionState::Disconnected;
            }
        }
        self.arm();
    }

    async fn reconnect(&mut self) {
        self.transport.close().await;
        self.start().await;
    }

    async fn on_timeout(&mut self) {
        info!(
            "No heartbeat for {:?}, reconnecting",
            self.timeout
        );
        self.reconnect().await;
    }

    async fn shutdown(&mut self) {
        info!("Closing feed connection");
        self.transport.close().await;
        self.deadline = None;
        self.state = ConnectionState::Closed;
    }

    fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.timeout);
    }

    fn snapshot(&self) -> LivenessSnapshot {
        LivenessSnapshot {
            state: self.state,
            armed: self.deadline.is_some(),
            remaining: self
                .deadline
                .map(|d| d.saturating_duration_since(Instant::now())),
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
