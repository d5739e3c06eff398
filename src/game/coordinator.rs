//! Session task: the one place that mutates the shared arena

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::config::RoundConfig;
use crate::ws::protocol::{ClientMsg, PlayerId};

use super::effects::{Effects, Outbound, TimerCommand};
use super::session::{Session, SessionStatus};
use super::timer::{Scheduler, TimerFired};

const COMMAND_CHANNEL_CAPACITY: usize = 1024;
const TIMER_CHANNEL_CAPACITY: usize = 16;

/// Serialized frames queued for one connection
pub type OutboundTx = mpsc::Sender<Arc<str>>;
pub type OutboundRx = mpsc::Receiver<Arc<str>>;

/// Work submitted by connection handlers
#[derive(Debug)]
pub enum SessionCommand {
    Connect { id: PlayerId, outbound: OutboundTx },
    Disconnect { id: PlayerId },
    Client { id: PlayerId, msg: ClientMsg },
}

/// Session task is gone
#[derive(Debug, thiserror::Error)]
#[error("Session task has stopped")]
pub struct SessionClosed;

/// Failure to queue a frame for a connection
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Outbound queue full")]
    QueueFull,

    #[error("Connection closed")]
    Closed,
}

impl<T> From<TrySendError<T>> for DeliveryError {
    fn from(err: TrySendError<T>) -> Self {
        match err {
            TrySendError::Full(_) => DeliveryError::QueueFull,
            TrySendError::Closed(_) => DeliveryError::Closed,
        }
    }
}

/// Cloneable handle used by connection handlers and the health endpoint
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    status: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    pub async fn connect(&self, id: PlayerId, outbound: OutboundTx) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Connect { id, outbound }).await
    }

    pub async fn disconnect(&self, id: PlayerId) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Disconnect { id }).await
    }

    pub async fn submit(&self, id: PlayerId, msg: ClientMsg) -> Result<(), SessionClosed> {
        self.send(SessionCommand::Client { id, msg }).await
    }

    /// Latest published status
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), SessionClosed> {
        self.commands.send(cmd).await.map_err(|_| SessionClosed)
    }
}

/// Owns the [`Session`], the connection table and the round timers.
///
/// Commands and timer ticks are handled strictly one at a time, so every
/// step sees and leaves a consistent registry and round state.
pub struct Coordinator {
    session: Session,
    round_config: RoundConfig,
    commands: mpsc::Receiver<SessionCommand>,
    timer_rx: mpsc::Receiver<TimerFired>,
    scheduler: Scheduler,
    connections: HashMap<PlayerId, OutboundTx>,
    status_tx: watch::Sender<SessionStatus>,
}

impl Coordinator {
    pub fn new(session: Session, round_config: RoundConfig) -> (Self, SessionHandle) {
        let (command_tx, commands) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (timer_tx, timer_rx) = mpsc::channel(TIMER_CHANNEL_CAPACITY);
        let (status_tx, status_rx) = watch::channel(session.status());

        let handle = SessionHandle {
            commands: command_tx,
            status: status_rx,
        };

        let coordinator = Self {
            session,
            round_config,
            commands,
            timer_rx,
            scheduler: Scheduler::new(timer_tx),
            connections: HashMap::new(),
            status_tx,
        };

        (coordinator, handle)
    }

    /// Process commands and timer ticks until every handle is dropped
    pub async fn run(mut self) {
        info!("Session coordinator started");

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                Some(fired) = self.timer_rx.recv() => self.handle_timer(fired),
            }
            self.publish_status();
        }

        self.scheduler.cancel_all();
        info!("Session coordinator stopped");
    }

    fn handle_command(&mut self, cmd: SessionCommand) {
        let fx = match cmd {
            SessionCommand::Connect { id, outbound } => {
                self.connections.insert(id.clone(), outbound);
                self.session.connect(id)
            }
            SessionCommand::Disconnect { id } => {
                self.connections.remove(&id);
                self.session.disconnect(&id)
            }
            SessionCommand::Client { id, msg } => self.session.handle(&id, msg),
        };
        self.apply(fx);
    }

    fn handle_timer(&mut self, fired: TimerFired) {
        if !self.scheduler.accept(fired) {
            debug!(kind = ?fired.kind, generation = fired.generation, "Stale timer tick dropped");
            return;
        }
        let fx = self.session.timer_fired(fired.kind);
        self.apply(fx);
    }

    /// Run timer commands and deliveries; failed connections are disconnected
    /// as follow-up steps.
    fn apply(&mut self, fx: Effects) {
        let mut pending = VecDeque::from([fx]);

        while let Some(fx) = pending.pop_front() {
            for cmd in fx.timers {
                match cmd {
                    TimerCommand::Start(kind) => {
                        self.scheduler.start(kind, kind.schedule(&self.round_config));
                    }
                    TimerCommand::Cancel(kind) => {
                        self.scheduler.cancel(kind);
                    }
                }
            }

            for id in self.deliver(fx.outbound) {
                if self.connections.remove(&id).is_some() {
                    pending.push_back(self.session.disconnect(&id));
                }
            }
        }
    }

    /// Queue each message for its recipients without waiting on any of them
    fn deliver(&self, outbound: Vec<Outbound>) -> Vec<PlayerId> {
        let mut failed: Vec<PlayerId> = Vec::new();

        for out in outbound {
            let text: Arc<str> = match serde_json::to_string(&out.msg) {
                Ok(text) => text.into(),
                Err(e) => {
                    error!(error = %e, "Failed to serialize server message");
                    continue;
                }
            };

            for (id, tx) in &self.connections {
                if !out.to.includes(id) || failed.contains(id) {
                    continue;
                }
                if let Err(e) = tx.try_send(text.clone()) {
                    let err = DeliveryError::from(e);
                    warn!(player_id = %id, error = %err, "Delivery failed, dropping connection");
                    failed.push(id.clone());
                }
            }
        }

        failed
    }

    fn publish_status(&self) {
        let status = self.session.status();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}
