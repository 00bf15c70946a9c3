//! Dispatch actor: the single task that owns every session.
//!
//! Connection handlers never touch the [`Router`] directly. They send
//! [`Command`]s through a [`DispatchHandle`], and the actor applies them
//! one at a time, so intents on the same session can never interleave.
//! The same loop also wakes up for reaper sweeps.
//!
//! ```text
//! handler ──Command──→ Dispatcher ──ServerEvent──→ per-connection writer
//!                         │
//!                   SweepScheduler
//! ```

use std::collections::HashMap;

use checkroom_protocol::{ClientIntent, ConnectionId, ServerEvent};
use checkroom_sweep::{SweepConfig, SweepInfo, SweepScheduler};
use tokio::sync::{mpsc, oneshot};

use crate::router::{Delivery, Router};
use crate::{CheckroomError, ServerConfig};

/// Outbound channel for one connection. Unbounded so the actor never
/// waits on a slow client.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

pub(crate) enum Command {
    /// A connection was accepted; route its events to `sender`.
    Connected {
        conn: ConnectionId,
        sender: EventSender,
    },

    Intent {
        conn: ConnectionId,
        intent: ClientIntent,
    },

    Disconnected { conn: ConnectionId },

    Stats { reply: oneshot::Sender<DispatchStats> },
}

/// Point-in-time counters from the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub sessions: usize,
    pub connections: usize,
    pub sweeps: u64,
    pub evicted: u64,
}

/// Cheap, cloneable handle to the dispatch actor.
#[derive(Clone)]
pub struct DispatchHandle {
    sender: mpsc::Sender<Command>,
}

impl DispatchHandle {
    /// Registers a connection. The actor answers on `sender` with a
    /// `connected` event before anything else.
    pub async fn connected(
        &self,
        conn: ConnectionId,
        sender: EventSender,
    ) -> Result<(), CheckroomError> {
        self.send(Command::Connected { conn, sender }).await
    }

    /// Routes an intent. Replies arrive on the connection's event channel.
    pub async fn intent(
        &self,
        conn: ConnectionId,
        intent: ClientIntent,
    ) -> Result<(), CheckroomError> {
        self.send(Command::Intent { conn, intent }).await
    }

    pub async fn disconnected(&self, conn: ConnectionId) -> Result<(), CheckroomError> {
        self.send(Command::Disconnected { conn }).await
    }

    pub async fn stats(&self) -> Result<DispatchStats, CheckroomError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stats { reply }).await?;
        rx.await.map_err(|_| CheckroomError::DispatchClosed)
    }

    async fn send(&self, cmd: Command) -> Result<(), CheckroomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| CheckroomError::DispatchClosed)
    }
}

struct Dispatcher {
    router: Router,
    outbound: HashMap<ConnectionId, EventSender>,
    scheduler: SweepScheduler,
    receiver: mpsc::Receiver<Command>,
}

impl Dispatcher {
    /// Runs until every [`DispatchHandle`] is dropped.
    async fn run(mut self) {
        tracing::info!(
            sweep_interval = ?self.scheduler.interval(),
            "dispatch loop started"
        );

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                info = self.scheduler.wait_for_sweep() => self.sweep(info),
            }
        }

        tracing::info!("dispatch loop stopped");
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Connected { conn, sender } => {
                let greeted = sender.send(ServerEvent::Connected {
                    connection_id: conn,
                });
                if greeted.is_err() {
                    tracing::debug!(%conn, "connection gone before registration");
                    return;
                }
                self.outbound.insert(conn, sender);
                tracing::debug!(%conn, connections = self.outbound.len(), "connection registered");
            }
            Command::Intent { conn, intent } => {
                let deliveries = self.router.handle(conn, intent, now());
                self.deliver(deliveries);
            }
            Command::Disconnected { conn } => {
                self.outbound.remove(&conn);
                let deliveries = self.router.disconnect(conn, now());
                self.deliver(deliveries);
            }
            Command::Stats { reply } => {
                let metrics = self.scheduler.metrics();
                let _ = reply.send(DispatchStats {
                    sessions: self.router.store().len(),
                    connections: self.outbound.len(),
                    sweeps: metrics.total_sweeps,
                    evicted: metrics.total_evicted,
                });
            }
        }
    }

    fn sweep(&mut self, info: SweepInfo) {
        let evicted = self.router.sweep(info.at);
        if !evicted.is_empty() {
            tracing::info!(
                sweep = info.sweep,
                evicted = evicted.len(),
                remaining = self.router.store().len(),
                "idle sessions reaped"
            );
        }
        self.scheduler.record_sweep_end(evicted.len());
    }

    fn deliver(&self, deliveries: Vec<Delivery>) {
        for Delivery { to, event } in deliveries {
            let sent = self
                .outbound
                .get(&to)
                .is_some_and(|sender| sender.send(event).is_ok());
            if !sent {
                tracing::warn!(conn = %to, "dropped delivery to a closed connection");
            }
        }
    }
}

/// The router's clock. Read from tokio so paused-time tests move it.
fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

/// Spawns the dispatch actor and returns a handle to it.
pub fn spawn_dispatcher(config: &ServerConfig) -> DispatchHandle {
    let (tx, rx) = mpsc::channel(config.channel_size);

    let actor = Dispatcher {
        router: Router::new(config.idle_threshold, config.reconnect_mode),
        outbound: HashMap::new(),
        scheduler: SweepScheduler::new(SweepConfig {
            interval: config.sweep_interval,
            ..SweepConfig::default()
        }),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    DispatchHandle { sender: tx }
}
