//! The event router: the network-facing core.
//!
//! Every client intent goes through [`Router::handle`], which resolves
//! the session, validates against the turn authority or reconnection
//! broker, mutates through the session, and returns the resulting
//! [`Delivery`] list. The router never touches a socket. Delivering is
//! the dispatch loop's job, which keeps everything here synchronous and
//! testable without a runtime.
//!
//! Two delivery shapes exist:
//! - **emit**: to the requester only (errors, sync replies, join acks)
//! - **broadcast**: to every connected member of the session

use std::time::{Duration, Instant};

use checkroom_protocol::{
    ClientIntent, Color, ConnectionId, ReconnectedState, ServerEvent, SessionId,
};
use checkroom_rules::{ChessBoard, RulesEngine};
use checkroom_session::{
    ConnectionRegistry, Reaper, ReconnectClaim, ReconnectMode, ReconnectionBroker, Session,
    SessionError, SessionStore, authority,
};

/// One outbound event addressed to one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub to: ConnectionId,
    pub event: ServerEvent,
}

/// Collects deliveries while a handler runs.
#[derive(Default)]
struct Outbox {
    deliveries: Vec<Delivery>,
}

impl Outbox {
    fn emit(&mut self, to: ConnectionId, event: ServerEvent) {
        self.deliveries.push(Delivery { to, event });
    }

    fn broadcast<E: RulesEngine>(&mut self, session: &Session<E>, event: ServerEvent) {
        for to in session.connected_players() {
            self.emit(to, event.clone());
        }
    }

    /// Emits to `to` only if it holds a slot whose transport is up.
    fn notify<E: RulesEngine>(&mut self, session: &Session<E>, to: ConnectionId, event: ServerEvent) {
        if session.player_info(to).is_some_and(|info| info.connected) {
            self.emit(to, event);
        }
    }
}

pub struct Router<E: RulesEngine = ChessBoard> {
    store: SessionStore<E>,
    registry: ConnectionRegistry,
    broker: ReconnectionBroker,
    reaper: Reaper,
}

impl<E: RulesEngine> Router<E> {
    /// An empty router.
    pub fn new(idle_threshold: Duration, reconnect_mode: ReconnectMode) -> Self {
        Self {
            store: SessionStore::new(),
            registry: ConnectionRegistry::new(),
            broker: ReconnectionBroker::new(reconnect_mode),
            reaper: Reaper::new(idle_threshold),
        }
    }

    pub fn store(&self) -> &SessionStore<E> {
        &self.store
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Handles one intent from `conn`.
    ///
    /// A rejected intent yields a single `error` event for `conn` and
    /// leaves every session untouched.
    pub fn handle(
        &mut self,
        conn: ConnectionId,
        intent: ClientIntent,
        now: Instant,
    ) -> Vec<Delivery> {
        let name = intent.name();
        let mut out = Outbox::default();

        let result = match intent {
            ClientIntent::CreateSession => {
                self.create(conn, now, &mut out);
                Ok(())
            }
            ClientIntent::JoinSession { session_id } => self.join(conn, &session_id, now, &mut out),
            ClientIntent::Move {
                session_id,
                from,
                to,
            } => self.apply_move(conn, &session_id, &from, &to, now, &mut out),
            ClientIntent::Heartbeat { session_id } => self
                .store
                .lookup(&session_id)
                .and_then(|session| session.heartbeat(conn, now)),
            ClientIntent::Reconnect {
                session_id,
                previous_connection_id,
                token,
            } => {
                let claim = ReconnectClaim {
                    previous: previous_connection_id,
                    token: token.as_deref(),
                };
                self.reconnect(conn, &session_id, claim, now, &mut out)
            }
            ClientIntent::OfferDraw { session_id } => {
                self.offer_draw(conn, &session_id, now, &mut out)
            }
            ClientIntent::AcceptDraw { session_id } => {
                self.accept_draw(conn, &session_id, now, &mut out)
            }
            ClientIntent::Resign { session_id } => self.resign(conn, &session_id, now, &mut out),
            ClientIntent::SyncRequest { session_id } => self.sync(conn, &session_id, &mut out),
            ClientIntent::LegalMoves { session_id, square } => {
                self.legal_moves(conn, &session_id, square, &mut out)
            }
        };

        match result {
            Ok(()) => out.deliveries,
            Err(err) => {
                tracing::debug!(%conn, intent = name, error = %err, "intent rejected");
                vec![Delivery {
                    to: conn,
                    event: ServerEvent::Error {
                        code: err.code(),
                        message: err.to_string(),
                    },
                }]
            }
        }
    }

    /// Marks `conn` disconnected in every session it is seated in and
    /// tells each opponent.
    pub fn disconnect(&mut self, conn: ConnectionId, now: Instant) -> Vec<Delivery> {
        let mut out = Outbox::default();
        for session_id in self.registry.release(conn) {
            let Some(session) = self.store.get_mut(&session_id) else {
                continue;
            };
            if let Some(opponent) = session.mark_disconnected(conn, now) {
                out.notify(session, opponent, ServerEvent::OpponentDisconnected);
            }
            tracing::info!(%session_id, %conn, "player disconnected");
        }
        out.deliveries
    }

    /// Evicts idle sessions and returns their ids.
    pub fn sweep(&mut self, now: Instant) -> Vec<SessionId> {
        self.reaper
            .sweep(&mut self.store, now)
            .into_iter()
            .map(|session| {
                self.registry.forget_session(session.id(), session.players());
                session.id().clone()
            })
            .collect()
    }

    // -- Handlers ---------------------------------------------------------

    fn create(&mut self, conn: ConnectionId, now: Instant, out: &mut Outbox) {
        let session = self.store.create(conn, now);
        let session_id = session.id().clone();
        let reconnect_token = session
            .player_info(conn)
            .map(|info| info.reconnect_token.clone())
            .unwrap_or_default();
        self.registry.admit(conn, session_id.clone());

        out.emit(
            conn,
            ServerEvent::SessionCreated {
                session_id,
                color: Color::White,
                reconnect_token,
            },
        );
    }

    fn join(
        &mut self,
        conn: ConnectionId,
        session_id: &SessionId,
        now: Instant,
        out: &mut Outbox,
    ) -> Result<(), SessionError> {
        let session = self.store.lookup(session_id)?;
        let (color, reconnect_token) = session.join(conn, now)?;
        self.registry.admit(conn, session_id.clone());

        out.emit(
            conn,
            ServerEvent::SessionJoined {
                session_id: session_id.clone(),
                color,
                reconnect_token,
            },
        );
        out.broadcast(
            session,
            ServerEvent::GameStart {
                fen: session.board().fen(),
                turn: session.turn(),
            },
        );
        Ok(())
    }

    fn apply_move(
        &mut self,
        conn: ConnectionId,
        session_id: &SessionId,
        from: &str,
        to: &str,
        now: Instant,
        out: &mut Outbox,
    ) -> Result<(), SessionError> {
        let session = self.store.lookup(session_id)?;
        authority::authorize(session, conn)?;
        let applied = session.apply_move(from, to, now)?;

        out.broadcast(session, ServerEvent::MoveApplied(applied));
        if !session.is_finished() {
            if let Some(next) = session.connection_for(session.turn()) {
                out.notify(session, next, ServerEvent::TurnNotice);
            }
        }
        Ok(())
    }

    fn reconnect(
        &mut self,
        conn: ConnectionId,
        session_id: &SessionId,
        claim: ReconnectClaim<'_>,
        now: Instant,
        out: &mut Outbox,
    ) -> Result<(), SessionError> {
        let session = self.store.lookup(session_id)?;
        let rc = self.broker.reconnect(session, conn, claim, now)?;
        self.registry.transfer(rc.previous, conn, session_id);

        out.emit(
            conn,
            ServerEvent::Reconnected(ReconnectedState {
                session_id: session_id.clone(),
                color: rc.color,
                reconnect_token: rc.token,
                board: session.snapshot(),
                finished: session.is_finished(),
                result: session.result(),
            }),
        );
        if let Some(opponent) = rc.opponent {
            out.notify(session, opponent, ServerEvent::OpponentReconnected);
        }
        Ok(())
    }

    fn offer_draw(
        &mut self,
        conn: ConnectionId,
        session_id: &SessionId,
        now: Instant,
        out: &mut Outbox,
    ) -> Result<(), SessionError> {
        let session = self.store.lookup(session_id)?;
        if let Some(opponent) = session.offer_draw(conn, now)? {
            out.notify(session, opponent, ServerEvent::DrawOffered);
        }
        Ok(())
    }

    fn accept_draw(
        &mut self,
        conn: ConnectionId,
        session_id: &SessionId,
        now: Instant,
        out: &mut Outbox,
    ) -> Result<(), SessionError> {
        let session = self.store.lookup(session_id)?;
        session.accept_draw(conn, now)?;
        out.broadcast(session, ServerEvent::DrawAccepted);
        Ok(())
    }

    fn resign(
        &mut self,
        conn: ConnectionId,
        session_id: &SessionId,
        now: Instant,
        out: &mut Outbox,
    ) -> Result<(), SessionError> {
        let session = self.store.lookup(session_id)?;
        let winner = session.resign(conn, now)?;
        out.broadcast(session, ServerEvent::Resigned { winner });
        Ok(())
    }

    fn sync(
        &mut self,
        conn: ConnectionId,
        session_id: &SessionId,
        out: &mut Outbox,
    ) -> Result<(), SessionError> {
        let session = self.store.lookup(session_id)?;
        out.emit(conn, ServerEvent::StateSynced(session.snapshot()));
        Ok(())
    }

    fn legal_moves(
        &mut self,
        conn: ConnectionId,
        session_id: &SessionId,
        square: String,
        out: &mut Outbox,
    ) -> Result<(), SessionError> {
        let session = self.store.lookup(session_id)?;
        let moves = session.legal_moves(conn, &square)?;
        out.emit(conn, ServerEvent::LegalMoves { square, moves });
        Ok(())
    }
}

// =========================================================================
// Tests
// =========================================================================
