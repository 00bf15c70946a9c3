//! The session store: every live game, keyed by session id.
//!
//! The store is a plain `HashMap` with no locking. It is owned by the
//! dispatch task and only ever touched from there.

use std::collections::HashMap;
use std::time::Instant;

use checkroom_protocol::{ConnectionId, SessionId};
use checkroom_rules::{ChessBoard, RulesEngine};
use rand::Rng;

use crate::{Session, SessionError};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 6;

/// All live sessions.
///
/// Created empty; sessions enter through [`create`](Self::create) and
/// leave only through [`remove`](Self::remove) (called by the reaper).
pub struct SessionStore<E = ChessBoard> {
    sessions: HashMap<SessionId, Session<E>>,
}

impl<E: RulesEngine> SessionStore<E> {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    /// Opens a new session with `creator` as white.
    ///
    /// The id is redrawn until it names no live session.
    pub fn create(&mut self, creator: ConnectionId, now: Instant) -> &mut Session<E> {
        let mut id = generate_session_id();
        while self.sessions.contains_key(&id) {
            id = generate_session_id();
        }

        tracing::info!(session_id = %id, %creator, "session created");
        self.sessions
            .entry(id.clone())
            .or_insert_with(|| Session::new(id, creator, now))
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session<E>> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut Session<E>> {
        self.sessions.get_mut(id)
    }

    /// Like [`get_mut`](Self::get_mut), but a missing session is an error.
    pub fn lookup(&mut self, id: &SessionId) -> Result<&mut Session<E>, SessionError> {
        self.sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    pub fn remove(&mut self, id: &SessionId) -> Option<Session<E>> {
        self.sessions.remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session<E>> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops every session.
    pub fn clear(&mut self) {
        self.sessions.clear();
    }
}

impl<E: RulesEngine> Default for SessionStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_session_id() -> SessionId {
    let mut rng = rand::rng();
    let id: String = (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect();
    SessionId::new(id)
}
