//! Connection registry: which sessions each connection is seated in.
//!
//! Lets the disconnect path go straight to the affected sessions instead
//! of scanning the whole store.

use std::collections::{BTreeSet, HashMap};

use checkroom_protocol::{ConnectionId, SessionId};

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    memberships: HashMap<ConnectionId, BTreeSet<SessionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `conn` holds a slot in `session`.
    pub fn admit(&mut self, conn: ConnectionId, session: SessionId) {
        self.memberships.entry(conn).or_default().insert(session);
    }

    /// Moves `session`'s membership from `old` to `new` after a reconnect.
    pub fn transfer(&mut self, old: ConnectionId, new: ConnectionId, session: &SessionId) {
        if let Some(set) = self.memberships.get_mut(&old) {
            set.remove(session);
            if set.is_empty() {
                self.memberships.remove(&old);
            }
        }
        self.admit(new, session.clone());
    }

    /// Sessions `conn` is seated in, in id order.
    pub fn sessions_of(&self, conn: ConnectionId) -> Vec<SessionId> {
        self.memberships
            .get(&conn)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Forgets `conn` entirely and returns the sessions it was in.
    pub fn release(&mut self, conn: ConnectionId) -> Vec<SessionId> {
        self.memberships
            .remove(&conn)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default()
    }

    /// Drops `session` from each of `players`' memberships.
    pub fn forget_session(&mut self, session: &SessionId, players: &[ConnectionId]) {
        for conn in players {
            if let Some(set) = self.memberships.get_mut(conn) {
                set.remove(session);
                if set.is_empty() {
                    self.memberships.remove(conn);
                }
            }
        }
    }

    /// Number of connections holding at least one slot.
    pub fn len(&self) -> usize {
        self.memberships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memberships.is_empty()
    }
}
