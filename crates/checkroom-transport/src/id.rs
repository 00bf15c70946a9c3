use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Process-wide, so ids stay unique across every listener.
static NEXT: AtomicU64 = AtomicU64::new(1);

/// Transport-level identity of one client connection.
///
/// It changes every time the client reconnects, which is why the session
/// layer needs a reconnection broker on top of it. Serialized as a plain
/// number because clients echo it back verbatim when they reconnect.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next unused id. Never returns 0.
    pub(crate) fn next() -> Self {
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&ConnectionId::new(9)).unwrap();
        assert_eq!(json, "9");

        let back: ConnectionId = serde_json::from_str("9").unwrap();
        assert_eq!(back, ConnectionId::new(9));
    }

    #[test]
    fn test_next_is_unique_and_nonzero() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert_ne!(a, b);
        assert!(a.into_inner() > 0);
    }

    #[test]
    fn test_connection_ids_order_by_allocation() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert!(a < b);
    }
}
