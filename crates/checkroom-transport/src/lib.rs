//! Transport layer for checkroom.
//!
//! The server is written against two traits, [`Transport`] (a listener)
//! and [`Connection`] (one message-oriented socket). The only
//! implementation is WebSocket over `tokio-tungstenite`.
//!
//! # Feature Flags
//!
//! - `websocket` (default): [`WebSocketTransport`]

#![allow(async_fn_in_trait)]

mod error;
mod id;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use id::ConnectionId;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next client and completes its upgrade.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;
}

/// A bidirectional socket that carries whole messages.
///
/// `send` must make progress while another task is parked inside `recv`:
/// the server reads and writes each connection from two tasks.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// The next message, or `Ok(None)` once the peer has closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}
