use std::io;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The TCP accept itself failed.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// A TCP client connected but never completed the WebSocket upgrade.
    #[cfg(feature = "websocket")]
    #[error("websocket upgrade failed: {0}")]
    Upgrade(#[source] tokio_tungstenite::tungstenite::Error),

    /// The peer is gone; carries the connection's display id.
    #[error("connection closed: {0}")]
    Closed(String),

    #[cfg(feature = "websocket")]
    #[error("send failed: {0}")]
    Send(#[source] tokio_tungstenite::tungstenite::Error),

    #[cfg(feature = "websocket")]
    #[error("receive failed: {0}")]
    Receive(#[source] tokio_tungstenite::tungstenite::Error),
}
