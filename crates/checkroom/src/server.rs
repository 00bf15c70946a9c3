//! `CheckroomServer` builder and accept loop.
//!
//! This is the entry point for running a checkroom server. It ties the
//! layers together: transport → protocol → dispatch → sessions.

use std::time::Duration;

use checkroom_protocol::JsonCodec;
use checkroom_session::ReconnectMode;
use checkroom_transport::{Transport, WebSocketTransport};

use crate::dispatch::{DispatchHandle, spawn_dispatcher};
use crate::handler::handle_connection;
use crate::{CheckroomError, ServerConfig};

/// Builder for configuring and starting a checkroom server.
///
/// # Example
///
/// ```rust,ignore
/// use checkroom::prelude::*;
///
/// let server = CheckroomServer::builder()
///     .bind("0.0.0.0:3000")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct CheckroomServerBuilder {
    config: ServerConfig,
}

impl CheckroomServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn idle_threshold(mut self, threshold: Duration) -> Self {
        self.config.idle_threshold = threshold;
        self
    }

    pub fn sweep_interval(mut self, interval: Option<Duration>) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    pub fn reconnect_mode(mut self, mode: ReconnectMode) -> Self {
        self.config.reconnect_mode = mode;
        self
    }

    /// Binds the listener and starts the dispatch loop.
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn build(self) -> Result<CheckroomServer, CheckroomError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        let dispatch = spawn_dispatcher(&self.config);

        Ok(CheckroomServer {
            transport,
            dispatch,
            codec: JsonCodec,
            connection_timeout: self.config.connection_timeout,
        })
    }
}

impl Default for CheckroomServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound checkroom server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct CheckroomServer {
    transport: WebSocketTransport,
    dispatch: DispatchHandle,
    codec: JsonCodec,
    connection_timeout: Duration,
}

impl CheckroomServer {
    pub fn builder() -> CheckroomServerBuilder {
        CheckroomServerBuilder::new()
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to the dispatch loop, for inspecting it from outside.
    pub fn dispatch(&self) -> DispatchHandle {
        self.dispatch.clone()
    }

    /// Runs the accept loop, spawning one handler task per connection.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), CheckroomError> {
        tracing::info!(addr = ?self.local_addr().ok(), "checkroom server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let dispatch = self.dispatch.clone();
                    let codec = self.codec;
                    let timeout = self.connection_timeout;
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, dispatch, codec, timeout).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
