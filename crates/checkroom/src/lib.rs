//! # Checkroom
//!
//! A server that hosts two-player chess games over WebSocket.
//!
//! One player creates a session and gets the white pieces; a second joins
//! with the session id and gets black. From then on the server is the
//! only authority on whose turn it is and which moves are legal. Players
//! whose connection drops can take their seat back from a new
//! connection, and sessions nobody has touched for a day are reaped.
//!
//! ## Layers
//!
//! ```text
//! checkroom-transport  sockets, connection ids
//! checkroom-protocol   intents and events, JSON codec
//! checkroom-rules      move legality, FEN, draw detection
//! checkroom-session    sessions, turn authority, reconnection, reaper policy
//! checkroom-sweep      the reaper's timer
//! checkroom            router, dispatch loop, server
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use checkroom::prelude::*;
//!
//! # async fn start() -> Result<(), CheckroomError> {
//! let server = CheckroomServer::builder()
//!     .config(ServerConfig::from_env()?)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod dispatch;
mod error;
mod handler;
mod router;
mod server;

pub use config::ServerConfig;
pub use dispatch::{DispatchHandle, DispatchStats, EventSender, spawn_dispatcher};
pub use error::CheckroomError;
pub use router::{Delivery, Router};
pub use server::{CheckroomServer, CheckroomServerBuilder};

/// Everything needed to run a server or drive a [`Router`] directly.
pub mod prelude {
    pub use crate::{
        CheckroomError, CheckroomServer, CheckroomServerBuilder, Delivery, DispatchHandle,
        DispatchStats, Router, ServerConfig,
    };
    pub use checkroom_protocol::{
        ClientIntent, Codec, Color, ConnectionId, ErrorCode, GameResult, JsonCodec, ServerEvent,
        SessionId,
    };
    pub use checkroom_rules::{ChessBoard, RulesEngine};
    pub use checkroom_session::ReconnectMode;
}
