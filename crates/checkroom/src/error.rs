//! Unified error type for the checkroom server.

use checkroom_protocol::ProtocolError;
use checkroom_rules::RulesError;
use checkroom_session::SessionError;
use checkroom_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// Session and rules errors normally end up on the wire as `error`
/// events and never reach this type; they are here so `?` works in the
/// places that do bubble them up.
#[derive(Debug, thiserror::Error)]
pub enum CheckroomError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Rules(#[from] RulesError),

    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The dispatch loop has stopped; nothing more can be routed.
    #[error("dispatch loop is gone")]
    DispatchClosed,
}
