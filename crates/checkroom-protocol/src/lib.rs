//! Wire protocol for checkroom.
//!
//! This crate defines the "language" clients and the server speak:
//!
//! - **Types** ([`ClientIntent`], [`ServerEvent`], [`Color`],
//!   [`SessionId`], ...): the named events that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those events are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while doing so.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientIntent) → Router (sessions)
//! ```

mod codec;
mod error;
mod types;

pub use checkroom_transport::ConnectionId;
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    BoardSnapshot, ClientIntent, Color, ErrorCode, GameResult, MoveApplied,
    MoveDescriptor, ReconnectedState, ServerEvent, SessionId,
};
