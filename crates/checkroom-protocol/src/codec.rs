//! Codec trait and implementations for serializing/deserializing frames.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The server never touches JSON directly: it holds something that
//! implements [`Codec`] and asks it to turn a [`ServerEvent`] into bytes
//! or bytes into a [`ClientIntent`].
//!
//! [`JsonCodec`] is the only implementation today, matching what the
//! browser client speaks.
//!
//! [`ServerEvent`]: crate::ServerEvent
//! [`ClientIntent`]: crate::ClientIntent

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or do
    /// not describe a known intent.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use checkroom_protocol::{ClientIntent, Codec, JsonCodec, SessionId};
///
/// let codec = JsonCodec;
/// let intent: ClientIntent = codec
///     .decode(br#"{"event":"sync-request","data":{"sessionId":"ab12cd"}}"#)
///     .unwrap();
/// assert_eq!(
///     intent,
///     ClientIntent::SyncRequest { session_id: SessionId::new("ab12cd") }
/// );
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
