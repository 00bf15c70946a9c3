//! Per-connection handler: registration, frame decoding, and the writer.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register an outbound channel with the dispatch loop, which answers
//!      with a `connected` event carrying the connection id
//!   2. Spawn a writer task that encodes events from that channel
//!   3. Loop: receive frames, decode them into intents, hand them over
//!
//! When the loop ends for any reason the disconnect guard tells the
//! dispatch loop, which in turn notifies the opponent.

use std::sync::Arc;
use std::time::Duration;

use checkroom_protocol::{ClientIntent, Codec, ConnectionId, ErrorCode, ServerEvent};
use checkroom_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::CheckroomError;
use crate::dispatch::DispatchHandle;

/// Reports the disconnect when the handler exits, even on an early
/// return or a panic. `Drop` is synchronous, so the send is spawned.
struct DisconnectGuard {
    conn: ConnectionId,
    dispatch: DispatchHandle,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let conn = self.conn;
        let dispatch = self.dispatch.clone();
        tokio::spawn(async move {
            let _ = dispatch.disconnected(conn).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C>(
    conn: WebSocketConnection,
    dispatch: DispatchHandle,
    codec: C,
    idle_timeout: Duration,
) -> Result<(), CheckroomError>
where
    C: Codec + Clone,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let (tx, rx) = mpsc::unbounded_channel();
    dispatch.connected(conn_id, tx.clone()).await?;
    let _guard = DisconnectGuard {
        conn: conn_id,
        dispatch: dispatch.clone(),
    };

    tokio::spawn(write_events(Arc::clone(&conn), codec.clone(), rx));

    loop {
        let data = match tokio::time::timeout(idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection timed out");
                break;
            }
        };

        let intent: ClientIntent = match codec.decode(&data) {
            Ok(intent) => intent,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode intent");
                let _ = tx.send(ServerEvent::Error {
                    code: ErrorCode::BadRequest,
                    message: e.to_string(),
                });
                continue;
            }
        };

        tracing::trace!(%conn_id, intent = intent.name(), "intent received");
        dispatch.intent(conn_id, intent).await?;
    }

    // _guard drops here → disconnect is routed, the dispatch loop drops
    // its sender, and the writer winds down.
    Ok(())
}

/// Drains `rx` onto the socket, then closes it.
async fn write_events<C: Codec>(
    conn: Arc<WebSocketConnection>,
    codec: C,
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
) {
    let conn_id = conn.id();

    while let Some(event) = rx.recv().await {
        let bytes = match codec.encode(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }

    let _ = conn.close().await;
}
