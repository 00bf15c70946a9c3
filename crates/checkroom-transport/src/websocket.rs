//! WebSocket transport over `tokio-tungstenite`.
//!
//! Events are JSON, so outbound frames go out as text whenever the payload
//! is valid UTF-8, which is what browser clients expect. Inbound text and
//! binary frames are both accepted.

use std::net::SocketAddr;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::{Connection, ConnectionId, Transport, TransportError};

type WsStream = WebSocketStream<TcpStream>;

pub struct WebSocketTransport {
    listener: TcpListener,
}

impl WebSocketTransport {
    /// Binds a listener on `addr`. Port 0 lets the OS choose; read the
    /// result back with [`local_addr`](Self::local_addr).
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        tracing::info!(addr, "websocket listener bound");
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        let (tcp, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Accept)?;

        let ws = tokio_tungstenite::accept_async(tcp)
            .await
            .map_err(TransportError::Upgrade)?;

        let id = ConnectionId::next();
        tracing::debug!(%id, %peer, "websocket upgraded");

        // The reader task parks in `recv` for the connection's whole life;
        // the halves are locked separately so `send` never waits on it.
        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            peer,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

/// One upgraded client socket.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    fn send_error(&self, e: tungstenite::Error) -> TransportError {
        match e {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                TransportError::Closed(self.id.to_string())
            }
            other => TransportError::Send(other),
        }
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::Text(text.to_owned().into()),
            Err(_) => Message::Binary(data.to_vec().into()),
        };
        self.sink
            .lock()
            .await
            .send(msg)
            .await
            .map_err(|e| self.send_error(e))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => return Ok(Some(text.as_bytes().to_vec())),
                Ok(Message::Binary(data)) => return Ok(Some(data.into())),
                Ok(Message::Close(_)) => return Ok(None),
                // tungstenite answers pings itself
                Ok(_) => continue,
                Err(tungstenite::Error::ConnectionClosed) => return Ok(None),
                Err(e) => return Err(TransportError::Receive(e)),
            }
        }
        Ok(None)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| self.send_error(e))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
