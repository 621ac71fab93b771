//! In-process transport pair over tokio channels.
//!
//! Keeps both peers in the same process without touching the network stack.
//! This is primarily used by tests and for loopback runs where the server
//! stub lives in a background task.

use bytes::Bytes;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::{Transport, TransportError, TransportEvent};

/// A pair of connected in-process transports (client and server halves).
pub struct ChannelPair {
    pub client: ChannelTransport,
    pub server: ChannelTransport,
}

impl ChannelPair {
    /// Creates both halves, already connected to each other.
    pub fn new() -> Self {
        let (client_tx, server_rx) = mpsc::unbounded_channel();
        let (server_tx, client_rx) = mpsc::unbounded_channel();
        Self {
            client: ChannelTransport::new(client_tx, client_rx),
            server: ChannelTransport::new(server_tx, server_rx),
        }
    }
}

impl Default for ChannelPair {
    fn default() -> Self {
        Self::new()
    }
}

/// One half of an in-process transport pair.
///
/// Dropping a half closes the connection: the peer observes
/// [`TransportEvent::Closed`] after draining any messages still queued.
pub struct ChannelTransport {
    tx: UnboundedSender<Bytes>,
    rx: UnboundedReceiver<Bytes>,
    opened: bool,
}

impl ChannelTransport {
    fn new(tx: UnboundedSender<Bytes>, rx: UnboundedReceiver<Bytes>) -> Self {
        Self {
            tx,
            rx,
            opened: false,
        }
    }
}

impl std::fmt::Debug for ChannelTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelTransport")
            .field("opened", &self.opened)
            .field("peer_gone", &self.tx.is_closed())
            .finish()
    }
}

impl Transport for ChannelTransport {
    async fn send(&mut self, payload: Bytes) -> Result<(), TransportError> {
        self.tx
            .send(payload)
            .map_err(|_| TransportError::NotConnected)
    }

    async fn next_event(&mut self) -> TransportEvent {
        if !self.opened {
            self.opened = true;
            return TransportEvent::Opened;
        }
        match self.rx.recv().await {
            Some(payload) => TransportEvent::Message(payload),
            None => TransportEvent::Closed,
        }
    }
}
