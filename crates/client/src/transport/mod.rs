//! Transport boundary: an ordered duplex message channel.
//!
//! The session layer only assumes that each `send` is answered by exactly
//! one inbound message, in order; everything else (framing, reconnection
//! policy, encryption) belongs to the transport's owner. Events mirror the
//! lifecycle of any reliable connection: opened, message, error, closed.

use bytes::Bytes;
use thiserror::Error;

pub mod channel;
pub mod framed;

pub use channel::{ChannelPair, ChannelTransport};
pub use framed::{FramedConfig, FramedTransport};

/// Transport level faults surfaced to the session layer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport not connected")]
    NotConnected,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("frame of {size} bytes exceeds limit of {limit}")]
    FrameTooLarge { size: usize, limit: usize },
    #[error("other: {0}")]
    Other(String),
}

/// Events emitted by a transport implementation.
#[derive(Debug)]
pub enum TransportEvent {
    /// The connection is established and ready for the first request.
    Opened,
    /// One complete inbound message.
    Message(Bytes),
    /// A transport-level fault; the connection is no longer usable.
    Error(TransportError),
    /// Orderly or disorderly end of the stream.
    Closed,
}

/// An ordered duplex message channel.
///
/// Implementations deliver inbound messages whole and in order. The session
/// runner calls [`Transport::send`] once per round-trip and then waits on
/// [`Transport::next_event`] for the correlated reply.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Sends one complete message to the peer.
    async fn send(&mut self, payload: Bytes) -> Result<(), TransportError>;

    /// Waits for the next transport event.
    async fn next_event(&mut self) -> TransportEvent;
}
