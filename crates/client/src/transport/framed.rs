//! Length-prefixed JSON frames over a byte stream.
//!
//! Frame layout:
//! - 4 bytes: payload length (u32, big-endian)
//! - N bytes: UTF-8 JSON payload
//!
//! A maximum frame size guards the receive path against accidental or
//! malicious large allocations.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

use super::{Transport, TransportError, TransportEvent};

/// Default maximum accepted frame size (1 MiB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Sends a raw length-prefixed (u32, big-endian) frame.
pub async fn send_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > u32::MAX as usize {
        return Err(TransportError::FrameTooLarge {
            size: payload.len(),
            limit: u32::MAX as usize,
        });
    }

    let len = (payload.len() as u32).to_be_bytes();
    writer.write_all(&len).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Receives a raw length-prefixed (u32, big-endian) frame.
///
/// Returns `None` on a clean end of stream at a frame boundary. An EOF in
/// the middle of a frame is an error like any other.
pub async fn recv_frame<R>(
    reader: &mut R,
    max_frame_size: usize,
) -> Result<Option<Vec<u8>>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_frame_size {
        return Err(TransportError::FrameTooLarge {
            size: len,
            limit: max_frame_size,
        });
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(Some(buf))
}

/// Receive-side limits for a framed connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramedConfig {
    /// Upper bound for one inbound frame, in bytes.
    pub max_frame_size: usize,
}

impl Default for FramedConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Length-prefixed frames over one byte stream (a TCP connection in
/// production, `tokio::io::duplex` in tests).
///
/// After an error or end of stream the transport latches shut and reports
/// [`TransportEvent::Closed`] from then on.
pub struct FramedTransport<S = TcpStream> {
    stream: S,
    config: FramedConfig,
    opened: bool,
    shut: bool,
}

impl FramedTransport<TcpStream> {
    /// Connects to `addr` with default limits.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream, FramedConfig::default()))
    }
}

impl<S> FramedTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an already-established stream (an accepted connection, or a
    /// duplex half in tests).
    pub fn new(stream: S, config: FramedConfig) -> Self {
        Self {
            stream,
            config,
            opened: false,
            shut: false,
        }
    }
}

impl<S> Transport for FramedTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn send(&mut self, payload: Bytes) -> Result<(), TransportError> {
        if self.shut {
            return Err(TransportError::NotConnected);
        }
        send_frame(&mut self.stream, &payload).await
    }

    async fn next_event(&mut self) -> TransportEvent {
        if !self.opened {
            self.opened = true;
            return TransportEvent::Opened;
        }
        if self.shut {
            return TransportEvent::Closed;
        }
        match recv_frame(&mut self.stream, self.config.max_frame_size).await {
            Ok(Some(buf)) => TransportEvent::Message(Bytes::from(buf)),
            Ok(None) => {
                self.shut = true;
                TransportEvent::Closed
            }
            Err(err) => {
                self.shut = true;
                TransportEvent::Error(err)
            }
        }
    }
}
