use orrery_protocol::CommandError;
use thiserror::Error;

use crate::transport::TransportError;

/// Why a session ended.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A structurally required operation was rejected or its reply could
    /// not be decoded.
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The connection ended while the session still had work to do.
    #[error("connection closed")]
    ConnectionClosed,

    /// The machine was resumed out of step: a response was supplied when
    /// none was pending, or withheld when one was required.
    #[error("session resumed out of step: {0}")]
    OutOfStep(&'static str),
}

impl SessionError {
    /// True when the cause was a server-side rejection rather than a local
    /// or transport fault.
    pub fn is_rejection(&self) -> bool {
        matches!(self, SessionError::Command(err) if err.is_rejection())
    }
}
