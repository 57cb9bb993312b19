//! Errors that end a blackjack session.

use std::io;
use thiserror::Error;

use super::messages::CodecError;
use crate::game::RoundError;

/// Anything that aborts a session, on either end of the connection.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Peer closed or reset the connection
    #[error("peer disconnected")]
    Disconnected,

    /// Peer went quiet for longer than the I/O timeout
    #[error("timed out waiting for peer")]
    TimedOut,

    #[error("I/O error: {0}")]
    Io(io::Error),

    /// Peer sent a frame that doesn't decode
    #[error("invalid frame: {0}")]
    Codec(#[from] CodecError),

    /// Peer sent a frame that's out of order for the round
    #[error("protocol violation: {0}")]
    Round(#[from] RoundError),
}

impl From<io::Error> for SessionError {
    fn from(value: io::Error) -> Self {
        match value.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected => Self::Disconnected,
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Self::TimedOut,
            _ => Self::Io(value),
        }
    }
}

/// Errors a [`Client`](super::client::Client) reports to its caller.
pub type ClientError = SessionError;

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_classification() {
        let classify = |kind| SessionError::from(io::Error::from(kind));
        assert!(matches!(
            classify(io::ErrorKind::UnexpectedEof),
            SessionError::Disconnected
        ));
        assert!(matches!(
            classify(io::ErrorKind::ConnectionReset),
            SessionError::Disconnected
        ));
        assert!(matches!(
            classify(io::ErrorKind::WouldBlock),
            SessionError::TimedOut
        ));
        assert!(matches!(
            classify(io::ErrorKind::TimedOut),
            SessionError::TimedOut
        ));
        assert!(matches!(
            classify(io::ErrorKind::PermissionDenied),
            SessionError::Io(_)
        ));
    }

    #[test]
    fn test_codec_error_display() {
        let error = SessionError::from(CodecError::InvalidResult(7));
        assert_eq!(error.to_string(), "invalid frame: unknown result code 7");
    }
}
