use std::io::ErrorKind;
use std::time::Duration;

use thiserror::Error;

/// Error kinds of the protocol engine.
///
/// `PathRejected` and per-verb filesystem errors stay local to the server
/// and turn into a single response line; `Timeout` and `ConnectionClosed`
/// invalidate the client session.
#[derive(Error, Debug)]
pub enum FtpError {
    #[error("timed out after {0:?} waiting for the peer")]
    Timeout(Duration),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("path rejected: {0}")]
    PathRejected(String),

    #[error("filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("gave up after {0} attempts")]
    RetryExhausted(u32),
}

impl FtpError {
    /// Maps a socket-level I/O error onto the protocol error kinds.
    /// A torn-down peer surfaces as `ConnectionClosed`, everything else
    /// keeps its I/O identity.
    pub fn from_socket(e: std::io::Error) -> Self {
        match e.kind() {
            ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::NotConnected => FtpError::ConnectionClosed,
            _ => FtpError::Filesystem(e),
        }
    }

    /// The single protocol response line the server sends for an error it
    /// handled locally. Never leaks a real filesystem path.
    pub fn to_response(&self) -> String {
        match self {
            FtpError::PathRejected(_) => "Path is outside the shared folder.".to_string(),
            FtpError::Filesystem(_) => "Server filesystem error.".to_string(),
            FtpError::Timeout(_) => "Timed out waiting for data.".to_string(),
            _ => "Server error while processing the command.".to_string(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, FtpError::Timeout(_) | FtpError::ConnectionClosed)
    }
}

pub type Result<T> = std::result::Result<T, FtpError>;
