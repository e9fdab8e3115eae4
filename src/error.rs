use std::io;
use std::num::ParseIntError;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueryError>;

/// Broad classification of a [QueryError].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The socket failed: bind, connect, send, receive or an elapsed deadline.
    Transport,
    /// The server answered with something that is not a valid response header.
    Protocol,
    /// The challenge token text could not be parsed.
    Format,
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("failed to bind a local port: {0}")]
    FailedPortBind(#[source] io::Error),

    #[error("unreachable host: {0}")]
    UnreachableHost(#[source] io::Error),

    #[error("failed to send packet: {0}")]
    SendError(#[source] io::Error),

    #[error("failed to receive packet: {0}")]
    ReceiveError(#[source] io::Error),

    #[error("response of {0} bytes is too short to hold a header")]
    ShortResponse(usize),

    #[error("unexpected packet type {got:#04x}, expected {expected:#04x}")]
    UnexpectedPacketType { expected: u8, got: u8 },

    #[error("invalid challenge token {text:?}: {source}")]
    InvalidChallenge {
        text: String,
        #[source]
        source: ParseIntError,
    },

    #[error("challenge token {0} does not fit in 32 bits")]
    ChallengeOutOfRange(i64),
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::FailedPortBind(_)
            | QueryError::UnreachableHost(_)
            | QueryError::SendError(_)
            | QueryError::ReceiveError(_) => ErrorKind::Transport,
            QueryError::ShortResponse(_) | QueryError::UnexpectedPacketType { .. } => {
                ErrorKind::Protocol
            }
            QueryError::InvalidChallenge { .. } | QueryError::ChallengeOutOfRange(_) => {
                ErrorKind::Format
            }
        }
    }

    /// Whether this is a transport error caused by an elapsed deadline.
    pub fn is_timeout(&self) -> bool {
        match self {
            QueryError::FailedPortBind(e)
            | QueryError::UnreachableHost(e)
            | QueryError::SendError(e)
            | QueryError::ReceiveError(e) => e.kind() == io::ErrorKind::TimedOut,
            _ => false,
        }
    }
}
