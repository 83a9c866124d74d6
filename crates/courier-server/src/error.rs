//! Server error types.

use std::fmt;

use courier_core::BroadcasterError;

/// Errors that can occur in the server.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error
    Config(String),

    /// Transport/network error
    Transport(String),

    /// Protocol error
    Protocol(String),

    /// Broadcaster error
    Broadcaster(BroadcasterError),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Transport(msg) => write!(f, "transport error: {}", msg),
            Self::Protocol(msg) => write!(f, "protocol error: {}", msg),
            Self::Broadcaster(err) => write!(f, "broadcaster error: {}", err),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Broadcaster(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BroadcasterError> for ServerError {
    fn from(err: BroadcasterError) -> Self {
        Self::Broadcaster(err)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<courier_proto::CodecError> for ServerError {
    fn from(err: courier_proto::CodecError) -> Self {
        Self::Protocol(err.to_string())
    }
}
