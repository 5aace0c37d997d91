//! Channel and session errors

use evm_protocol::CommandKind;
use evm_srec::ImageError;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a transport implementation
#[derive(Debug, Clone, Error)]
#[error("transport failure: {0}")]
pub struct TransportError(pub String);

/// Failure surfaced to the caller of a channel operation
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("no {kind} response within {timeout:?}")]
    Timeout { kind: CommandKind, timeout: Duration },

    #[error("engine error: {message}")]
    Engine { message: String },

    #[error("a {kind} request is already in flight")]
    SequenceViolation { kind: CommandKind },

    #[error("{kind} has no response defined; post it instead")]
    NoResponseDefined { kind: CommandKind },

    #[error("channel is closed")]
    Closed,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failure reported by the byte source collaborator
#[derive(Debug, Clone, Error)]
#[error("image source failure: {0}")]
pub struct SourceError(pub String);

/// Failure surfaced to the caller of a session operation
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("cannot {operation} while {status}")]
    BadState {
        operation: &'static str,
        status: crate::session::LifecycleStatus,
    },

    #[error("engine sent an unexpected response (wanted {expected})")]
    UnexpectedResponse { expected: &'static str },
}

pub type Result<T> = std::result::Result<T, SessionError>;
