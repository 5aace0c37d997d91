//! # Request Correlation Frames
//!
//! Every command carries a monotonically increasing `RequestId`, and every
//! response echoes the id of the command it answers. Pending-request tables
//! are keyed by id alone, never by command type or payload.

use crate::command::{Command, Response};
use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonic per-channel request identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(u64);

impl RequestId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One command, tagged with the id its response must echo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandFrame {
    pub id: RequestId,
    pub command: Command,
}

/// One response, tagged with the id of the command it answers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFrame {
    pub id: RequestId,
    pub response: Response,
}

/// Serialize a command frame for a byte-oriented transport
pub fn encode_command(frame: &CommandFrame) -> Result<Vec<u8>, ProtocolError> {
    Ok(bincode::serialize(frame)?)
}

/// Deserialize a command frame received from a byte-oriented transport
pub fn decode_command(bytes: &[u8]) -> Result<CommandFrame, ProtocolError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Serialize a response frame for a byte-oriented transport
pub fn encode_response(frame: &ResponseFrame) -> Result<Vec<u8>, ProtocolError> {
    Ok(bincode::serialize(frame)?)
}

/// Deserialize a response frame received from a byte-oriented transport
pub fn decode_response(bytes: &[u8]) -> Result<ResponseFrame, ProtocolError> {
    Ok(bincode::deserialize(bytes)?)
}
