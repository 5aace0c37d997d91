//! Protocol errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame codec error: {0}")]
    Codec(#[from] bincode::Error),
}
