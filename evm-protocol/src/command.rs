//! # Command and Response Sets
//!
//! Every exchange with the engine is one `Command` out, and (for all
//! commands except `Pause`) exactly one `Response` back.

use crate::state::CpuState;
use crate::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A command sent to the execution engine. Sent exactly once per call;
/// there is no implicit retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Bring the engine itself up (runtime, memory map). Answered by `Ready`.
    Init,

    /// Execute a single instruction. Answered by a state snapshot.
    Step,

    /// Execute up to `count` instructions. Answered by a state snapshot.
    Run { count: u32 },

    /// Stop a running burst. No response is defined.
    Pause,

    /// Re-read the reset vector and restart. Answered by a state snapshot.
    Reset,

    /// Report the current register file. Answered by a state snapshot.
    GetState,

    /// Read `size` bytes starting at `addr`. Answered by `Memory`.
    ReadMemory { addr: Address, size: u32 },

    /// Write `data` starting at `addr`. Answered by `Ready`.
    WriteMemory { addr: Address, data: Vec<u8> },

    /// Load one image segment at its absolute address. Answered by `Ready`.
    LoadImage { addr: Address, data: Vec<u8> },
}

impl Command {
    /// Discriminant used for sequencing checks and error text
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Init => CommandKind::Init,
            Command::Step => CommandKind::Step,
            Command::Run { .. } => CommandKind::Run,
            Command::Pause => CommandKind::Pause,
            Command::Reset => CommandKind::Reset,
            Command::GetState => CommandKind::GetState,
            Command::ReadMemory { .. } => CommandKind::ReadMemory,
            Command::WriteMemory { .. } => CommandKind::WriteMemory,
            Command::LoadImage { .. } => CommandKind::LoadImage,
        }
    }

    /// False only for `Pause`, which the engine acknowledges with silence
    pub fn expects_response(&self) -> bool {
        !matches!(self, Command::Pause)
    }
}

/// Command discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    Init,
    Step,
    Run,
    Pause,
    Reset,
    GetState,
    ReadMemory,
    WriteMemory,
    LoadImage,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandKind::Init => "init",
            CommandKind::Step => "step",
            CommandKind::Run => "run",
            CommandKind::Pause => "pause",
            CommandKind::Reset => "reset",
            CommandKind::GetState => "get-state",
            CommandKind::ReadMemory => "read-memory",
            CommandKind::WriteMemory => "write-memory",
            CommandKind::LoadImage => "load-image",
        };
        write!(f, "{name}")
    }
}

/// A response emitted by the execution engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Command accepted and applied
    Ready,

    /// Register file after the command took effect
    State(CpuState),

    /// Bytes read from engine memory
    Memory { addr: Address, data: Vec<u8> },

    /// The command failed inside the engine
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_covers_every_command() {
        let commands = vec![
            Command::Init,
            Command::Step,
            Command::Run { count: 100 },
            Command::Pause,
            Command::Reset,
            Command::GetState,
            Command::ReadMemory { addr: 0, size: 16 },
            Command::WriteMemory { addr: 0, data: vec![1] },
            Command::LoadImage { addr: 0, data: vec![1] },
        ];
        let kinds: Vec<CommandKind> = commands.iter().map(Command::kind).collect();
        assert_eq!(kinds.len(), 9);
        for window in kinds.windows(2) {
            assert_ne!(window[0], window[1]);
        }
    }

    #[test]
    fn test_only_pause_is_fire_and_forget() {
        assert!(!Command::Pause.expects_response());
        assert!(Command::Init.expects_response());
        assert!(Command::Run { count: 1 }.expects_response());
        assert!(Command::WriteMemory {
            addr: 0,
            data: vec![]
        }
        .expects_response());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(CommandKind::GetState.to_string(), "get-state");
        assert_eq!(CommandKind::ReadMemory.to_string(), "read-memory");
        assert_eq!(CommandKind::Init.to_string(), "init");
    }
}
