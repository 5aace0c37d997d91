//! # CPU Snapshot
//!
//! The engine owns the real CPU state; this type only carries a copy of it
//! across the channel. The single interpretation this core performs is the
//! all-zero reset-vector sentinel check.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot of the 68K register file as reported by the engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuState {
    /// Program counter
    pub pc: u32,

    /// Status register
    pub sr: u16,

    /// Data registers D0-D7
    pub dregs: [u32; 8],

    /// Address registers A0-A7
    pub aregs: [u32; 8],

    /// Supervisor stack pointer
    pub ssp: u32,

    /// User stack pointer
    pub usp: u32,

    /// Master stack pointer
    pub msp: u32,
}

impl CpuState {
    /// True when both the program counter and the supervisor stack pointer
    /// are zero: the signature of an engine that reset over an image with
    /// no populated reset vector.
    pub fn has_zero_vector(&self) -> bool {
        self.pc == 0 && self.ssp == 0
    }
}

impl fmt::Display for CpuState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PC={:#08x}  SR={:#06x}", self.pc, self.sr)?;
        for i in 0..8 {
            writeln!(f, "  D{i}={:#010x}  A{i}={:#010x}", self.dregs[i], self.aregs[i])?;
        }
        write!(
            f,
            "  SSP={:#010x}  USP={:#010x}  MSP={:#010x}",
            self.ssp, self.usp, self.msp
        )
    }
}
