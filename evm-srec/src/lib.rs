//! # S-Record Decoder and Memory Image Builder
//!
//! Decodes Motorola S-record object text into a sparse memory image suitable
//! for pushing to the execution engine segment by segment.
//!
//! ## Key Features
//! - S0/S1/S2/S3 records with 2/3/4-byte addresses, masked to the 24-bit bus
//! - Permissive framing: garbage and mis-sized lines are skipped, not fatal
//! - Strict hex: a non-hex character inside a field is a hard decode error
//! - Optional checksum verification (off by default)
//! - Append semantics for records that continue at the same start address
//! - Separate coalescing pass for callers that want maximal contiguous runs

pub mod coalesce;
pub mod error;
pub mod image;
pub mod record;

pub use coalesce::coalesce;
pub use error::{DecodeError, ImageError};
pub use image::{build_image, LoadStats, MemoryImage};
pub use record::{decode_line, DecodeOptions, Record, RecordKind};

/// Shortest line that can carry a record: sigil, type digit, two count digits
pub const MIN_RECORD_CHARS: usize = 4;
