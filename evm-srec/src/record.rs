//! # S-Record Line Decoder
//!
//! One line of object text decodes to at most one [`Record`]. Framing is
//! permissive (blank lines, comments, truncated lines, and unknown record
//! types all decode to `None`), but a well-framed record with corrupt hex
//! inside a field is a hard [`DecodeError`].
//!
//! ```text
//! S214400000FFFF00004E714E71...9B
//! ││ │ └ address (2/3/4 bytes by type)  └ payload, then 1 checksum byte
//! ││ └ byte count: everything after itself, in bytes
//! │└ type digit
//! └ sigil
//! ```

use crate::error::DecodeError;
use crate::MIN_RECORD_CHARS;
use evm_protocol::{mask_address, Address};

/// Address-width class of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// S0: module header, 2-byte (unused) address, ASCII payload
    Header,
    /// S1: data with a 16-bit address
    Data16,
    /// S2: data with a 24-bit address
    Data24,
    /// S3: data with a 32-bit address, masked to the 24-bit bus
    Data32,
}

impl RecordKind {
    /// Width of the address field in bytes
    pub const fn address_bytes(self) -> usize {
        match self {
            RecordKind::Header | RecordKind::Data16 => 2,
            RecordKind::Data24 => 3,
            RecordKind::Data32 => 4,
        }
    }

    /// True for the kinds that contribute bytes to the memory image
    pub const fn is_data(self) -> bool {
        !matches!(self, RecordKind::Header)
    }
}

/// One decoded line of object text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub kind: RecordKind,
    /// Start address, already masked to 24 bits
    pub address: Address,
    pub payload: Vec<u8>,
    /// Declared checksum byte; verified only in strict mode
    pub checksum: u8,
}

impl Record {
    /// ASCII module name carried by a header record
    pub fn header_text(&self) -> Option<String> {
        if self.kind != RecordKind::Header {
            return None;
        }
        let text = String::from_utf8_lossy(&self.payload);
        Some(text.trim_end_matches('\0').trim_end().to_string())
    }
}

/// Decoder knobs
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    /// Reject records whose declared checksum disagrees with the computed one
    pub verify_checksums: bool,
}

/// Checksum over a record's count, address, and payload bytes: one's
/// complement of the low byte of their sum.
pub fn record_checksum(byte_count: u8, address: &[u8], payload: &[u8]) -> u8 {
    let sum = address
        .iter()
        .chain(payload.iter())
        .fold(u32::from(byte_count), |acc, b| acc + u32::from(*b));
    !(sum as u8)
}

/// Decode one line of object text.
///
/// Returns `Ok(None)` for anything that is not a data or header record:
/// blank lines, lines without the sigil, frame-length mismatches,
/// termination records (S7/S8/S9), and unknown types. Returns an error only
/// for a well-framed record with a non-hex field or (in strict mode) a bad
/// checksum.
pub fn decode_line(
    line: &str,
    line_no: usize,
    options: &DecodeOptions,
) -> Result<Option<Record>, DecodeError> {
    let line = line.trim();
    if !line.starts_with('S') || line.len() < MIN_RECORD_CHARS {
        return Ok(None);
    }
    if !line.is_ascii() {
        return Err(DecodeError::BadHex {
            line: line_no,
            field: "record",
        });
    }

    // The count is part of the frame: an unreadable count is a framing
    // failure, not a field error.
    let count_hex = &line[2..4];
    if !count_hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Ok(None);
    }
    let byte_count = match u8::from_str_radix(count_hex, 16) {
        Ok(n) => n as usize,
        Err(_) => return Ok(None),
    };
    if byte_count * 2 + 4 != line.len() {
        return Ok(None);
    }

    let kind = match &line[0..2] {
        "S0" => RecordKind::Header,
        "S1" => RecordKind::Data16,
        "S2" => RecordKind::Data24,
        "S3" => RecordKind::Data32,
        // termination carries no memory semantics
        "S7" | "S8" | "S9" => return Ok(None),
        _ => return Ok(None),
    };

    let addr_len = kind.address_bytes();
    let Some(payload_len) = byte_count.checked_sub(addr_len + 1) else {
        return Ok(None);
    };

    let fields = &line[4..];
    let address_bytes = parse_hex_field(&fields[..addr_len * 2], line_no, "address")?;
    let payload = parse_hex_field(
        &fields[addr_len * 2..(addr_len + payload_len) * 2],
        line_no,
        "payload",
    )?;
    let checksum_at = (addr_len + payload_len) * 2;
    let checksum =
        parse_hex_field(&fields[checksum_at..checksum_at + 2], line_no, "checksum")?[0];

    if options.verify_checksums {
        let computed = record_checksum(byte_count as u8, &address_bytes, &payload);
        if computed != checksum {
            return Err(DecodeError::ChecksumMismatch {
                line: line_no,
                declared: checksum,
                computed,
            });
        }
    }

    let raw_address = address_bytes
        .iter()
        .fold(0u32, |acc, b| (acc << 8) | u32::from(*b));

    Ok(Some(Record {
        kind,
        address: mask_address(raw_address),
        payload,
        checksum,
    }))
}

fn parse_hex_field(
    hex: &str,
    line_no: usize,
    field: &'static str,
) -> Result<Vec<u8>, DecodeError> {
    // from_str_radix tolerates a leading sign, so gate on hex digits first
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(DecodeError::BadHex {
            line: line_no,
            field,
        });
    }
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for i in (0..hex.len()).step_by(2) {
        let byte = u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| DecodeError::BadHex {
            line: line_no,
            field,
        })?;
        bytes.push(byte);
    }
    Ok(bytes)
}
