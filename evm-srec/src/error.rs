//! Decoder and image errors

use thiserror::Error;

/// Hard per-line decode failure. Frame-length mismatches are not errors
/// (those lines are skipped), but corrupt hex inside an otherwise well-framed
/// record must not be silently swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("line {line}: non-hex character in {field} field")]
    BadHex { line: usize, field: &'static str },

    #[error("line {line}: checksum mismatch: declared {declared:#04x}, computed {computed:#04x}")]
    ChecksumMismatch {
        line: usize,
        declared: u8,
        computed: u8,
    },
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("no loadable segments ({decode_errors} lines failed to decode)")]
    NoSegments {
        decode_errors: usize,
        #[source]
        first: DecodeError,
    },
}
