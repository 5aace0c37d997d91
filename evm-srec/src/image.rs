//! # Sparse Memory Image
//!
//! A decoded object file becomes a mapping from start address to byte run.
//! Consecutive records that restate the same start address append to the
//! existing run (assemblers emit those when a section continues past one
//! record's capacity), while new addresses open new runs.

use crate::error::ImageError;
use crate::record::{decode_line, DecodeOptions, RecordKind};
use evm_protocol::Address;
use std::collections::BTreeMap;

/// Sparse address → byte-run mapping, iterated in ascending address order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryImage {
    segments: BTreeMap<Address, Vec<u8>>,
}

impl MemoryImage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` to the run starting at `addr`, creating it if absent
    pub fn append(&mut self, addr: Address, bytes: &[u8]) {
        self.segments.entry(addr).or_default().extend_from_slice(bytes);
    }

    /// The run starting exactly at `addr`, if any
    pub fn segment(&self, addr: Address) -> Option<&[u8]> {
        self.segments.get(&addr).map(Vec::as_slice)
    }

    /// All runs, ascending by start address
    pub fn entries(&self) -> impl Iterator<Item = (Address, &[u8])> {
        self.segments.iter().map(|(addr, run)| (*addr, run.as_slice()))
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn total_bytes(&self) -> usize {
        self.segments.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Aggregate diagnostics from one image build
#[derive(Debug, Clone, Default)]
pub struct LoadStats {
    /// Data records seen (S1/S2/S3, including empty-payload ones)
    pub data_records: usize,

    /// Bytes accumulated into the image
    pub payload_bytes: usize,

    /// Non-blank lines that decoded to nothing (framing, terminators, unknown types)
    pub skipped_lines: usize,

    /// Lines rejected with a hard decode error
    pub decode_errors: usize,

    /// First decode error encountered, for reporting
    pub first_error: Option<crate::error::DecodeError>,

    /// Module name from the S0 header, when present
    pub header_text: Option<String>,
}

/// Fold object text into a memory image.
///
/// Decode errors never abort the walk; they are counted into the stats,
/// unless the text yields no segments at all, in which case the caller gets
/// [`ImageError::NoSegments`] carrying the first failure. Deterministic:
/// identical text and options always produce the identical image.
pub fn build_image(
    text: &str,
    options: &DecodeOptions,
) -> Result<(MemoryImage, LoadStats), ImageError> {
    let mut image = MemoryImage::new();
    let mut stats = LoadStats::default();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        match decode_line(raw, line_no, options) {
            Ok(Some(record)) => {
                if record.kind == RecordKind::Header {
                    if stats.header_text.is_none() {
                        stats.header_text = record.header_text();
                    }
                    continue;
                }
                stats.data_records += 1;
                if record.payload.is_empty() {
                    continue;
                }
                stats.payload_bytes += record.payload.len();
                image.append(record.address, &record.payload);
            }
            Ok(None) => {
                if !raw.trim().is_empty() {
                    stats.skipped_lines += 1;
                }
            }
            Err(err) => {
                stats.decode_errors += 1;
                if stats.first_error.is_none() {
                    stats.first_error = Some(err);
                }
            }
        }
    }

    if image.is_empty() {
        if let Some(first) = stats.first_error.clone() {
            return Err(ImageError::NoSegments {
                decode_errors: stats.decode_errors,
                first,
            });
        }
    }

    tracing::debug!(
        records = stats.data_records,
        bytes = stats.payload_bytes,
        segments = image.segment_count(),
        skipped = stats.skipped_lines,
        errors = stats.decode_errors,
        "decoded object text"
    );

    Ok((image, stats))
}
