//! # Segment Coalescing
//!
//! Merges a sparse image into maximal contiguous runs. The bring-up path
//! does NOT use this: segments load independently by absolute address, and
//! the overlap tie-break below rewrites byte content. Bulk-upload
//! callers that need one contiguous buffer per region can opt in.
//!
//! Overlap policy: entries are walked in ascending address order; where a
//! later entry overlaps an earlier one, the earlier entry's bytes win for
//! the overlapped prefix and only the tail beyond the current end is taken.
//! An entry fully inside the current run is dropped.

use crate::image::MemoryImage;

/// Merge overlapping and adjacent runs. Idempotent; empty in, empty out.
pub fn coalesce(image: &MemoryImage) -> MemoryImage {
    let mut merged = MemoryImage::new();

    let mut entries = image.entries();
    let Some((first_addr, first_run)) = entries.next() else {
        return merged;
    };

    let mut run_addr = first_addr;
    let mut run: Vec<u8> = first_run.to_vec();

    for (addr, bytes) in entries {
        let run_end = u64::from(run_addr) + run.len() as u64;
        if u64::from(addr) <= run_end {
            let tail_end = u64::from(addr) + bytes.len() as u64;
            if tail_end > run_end {
                let overlap = (run_end - u64::from(addr)) as usize;
                run.extend_from_slice(&bytes[overlap..]);
            }
            // otherwise fully contained: drop it
        } else {
            merged.append(run_addr, &run);
            run_addr = addr;
            run = bytes.to_vec();
        }
    }

    merged.append(run_addr, &run);
    merged
}
