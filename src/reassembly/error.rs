//! Protocol violations rejected by the reassembly cache.

use thiserror::Error;

/// A fragment whose declared geometry cannot be stored.
///
/// These reject the offending fragment only; the cache and any in-progress
/// slots are untouched.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ReassemblyError {
    /// The message declares more parts than a slot can hold, or none at all.
    #[error("declared part count {total_parts} outside the supported range")]
    TotalPartsOutOfRange {
        /// The declared number of parts.
        total_parts: u8,
    },
    /// The fragment's position falls outside the message's declared range.
    #[error("part index {part_index} outside 1..={total_parts}")]
    PartIndexOutOfRange {
        /// The 1-based position carried by the fragment.
        part_index: u8,
        /// The declared number of parts it must fit within.
        total_parts: u8,
    },
}
