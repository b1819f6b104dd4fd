//! Bounded reassembly of concatenated SMS fragments.
//!
//! Concatenated messages arrive as independent fragments sharing a reference
//! number and sender, possibly out of order, duplicated, or never completed.
//! [`ReassemblyCache`] accumulates them in a fixed-capacity arena: slots are
//! matched by `(reference, sender)`, evicted oldest-first under pressure, and
//! force-flushed after a timeout so no sender can hold a slot forever.

pub mod cache;
pub mod error;
mod slot;

pub use cache::{AssembledSms, ReassemblyCache, SlotId};
pub use error::ReassemblyError;

/// Maximum number of concurrently tracked concatenated messages.
pub const CACHE_CAPACITY: usize = 5;

/// Maximum fragment positions per message; larger declarations are protocol
/// violations and are rejected rather than stored.
pub const MAX_PARTS: usize = 10;

#[cfg(test)]
mod tests;
