//! Fixed-capacity arena of in-progress concatenated messages.

use std::time::{Duration, Instant};

use derive_more::Display;

use super::{CACHE_CAPACITY, MAX_PARTS, ReassemblyError, slot::ConcatSlot};
use crate::pdu::DecodedFragment;

/// Index of a slot in the reassembly arena.
///
/// Only valid until the cache's next insertion or sweep: eviction can reuse
/// the slot for a different message, after which the id refers to that one.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
#[display("{_0}")]
pub struct SlotId(usize);

impl SlotId {
    pub(crate) const fn new(index: usize) -> Self { Self(index) }

    /// Arena index this identifier refers to.
    #[must_use]
    pub const fn index(self) -> usize { self.0 }
}

/// A message handed downstream, either fully assembled or force-flushed
/// with placeholders for the parts that never arrived.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssembledSms {
    /// Originating address.
    pub sender: String,
    /// Message text in logical part order.
    pub text: String,
    /// Service-centre timestamp of the fragment that opened the slot.
    pub timestamp: String,
}

/// Fixed-capacity table of in-progress multi-part messages.
///
/// Capacity pressure never surfaces as an error: when every slot is active,
/// the slot with the oldest `first_fragment_time` is sacrificed for the new
/// message. Methods taking an explicit `now` exist for deterministic tests
/// and callers that co-ordinate sweeps with their own clock; the plain
/// variants read the wall clock.
#[derive(Debug)]
pub struct ReassemblyCache {
    slots: [Option<ConcatSlot>; CACHE_CAPACITY],
    timeout: Duration,
}

impl ReassemblyCache {
    /// Create a cache that force-flushes slots older than `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            timeout,
        }
    }

    /// Insert a fragment using the current time.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError`] when the fragment's declared geometry is
    /// a protocol violation; the cache is untouched in that case.
    pub fn insert_fragment(
        &mut self,
        fragment: &DecodedFragment,
    ) -> Result<SlotId, ReassemblyError> {
        self.insert_fragment_at(fragment, Instant::now())
    }

    /// Insert a fragment using an explicit clock reading.
    ///
    /// Slot resolution order: an active slot matching `(reference, sender)`,
    /// else a free slot, else the oldest active slot is evicted and reused.
    /// Duplicate positions overwrite without advancing the completion count.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::TotalPartsOutOfRange`] for a declared part
    /// count of zero or beyond [`MAX_PARTS`], and
    /// [`ReassemblyError::PartIndexOutOfRange`] when the fragment's position
    /// does not fit the declared range (the matched slot's declaration wins
    /// when they disagree).
    pub fn insert_fragment_at(
        &mut self,
        fragment: &DecodedFragment,
        now: Instant,
    ) -> Result<SlotId, ReassemblyError> {
        if fragment.total_parts == 0 || usize::from(fragment.total_parts) > MAX_PARTS {
            return Err(ReassemblyError::TotalPartsOutOfRange {
                total_parts: fragment.total_parts,
            });
        }
        if fragment.part_index == 0 || fragment.part_index > fragment.total_parts {
            return Err(ReassemblyError::PartIndexOutOfRange {
                part_index: fragment.part_index,
                total_parts: fragment.total_parts,
            });
        }

        let index = self.resolve_index(fragment, now);
        let slot = self.slots[index]
            .as_mut()
            .expect("resolved slot is always populated");
        if fragment.part_index > slot.total_parts() {
            return Err(ReassemblyError::PartIndexOutOfRange {
                part_index: fragment.part_index,
                total_parts: slot.total_parts(),
            });
        }
        slot.store(fragment.part_index, &fragment.text);
        Ok(SlotId::new(index))
    }

    /// Whether the slot has received every declared part.
    #[must_use]
    pub fn is_complete(&self, id: SlotId) -> bool {
        self.slots[id.index()]
            .as_ref()
            .is_some_and(ConcatSlot::is_complete)
    }

    /// Render the slot's current contents in logical part order, or `None`
    /// for a free slot. Missing positions render as `[missing part N]`.
    #[must_use]
    pub fn assemble(&self, id: SlotId) -> Option<String> {
        self.slots[id.index()].as_ref().map(ConcatSlot::assemble)
    }

    /// Free a complete slot and return its assembled message.
    ///
    /// Returns `None` when the slot is free or still incomplete. The id must
    /// come from the insertion that completed the slot; an id held across a
    /// later insertion or sweep may alias a slot reused for a different
    /// message.
    pub fn take_complete(&mut self, id: SlotId) -> Option<AssembledSms> {
        if !self.is_complete(id) {
            return None;
        }
        self.slots[id.index()].take().map(ConcatSlot::into_message)
    }

    /// Force-flush expired slots using the current time.
    pub fn sweep(&mut self) -> Vec<AssembledSms> { self.sweep_at(Instant::now()) }

    /// Force-flush every slot aged at least the concatenation timeout.
    ///
    /// Flushed messages are returned in slot order for the caller to emit
    /// downstream exactly as completed messages; their slots are freed, so
    /// no slot is held forever by a sender that never finishes.
    pub fn sweep_at(&mut self, now: Instant) -> Vec<AssembledSms> {
        let mut flushed = Vec::new();
        for entry in &mut self.slots {
            let expired = entry
                .as_ref()
                .is_some_and(|slot| slot.age(now) >= self.timeout);
            if expired {
                if let Some(slot) = entry.take() {
                    tracing::warn!(
                        sender = slot.sender(),
                        "concatenated message timed out, flushing partial assembly"
                    );
                    flushed.push(slot.into_message());
                }
            }
        }
        flushed
    }

    /// Number of active slots.
    #[must_use]
    pub fn active_len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Find or create the slot for this fragment's message.
    fn resolve_index(&mut self, fragment: &DecodedFragment, now: Instant) -> usize {
        let matched = self.slots.iter().position(|entry| {
            entry
                .as_ref()
                .is_some_and(|slot| slot.matches(fragment.reference, &fragment.sender))
        });
        if let Some(index) = matched {
            return index;
        }

        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .unwrap_or_else(|| self.oldest_index());
        self.slots[index] = Some(ConcatSlot::new(fragment, now));
        index
    }

    /// Index of the active slot with the smallest `first_fragment_time`,
    /// ties broken by the lowest index.
    fn oldest_index(&self) -> usize {
        let oldest = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                entry
                    .as_ref()
                    .map(|slot| (slot.first_fragment_time(), index))
            })
            .min()
            .map(|(_, index)| index)
            .unwrap_or(0);
        tracing::debug!(slot = oldest, "evicting oldest in-progress message");
        oldest
    }
}
