//! One in-progress concatenated message.

use std::time::{Duration, Instant};

use super::{MAX_PARTS, cache::AssembledSms};
use crate::pdu::DecodedFragment;

/// A reassembly slot: fragment texts indexed by position, plus the identity
/// and age of the message they belong to.
///
/// `first_fragment_time` is set once when the slot is created and never
/// refreshed by later fragments, so slot age measures the whole assembly,
/// not the gap since the latest arrival.
#[derive(Debug)]
pub(crate) struct ConcatSlot {
    reference: u16,
    sender: String,
    timestamp: String,
    total_parts: u8,
    received_count: u8,
    first_fragment_time: Instant,
    fragments: [Option<String>; MAX_PARTS],
}

impl ConcatSlot {
    pub(crate) fn new(fragment: &DecodedFragment, now: Instant) -> Self {
        Self {
            reference: fragment.reference,
            sender: fragment.sender.clone(),
            timestamp: fragment.timestamp.clone(),
            total_parts: fragment.total_parts,
            received_count: 0,
            first_fragment_time: now,
            fragments: std::array::from_fn(|_| None),
        }
    }

    pub(crate) fn matches(&self, reference: u16, sender: &str) -> bool {
        self.reference == reference && self.sender == sender
    }

    pub(crate) fn total_parts(&self) -> u8 { self.total_parts }

    pub(crate) fn sender(&self) -> &str { &self.sender }

    pub(crate) fn first_fragment_time(&self) -> Instant { self.first_fragment_time }

    pub(crate) fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.first_fragment_time)
    }

    /// Store a fragment at its 1-based position. Duplicate delivery
    /// overwrites the text without advancing the completion counter.
    pub(crate) fn store(&mut self, part_index: u8, text: &str) {
        let position = usize::from(part_index - 1);
        if self.fragments[position].is_none() {
            self.received_count += 1;
        }
        self.fragments[position] = Some(text.to_owned());
    }

    pub(crate) fn is_complete(&self) -> bool { self.received_count == self.total_parts }

    /// Concatenate fragments in logical part order. Positions still missing
    /// render as an explicit placeholder so partial assemblies stay
    /// diagnosable instead of silently truncating.
    pub(crate) fn assemble(&self) -> String {
        let mut text = String::new();
        for position in 0..usize::from(self.total_parts) {
            match &self.fragments[position] {
                Some(segment) => text.push_str(segment),
                None => text.push_str(&format!("[missing part {}]", position + 1)),
            }
        }
        text
    }

    pub(crate) fn into_message(self) -> AssembledSms {
        let text = self.assemble();
        AssembledSms {
            sender: self.sender,
            text,
            timestamp: self.timestamp,
        }
    }
}
