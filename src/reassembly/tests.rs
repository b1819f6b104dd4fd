use std::time::{Duration, Instant};

use rstest::rstest;

use super::{CACHE_CAPACITY, MAX_PARTS, ReassemblyCache, ReassemblyError, cache::SlotId};
use crate::test_helpers::fragment;

const TIMEOUT: Duration = Duration::from_secs(30);

fn cache() -> ReassemblyCache { ReassemblyCache::new(TIMEOUT) }

#[test]
fn out_of_order_fragments_assemble_in_logical_order() {
    let mut cache = cache();
    let now = Instant::now();

    let slot = cache
        .insert_fragment_at(&fragment(7, "+15550001111", 3, 2, "two "), now)
        .expect("valid fragment");
    assert!(!cache.is_complete(slot));
    cache
        .insert_fragment_at(&fragment(7, "+15550001111", 3, 1, "one "), now)
        .expect("valid fragment");
    let slot = cache
        .insert_fragment_at(&fragment(7, "+15550001111", 3, 3, "three"), now)
        .expect("valid fragment");

    assert!(cache.is_complete(slot));
    let message = cache.take_complete(slot).expect("complete message");
    assert_eq!(message.text, "one two three");
    assert_eq!(message.sender, "+15550001111");
    assert_eq!(cache.active_len(), 0);
}

#[test]
fn duplicate_part_overwrites_without_advancing_completion() {
    let mut cache = cache();
    let now = Instant::now();

    let slot = cache
        .insert_fragment_at(&fragment(4, "+15550001111", 2, 1, "old"), now)
        .expect("valid fragment");
    let slot_again = cache
        .insert_fragment_at(&fragment(4, "+15550001111", 2, 1, "new"), now)
        .expect("duplicate is not an error");

    assert_eq!(slot, slot_again);
    assert!(!cache.is_complete(slot));
    assert_eq!(cache.assemble(slot), Some("new[missing part 2]".to_owned()));

    cache
        .insert_fragment_at(&fragment(4, "+15550001111", 2, 2, "!"), now)
        .expect("valid fragment");
    assert!(cache.is_complete(slot));
    assert_eq!(cache.take_complete(slot).expect("complete").text, "new!");
}

#[test]
fn same_reference_from_different_senders_stays_separate() {
    let mut cache = cache();
    let now = Instant::now();
    let first = cache
        .insert_fragment_at(&fragment(1, "+15550001111", 2, 1, "a"), now)
        .expect("valid fragment");
    let second = cache
        .insert_fragment_at(&fragment(1, "+15550002222", 2, 1, "b"), now)
        .expect("valid fragment");
    assert_ne!(first, second);
    assert_eq!(cache.active_len(), 2);
}

#[test]
fn take_complete_leaves_incomplete_slots_alone() {
    let mut cache = cache();
    let slot = cache
        .insert_fragment_at(&fragment(2, "+15550001111", 2, 1, "a"), Instant::now())
        .expect("valid fragment");
    assert!(cache.take_complete(slot).is_none());
    assert_eq!(cache.active_len(), 1);
}

#[rstest]
#[case::zero_total(0, 1)]
#[case::oversized_total(MAX_PARTS as u8 + 1, 1)]
fn rejects_out_of_range_totals(#[case] total_parts: u8, #[case] part_index: u8) {
    let mut cache = cache();
    let error = cache
        .insert_fragment_at(
            &fragment(5, "+15550001111", total_parts, part_index, "x"),
            Instant::now(),
        )
        .expect_err("geometry violation");
    assert_eq!(error, ReassemblyError::TotalPartsOutOfRange { total_parts });
    assert_eq!(cache.active_len(), 0);
}

#[rstest]
#[case::zero_index(3, 0)]
#[case::beyond_total(3, 4)]
fn rejects_out_of_range_part_indices(#[case] total_parts: u8, #[case] part_index: u8) {
    let mut cache = cache();
    let error = cache
        .insert_fragment_at(
            &fragment(5, "+15550001111", total_parts, part_index, "x"),
            Instant::now(),
        )
        .expect_err("geometry violation");
    assert_eq!(
        error,
        ReassemblyError::PartIndexOutOfRange {
            part_index,
            total_parts,
        }
    );
    assert_eq!(cache.active_len(), 0);
}

#[test]
fn matched_slot_declaration_outranks_the_fragment() {
    let mut cache = cache();
    let now = Instant::now();
    cache
        .insert_fragment_at(&fragment(6, "+15550001111", 3, 1, "a"), now)
        .expect("valid fragment");
    // Same message identity, contradictory geometry: the slot's declared
    // total wins, so part 5 is out of range.
    let error = cache
        .insert_fragment_at(&fragment(6, "+15550001111", 10, 5, "b"), now)
        .expect_err("contradicts the slot's declared total");
    assert_eq!(
        error,
        ReassemblyError::PartIndexOutOfRange {
            part_index: 5,
            total_parts: 3,
        }
    );
}

#[test]
fn sweep_flushes_slots_aged_to_the_timeout() {
    let mut cache = cache();
    let start = Instant::now();
    cache
        .insert_fragment_at(&fragment(8, "+15550001111", 3, 1, "one"), start)
        .expect("valid fragment");
    cache
        .insert_fragment_at(&fragment(8, "+15550001111", 3, 3, "three"), start)
        .expect("valid fragment");

    assert!(cache.sweep_at(start + TIMEOUT - Duration::from_millis(1)).is_empty());

    let flushed = cache.sweep_at(start + TIMEOUT);
    assert_eq!(flushed.len(), 1);
    assert_eq!(flushed[0].text, "one[missing part 2]three");
    assert_eq!(cache.active_len(), 0);
}

#[test]
fn slot_age_runs_from_the_first_fragment() {
    let mut cache = cache();
    let start = Instant::now();
    cache
        .insert_fragment_at(&fragment(8, "+15550001111", 3, 1, "one"), start)
        .expect("valid fragment");
    // A late fragment must not refresh the slot's age.
    cache
        .insert_fragment_at(
            &fragment(8, "+15550001111", 3, 2, "two"),
            start + TIMEOUT - Duration::from_secs(1),
        )
        .expect("valid fragment");
    assert_eq!(cache.sweep_at(start + TIMEOUT).len(), 1);
}

#[test]
fn full_cache_evicts_the_oldest_message() {
    let mut cache = cache();
    let start = Instant::now();
    for reference in 0..CACHE_CAPACITY as u16 {
        let offset = Duration::from_secs(u64::from(reference));
        cache
            .insert_fragment_at(
                &fragment(reference, "+15550001111", 2, 1, "old"),
                start + offset,
            )
            .expect("valid fragment");
    }
    assert_eq!(cache.active_len(), CACHE_CAPACITY);

    // Reference 0 opened its slot earliest, so it is the sacrifice.
    let slot = cache
        .insert_fragment_at(
            &fragment(100, "+15550002222", 2, 1, "fresh"),
            start + Duration::from_secs(10),
        )
        .expect("valid fragment");
    assert_eq!(slot, SlotId::new(0));
    assert_eq!(cache.active_len(), CACHE_CAPACITY);
    assert_eq!(
        cache.assemble(slot),
        Some("fresh[missing part 2]".to_owned())
    );
}

#[test]
fn eviction_ties_break_towards_the_lowest_index() {
    let mut cache = cache();
    let now = Instant::now();
    for reference in 0..CACHE_CAPACITY as u16 {
        cache
            .insert_fragment_at(&fragment(reference, "+15550001111", 2, 1, "x"), now)
            .expect("valid fragment");
    }
    let slot = cache
        .insert_fragment_at(&fragment(100, "+15550002222", 2, 1, "y"), now)
        .expect("valid fragment");
    assert_eq!(slot, SlotId::new(0));
}

#[test]
fn slot_ids_do_not_survive_eviction() {
    let mut cache = cache();
    let start = Instant::now();
    let stale = cache
        .insert_fragment_at(&fragment(0, "+15550001111", 2, 1, "old"), start)
        .expect("valid fragment");
    for reference in 1..CACHE_CAPACITY as u16 {
        cache
            .insert_fragment_at(
                &fragment(reference, "+15550001111", 2, 1, "filler"),
                start + Duration::from_secs(u64::from(reference)),
            )
            .expect("valid fragment");
    }

    // Eviction reuses the stale id's slot for a different message, so an
    // id held across insertions no longer names what it used to.
    let reused = cache
        .insert_fragment_at(
            &fragment(100, "+15550002222", 2, 1, "fresh"),
            start + Duration::from_secs(10),
        )
        .expect("valid fragment");
    assert_eq!(stale, reused);
    assert_eq!(
        cache.assemble(stale),
        Some("fresh[missing part 2]".to_owned())
    );
}

#[test]
fn slot_id_displays_its_index() {
    assert_eq!(SlotId::new(3).to_string(), "3");
    assert_eq!(SlotId::new(3).index(), 3);
}
