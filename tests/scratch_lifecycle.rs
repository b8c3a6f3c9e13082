//! Scratch allocation, growth, and cloning against real databases.

use proptest::prelude::*;

use mcscan::{
    alloc_scratch, clone_scratch, compile, free_scratch, scratch_size, CompileContext, Database,
    DfaKind, EngineLimits, RawDfa, ScanMode, Scratch,
};
use mcscan::dfa::{DfaState, ALPHABET, TOP};
use mcscan::DEAD_STATE;

fn block_db(limits: EngineLimits) -> Database {
    Database::new(ScanMode::Block, limits, None)
}

fn scenario_limits() -> EngineLimits {
    EngineLimits {
        queue_count: 4,
        dkey_count: 8,
        som_location_count: 16,
        anchored_distance: 32,
        max_safe_anchored_dr_offset: 30,
        ..EngineLimits::default()
    }
}

/// Scenario: the documented capacity set yields a two-row anchored region
/// and a size that is a pure function of the inputs.
#[test]
fn scenario_deterministic_sizing() {
    let db = block_db(scenario_limits());

    let mut a: Option<Scratch> = None;
    alloc_scratch(&db, &mut a).unwrap();
    let a = a.unwrap();
    assert_eq!(a.caps().anchored_region_len, 2);

    let mut b: Option<Scratch> = None;
    alloc_scratch(&db, &mut b).unwrap();
    let b = b.unwrap();

    assert_eq!(scratch_size(&a).unwrap(), scratch_size(&b).unwrap());
    assert_eq!(a.caps(), b.caps());
}

/// Scenario: growing queue_count from 4 to 7 on the same slot keeps every
/// other capacity at least at its first-call value.
#[test]
fn scenario_monotone_queue_growth() {
    let mut slot: Option<Scratch> = None;
    alloc_scratch(&block_db(scenario_limits()), &mut slot).unwrap();
    let before = *slot.as_ref().unwrap().caps();
    assert_eq!(before.queue_count, 4);

    let second = EngineLimits { queue_count: 7, ..EngineLimits::default() };
    alloc_scratch(&block_db(second), &mut slot).unwrap();
    let after = *slot.as_ref().unwrap().caps();

    assert_eq!(after.queue_count, 7);
    assert!(after.dkey_count >= before.dkey_count);
    assert!(after.som_store_count >= before.som_store_count);
    assert!(after.anchored_region_len >= before.anchored_region_len);
    assert!(after.anchored_region_width >= before.anchored_region_width);
    assert!(after.full_state_size >= before.full_state_size);
}

/// Successively raising each capacity always reallocates to a region at
/// least as large, and the reported size tracks the allocation.
#[test]
fn growth_ladder_never_shrinks() {
    let mut slot: Option<Scratch> = None;
    let mut last_size = 0usize;

    let steps = [
        EngineLimits { queue_count: 2, ..EngineLimits::default() },
        EngineLimits { dkey_count: 64, ..EngineLimits::default() },
        EngineLimits { som_location_count: 128, ..EngineLimits::default() },
        EngineLimits { role_count: 300, ..EngineLimits::default() },
        EngineLimits { delay_count: 70, ..EngineLimits::default() },
        EngineLimits { anchored_distance: 100, anchored_matches: 40, ..EngineLimits::default() },
        EngineLimits { state_offsets_end: 512, ..EngineLimits::default() },
        EngineLimits { scratch_state_size: 4096, ..EngineLimits::default() },
        EngineLimits { side_scratch_size: 256, ..EngineLimits::default() },
    ];
    for limits in steps {
        alloc_scratch(&block_db(limits), &mut slot).unwrap();
        let size = scratch_size(slot.as_ref().unwrap()).unwrap();
        assert!(size >= last_size, "scratch shrank to {size} from {last_size}");
        last_size = size;
    }
}

#[test]
fn clone_preserves_metadata_and_isolates_storage() {
    let mut slot: Option<Scratch> = None;
    alloc_scratch(&block_db(scenario_limits()), &mut slot).unwrap();
    let src = slot.as_mut().unwrap();
    src.som_store_mut().fill(7);

    let mut copy = clone_scratch(src).unwrap();
    assert_eq!(copy.caps(), src.caps());
    assert_eq!(scratch_size(&copy).unwrap(), scratch_size(src).unwrap());
    assert!(copy.som_store_mut().iter().all(|&v| v == 0));

    copy.som_store_mut().fill(9);
    assert!(src.som_store_mut().iter().all(|&v| v == 7));

    free_scratch(Some(copy)).unwrap();
    free_scratch(slot.take()).unwrap();
}

/// End to end: compile an automaton, embed it in a database whose declared
/// capacities come from the blob header, and size scratch from it.
#[test]
fn scratch_from_compiled_database() {
    let mut remap = [0u16; ALPHABET + 1];
    remap[b'a' as usize] = 1;
    remap[TOP] = 2;
    let mut start = DfaState::filled(3, 1);
    start.next[1] = 2;
    let mut accept = DfaState::filled(3, 1);
    accept.reports.insert(5);
    let mut raw = RawDfa {
        kind: DfaKind::Callback,
        states: vec![DfaState::filled(3, DEAD_STATE), start, accept],
        start_anchored: 1,
        start_floating: 1,
        alpha_size: 3,
        alpha_remap: remap,
    };
    let compiled = compile(&mut raw, &CompileContext::default()).unwrap();

    let limits = EngineLimits {
        queue_count: 1,
        dkey_count: 1,
        scratch_state_size: compiled.blob.view().nfa_header().scratch_state_size,
        ..EngineLimits::default()
    };
    let db = Database::new(ScanMode::Block, limits, Some(compiled.blob));

    let mut slot: Option<Scratch> = None;
    alloc_scratch(&db, &mut slot).unwrap();
    let s = slot.as_mut().unwrap();
    assert_eq!(s.caps().full_state_size, 1); // one byte of 8-bit DFA state
    assert_eq!(s.queues().len(), 1);
    assert!(db.nfa().is_some());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// The region is at least as large as the sum of its declared field
    /// footprints, and re-running the allocation is deterministic.
    #[test]
    fn prop_size_covers_fields(queues in 0u32..20, dkeys in 0u32..200, som in 0u32..100,
                               roles in 0u32..100, full in 0u32..2048) {
        let limits = EngineLimits {
            queue_count: queues,
            dkey_count: dkeys,
            som_location_count: som,
            role_count: roles,
            scratch_state_size: full,
            ..EngineLimits::default()
        };
        let db = block_db(limits);

        let mut slot: Option<Scratch> = None;
        alloc_scratch(&db, &mut slot).unwrap();
        let s = slot.unwrap();
        let size = scratch_size(&s).unwrap();

        // Lower bound: the raw field bytes, ignoring alignment padding.
        let lower = queues as usize * 32       // queue records
            + som as usize * 16                // som stores (two u64 arrays)
            + dkeys as usize * 16              // som start logs
            + full as usize
            + 2 * 192;                         // the two NFA contexts
        prop_assert!(size >= lower, "size {size} < lower bound {lower}");

        let mut again: Option<Scratch> = None;
        alloc_scratch(&db, &mut again).unwrap();
        prop_assert_eq!(size, scratch_size(&again.unwrap()).unwrap());
    }

    /// Merging databases in any order converges on the field-wise max.
    #[test]
    fn prop_growth_order_independent(qa in 0u32..16, qb in 0u32..16,
                                     da in 0u32..64, db_keys in 0u32..64) {
        let first = EngineLimits { queue_count: qa, dkey_count: da, ..EngineLimits::default() };
        let second = EngineLimits { queue_count: qb, dkey_count: db_keys, ..EngineLimits::default() };

        let mut ab: Option<Scratch> = None;
        alloc_scratch(&block_db(first), &mut ab).unwrap();
        alloc_scratch(&block_db(second), &mut ab).unwrap();

        let mut ba: Option<Scratch> = None;
        alloc_scratch(&block_db(second), &mut ba).unwrap();
        alloc_scratch(&block_db(first), &mut ba).unwrap();

        let (ab, ba) = (ab.unwrap(), ba.unwrap());
        prop_assert_eq!(ab.caps(), ba.caps());
        prop_assert_eq!(scratch_size(&ab).unwrap(), scratch_size(&ba).unwrap());
    }
}
