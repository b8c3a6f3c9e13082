//! Capacity model and carve pass for the scratch region.
//!
//! Sizing and placement are one algorithm run twice: the carve computes every
//! sub-buffer's offset from a running cursor, and the final cursor value is
//! the allocation size. Keeping them the same code path is what makes
//! `scratch_size` a deterministic function of the capacities.
//!
//! # Invariants
//! - Offsets are stored at rest; pointers materialize only in accessors.
//! - Each sub-buffer honours its element alignment: 8 for `u64` arrays and
//!   offset tables, 16 for the sidecar area, 64 for the NFA contexts and the
//!   full-state area.
//! - The carve is monotone: raising any capacity never moves an earlier
//!   field and never shrinks a later one.

use crate::db::Database;
use crate::stdx::{fatbit_bytes, mmbit_bytes};
use crate::util::layout::{align_up, Pod, Zeroable};

/// Delay slots are bucketed by distance; one multibit per bucket.
pub(crate) const DELAY_SLOT_COUNT: usize = 32;

/// Per-engine execution queue record.
///
/// Lives inside the scratch region as a flat array. The `scratch` field is
/// the back-reference to the owning region's base address, stamped during
/// the finalization pass; it lets a queue handed to an engine find the rest
/// of the per-scan storage.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MatchQueue {
    pub scratch: u64,
    /// Stream offset of item zero.
    pub offset: u64,
    pub cur: u32,
    pub end: u32,
    /// Database-relative offset of the engine this queue drives.
    pub engine_offset: u32,
    pub _pad: u32,
}
unsafe impl Pod for MatchQueue {}
unsafe impl Zeroable for MatchQueue {}

/// Catch-up priority queue entry: the next match location per live queue.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueMatch {
    pub loc: u64,
    pub queue: u32,
    pub _pad: u32,
}
unsafe impl Pod for QueueMatch {}
unsafe impl Zeroable for QueueMatch {}

/// Execution context handed to a 512-bit engine: current and cached state
/// vectors plus callback plumbing. Cache-line aligned so two scratches in a
/// pool never share a line.
#[repr(C, align(64))]
#[derive(Clone, Copy, Debug)]
pub struct NfaContext {
    pub state: [u8; 64],
    pub cached_succ: [u8; 64],
    pub callback_offset: u64,
    pub events: u64,
    _pad: [u8; 48],
}
unsafe impl Pod for NfaContext {}
unsafe impl Zeroable for NfaContext {}

const _: () = {
    assert!(core::mem::size_of::<MatchQueue>() == 32);
    assert!(core::mem::size_of::<QueueMatch>() == 16);
    assert!(core::mem::size_of::<NfaContext>() % 64 == 0);
};

/// The capacities a scratch region was sized for.
///
/// This is the "proto" the original keeps in the scratch header: growth
/// takes the field-wise max of the existing capacities and a database's
/// requirements, so a region serving several databases is sized for all of
/// them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScratchCaps {
    pub queue_count: u32,
    pub dkey_count: u32,
    pub som_store_count: u32,
    pub role_count: u32,
    pub delay_count: u32,
    pub anchored_region_len: u32,
    pub anchored_region_width: u32,
    pub anchored_literal_region_len: u32,
    pub anchored_literal_count: u32,
    pub b_state_size: u32,
    pub t_state_size: u32,
    pub full_state_size: u32,
    pub side_scratch_size: u32,
}

pub(crate) const CAP_FIELDS: usize = 13;

impl ScratchCaps {
    /// Raises every capacity to cover `db`, returning whether anything grew.
    pub(crate) fn merge_db(&mut self, db: &Database) -> bool {
        let mut resize = false;
        let mut raise = |slot: &mut u32, need: u32| {
            if need > *slot {
                *slot = need;
                resize = true;
            }
        };

        raise(&mut self.queue_count, db.limits.queue_count);
        raise(&mut self.dkey_count, db.limits.dkey_count);
        raise(&mut self.som_store_count, db.limits.som_location_count);
        raise(&mut self.role_count, db.limits.role_count);
        raise(&mut self.delay_count, db.limits.delay_count);
        raise(&mut self.anchored_region_len, db.anchored_region_len());
        raise(&mut self.anchored_region_width, db.limits.anchored_matches);
        raise(&mut self.anchored_literal_region_len, db.limits.anchored_distance);
        raise(&mut self.anchored_literal_count, db.limits.anchored_count);
        raise(&mut self.b_state_size, db.b_state_size());
        raise(&mut self.t_state_size, db.limits.t_state_size);
        raise(&mut self.full_state_size, db.limits.scratch_state_size);
        raise(&mut self.side_scratch_size, db.limits.side_scratch_size);
        resize
    }

    pub(crate) fn to_array(self) -> [u32; CAP_FIELDS] {
        [
            self.queue_count,
            self.dkey_count,
            self.som_store_count,
            self.role_count,
            self.delay_count,
            self.anchored_region_len,
            self.anchored_region_width,
            self.anchored_literal_region_len,
            self.anchored_literal_count,
            self.b_state_size,
            self.t_state_size,
            self.full_state_size,
            self.side_scratch_size,
        ]
    }

    pub(crate) fn from_array(a: [u32; CAP_FIELDS]) -> Self {
        Self {
            queue_count: a[0],
            dkey_count: a[1],
            som_store_count: a[2],
            role_count: a[3],
            delay_count: a[4],
            anchored_region_len: a[5],
            anchored_region_width: a[6],
            anchored_literal_region_len: a[7],
            anchored_literal_count: a[8],
            b_state_size: a[9],
            t_state_size: a[10],
            full_state_size: a[11],
            side_scratch_size: a[12],
        }
    }
}

/// Carved offsets of every sub-buffer, relative to the region base.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct ScratchLayout {
    pub queues: usize,
    pub som_store: usize,
    pub som_attempted_store: usize,
    pub delay_slots: usize,
    /// Offset table (u64 per row), then the rows themselves.
    pub am_log_table: usize,
    pub am_log_rows: usize,
    pub al_log_table: usize,
    pub al_log_rows: usize,
    pub catchup_pq: usize,
    pub b_state: usize,
    pub t_state: usize,
    pub nfa_context: usize,
    pub nfa_context_som: usize,
    pub som_start_log: [usize; 2],
    pub aqa: usize,
    pub handled_roles: usize,
    pub deduper_log: [usize; 2],
    pub deduper_som_log: [usize; 2],
    pub som_set_now: usize,
    pub som_attempted_set: usize,
    pub side_scratch: usize,
    pub full_state: usize,
    /// One past the last carved byte.
    pub end: usize,
}

pub(crate) const SCRATCH_HEADER_BYTES: usize = core::mem::size_of::<super::ScratchHeader>();

/// Alignment slack added to every allocation.
pub(crate) const SCRATCH_SLACK_BYTES: usize = 256;

/// Runs the carve for `caps`, assigning each sub-buffer in a fixed order
/// with its minimum alignment.
pub(crate) fn carve(caps: &ScratchCaps) -> ScratchLayout {
    let mut l = ScratchLayout::default();
    let mut cur = SCRATCH_HEADER_BYTES;

    let take = |cur: &mut usize, bytes: usize, align: usize| -> usize {
        *cur = align_up(*cur, align);
        let at = *cur;
        *cur += bytes;
        at
    };

    l.queues = take(
        &mut cur,
        caps.queue_count as usize * core::mem::size_of::<MatchQueue>(),
        8,
    );

    l.som_store = take(&mut cur, caps.som_store_count as usize * 8, 8);
    l.som_attempted_store = take(&mut cur, caps.som_store_count as usize * 8, 8);

    l.delay_slots = take(
        &mut cur,
        mmbit_bytes(caps.delay_count as usize) * DELAY_SLOT_COUNT,
        1,
    );

    let am_rows = caps.anchored_region_len as usize;
    let am_row_bytes = mmbit_bytes(caps.anchored_region_width as usize);
    l.am_log_table = take(&mut cur, am_rows * 8, 8);
    l.am_log_rows = take(&mut cur, am_rows * am_row_bytes, 1);

    let al_rows = caps.anchored_literal_region_len as usize;
    let al_row_bytes = mmbit_bytes(caps.anchored_literal_count as usize);
    l.al_log_table = take(&mut cur, al_rows * 8, 8);
    l.al_log_rows = take(&mut cur, al_rows * al_row_bytes, 1);

    l.catchup_pq = take(
        &mut cur,
        caps.queue_count as usize * core::mem::size_of::<QueueMatch>(),
        8,
    );

    l.b_state = take(&mut cur, caps.b_state_size as usize, 1);
    l.t_state = take(&mut cur, caps.t_state_size as usize, 1);

    l.nfa_context = take(&mut cur, core::mem::size_of::<NfaContext>(), 64);
    l.nfa_context_som = take(&mut cur, core::mem::size_of::<NfaContext>(), 64);

    l.som_start_log[0] = take(&mut cur, caps.dkey_count as usize * 8, 8);
    l.som_start_log[1] = take(&mut cur, caps.dkey_count as usize * 8, 8);

    l.aqa = take(&mut cur, fatbit_bytes(caps.queue_count as usize), 8);
    l.handled_roles = take(&mut cur, fatbit_bytes(caps.role_count as usize), 8);
    l.deduper_log[0] = take(&mut cur, fatbit_bytes(caps.dkey_count as usize), 8);
    l.deduper_log[1] = take(&mut cur, fatbit_bytes(caps.dkey_count as usize), 8);
    l.deduper_som_log[0] = take(&mut cur, fatbit_bytes(caps.dkey_count as usize), 8);
    l.deduper_som_log[1] = take(&mut cur, fatbit_bytes(caps.dkey_count as usize), 8);
    l.som_set_now = take(&mut cur, fatbit_bytes(caps.som_store_count as usize), 8);
    l.som_attempted_set = take(&mut cur, fatbit_bytes(caps.som_store_count as usize), 8);

    l.side_scratch = take(&mut cur, caps.side_scratch_size as usize, 16);

    l.full_state = take(&mut cur, caps.full_state_size as usize, 64);

    l.end = cur;
    l
}

/// Total allocation size for `caps`: the carve extent plus alignment slack.
pub(crate) fn required_bytes(caps: &ScratchCaps) -> usize {
    carve(caps).end + SCRATCH_SLACK_BYTES
}
