//! Per-scan scratch region: one aligned allocation holding every transient
//! buffer a scan needs.
//!
//! Purpose: amortize all per-scan allocation into a single region sized from
//! a database's declared capacities, installed into a caller-owned slot and
//! grown monotonically as further databases raise requirements.
//!
//! # Algorithm
//! 1. Merge the database's requirements into the slot's existing capacities
//!    (field-wise max); an empty slot starts from zero.
//! 2. If anything grew, release the old region, run the carve pass for the
//!    merged capacities, allocate, and stamp the self-describing header plus
//!    the queue back-references and log row tables.
//!
//! # Invariants
//! - The region base is 64-byte aligned and the header sits at offset 0;
//!   `magic` discriminates a live scratch from arbitrary memory.
//! - A scratch is owned by one caller at a time; concurrent scans take one
//!   region each (see [`clone_scratch`]).
//! - Growth never shrinks a capacity: a second database can only raise them.
//! - Failed growth is lossy by design: the previous region is released
//!   before the new allocation is attempted, and on failure the slot is
//!   left empty.

mod layout;

pub use layout::{MatchQueue, NfaContext, QueueMatch, ScratchCaps};

use crate::api::ScratchError;
use crate::db::Database;
use crate::stdx::{fatbit_bytes, mmbit_bytes};
use crate::util::layout::{pod_read, pod_write, AlignedRegion, Pod, Zeroable};

use layout::{carve, required_bytes, ScratchLayout, CAP_FIELDS, DELAY_SLOT_COUNT};

/// Discriminates a live scratch region.
pub const SCRATCH_MAGIC: u64 = 0x6d63_7363_7274_6368;

/// Self-describing header at the region base: identity first, then the
/// total size, then the raw-allocation back-reference, then the capacities
/// the region was carved for.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub(crate) struct ScratchHeader {
    pub magic: u64,
    pub scratch_size: u64,
    /// Address of the raw allocation backing this region; what a foreign
    /// deallocator must be handed.
    pub alloc_base: u64,
    pub caps: [u32; CAP_FIELDS],
    pub _pad: u32,
}
unsafe impl Pod for ScratchHeader {}
unsafe impl Zeroable for ScratchHeader {}

/// An installed per-scan scratch region.
pub struct Scratch {
    region: AlignedRegion,
    caps: ScratchCaps,
    layout: ScratchLayout,
}

impl Scratch {
    fn alloc_from_caps(caps: ScratchCaps) -> Result<Self, ScratchError> {
        let l = carve(&caps);
        let total = required_bytes(&caps);
        debug_assert_eq!(total, l.end + layout::SCRATCH_SLACK_BYTES);

        let mut region =
            AlignedRegion::new_zeroed(total, 64).map_err(|_| ScratchError::NoMem)?;
        debug_assert!((region.as_ptr() as usize).is_multiple_of(64));

        let header = ScratchHeader {
            magic: SCRATCH_MAGIC,
            scratch_size: total as u64,
            alloc_base: region.as_ptr() as u64,
            caps: caps.to_array(),
            _pad: 0,
        };
        pod_write(region.as_mut_slice(), 0, &header);

        let mut scratch = Self { region, caps, layout: l };
        scratch.finalize();
        Ok(scratch)
    }

    /// Stamps the relations that need the region to exist first: queue
    /// back-references and the anchored log row tables.
    fn finalize(&mut self) {
        let base = self.region.as_ptr() as u64;
        for q in self.queues_mut() {
            q.scratch = base;
        }

        let rows = self.caps.anchored_region_len as usize;
        let row_bytes = mmbit_bytes(self.caps.anchored_region_width as usize);
        let row_base = self.layout.am_log_rows;
        let table = self.region.typed_slice_mut::<u64>(self.layout.am_log_table, rows);
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = (row_base + i * row_bytes) as u64;
        }

        let rows = self.caps.anchored_literal_region_len as usize;
        let row_bytes = mmbit_bytes(self.caps.anchored_literal_count as usize);
        let row_base = self.layout.al_log_rows;
        let table = self.region.typed_slice_mut::<u64>(self.layout.al_log_table, rows);
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = (row_base + i * row_bytes) as u64;
        }
    }

    pub(crate) fn header(&self) -> ScratchHeader {
        pod_read(self.region.as_slice(), 0).expect("header present")
    }

    fn magic_ok(&self) -> bool {
        (self.region.as_ptr() as usize).is_multiple_of(64) && self.header().magic == SCRATCH_MAGIC
    }

    /// Capacities this region was carved for.
    pub fn caps(&self) -> &ScratchCaps {
        &self.caps
    }

    /// Total allocation size in bytes.
    pub fn size(&self) -> usize {
        self.region.len()
    }

    pub fn queues(&self) -> &[MatchQueue] {
        self.region.typed_slice(self.layout.queues, self.caps.queue_count as usize)
    }

    pub fn queues_mut(&mut self) -> &mut [MatchQueue] {
        self.region
            .typed_slice_mut(self.layout.queues, self.caps.queue_count as usize)
    }

    pub fn som_store_mut(&mut self) -> &mut [u64] {
        self.region
            .typed_slice_mut(self.layout.som_store, self.caps.som_store_count as usize)
    }

    pub fn som_attempted_store_mut(&mut self) -> &mut [u64] {
        self.region.typed_slice_mut(
            self.layout.som_attempted_store,
            self.caps.som_store_count as usize,
        )
    }

    pub fn delay_slots_mut(&mut self) -> &mut [u8] {
        let bytes = mmbit_bytes(self.caps.delay_count as usize) * DELAY_SLOT_COUNT;
        &mut self.region.as_mut_slice()[self.layout.delay_slots..self.layout.delay_slots + bytes]
    }

    /// One anchored-match log row; rows hold a multibit of match IDs.
    ///
    /// Rows are located through the offset table stamped by `finalize`, the
    /// same indirection the scan runtime uses.
    pub fn anchored_match_log_mut(&mut self, row: usize) -> &mut [u8] {
        let rows = self.caps.anchored_region_len as usize;
        assert!(row < rows);
        let row_bytes = mmbit_bytes(self.caps.anchored_region_width as usize);
        let at = self.region.typed_slice::<u64>(self.layout.am_log_table, rows)[row] as usize;
        &mut self.region.as_mut_slice()[at..at + row_bytes]
    }

    /// One anchored-literal log row, located through its offset table.
    pub fn anchored_literal_log_mut(&mut self, row: usize) -> &mut [u8] {
        let rows = self.caps.anchored_literal_region_len as usize;
        assert!(row < rows);
        let row_bytes = mmbit_bytes(self.caps.anchored_literal_count as usize);
        let at = self.region.typed_slice::<u64>(self.layout.al_log_table, rows)[row] as usize;
        &mut self.region.as_mut_slice()[at..at + row_bytes]
    }

    pub fn catchup_pq_mut(&mut self) -> &mut [QueueMatch] {
        self.region
            .typed_slice_mut(self.layout.catchup_pq, self.caps.queue_count as usize)
    }

    pub fn b_state_mut(&mut self) -> &mut [u8] {
        let at = self.layout.b_state;
        &mut self.region.as_mut_slice()[at..at + self.caps.b_state_size as usize]
    }

    pub fn t_state_mut(&mut self) -> &mut [u8] {
        let at = self.layout.t_state;
        &mut self.region.as_mut_slice()[at..at + self.caps.t_state_size as usize]
    }

    /// Execution context for the non-SOM or SOM engine path.
    pub fn nfa_context_mut(&mut self, som: bool) -> &mut NfaContext {
        let at = if som { self.layout.nfa_context_som } else { self.layout.nfa_context };
        &mut self.region.typed_slice_mut::<NfaContext>(at, 1)[0]
    }

    /// SOM start offsets for one deduper parity.
    pub fn som_start_log_mut(&mut self, parity: usize) -> &mut [u64] {
        self.region
            .typed_slice_mut(self.layout.som_start_log[parity & 1], self.caps.dkey_count as usize)
    }

    pub fn active_queue_bitset_mut(&mut self) -> &mut [u8] {
        let bytes = fatbit_bytes(self.caps.queue_count as usize);
        &mut self.region.as_mut_slice()[self.layout.aqa..self.layout.aqa + bytes]
    }

    pub fn handled_roles_mut(&mut self) -> &mut [u8] {
        let bytes = fatbit_bytes(self.caps.role_count as usize);
        &mut self.region.as_mut_slice()
            [self.layout.handled_roles..self.layout.handled_roles + bytes]
    }

    /// Deduper match log for one parity.
    pub fn deduper_log_mut(&mut self, parity: usize) -> &mut [u8] {
        let bytes = fatbit_bytes(self.caps.dkey_count as usize);
        let at = self.layout.deduper_log[parity & 1];
        &mut self.region.as_mut_slice()[at..at + bytes]
    }

    /// Deduper SOM log for one parity.
    pub fn deduper_som_log_mut(&mut self, parity: usize) -> &mut [u8] {
        let bytes = fatbit_bytes(self.caps.dkey_count as usize);
        let at = self.layout.deduper_som_log[parity & 1];
        &mut self.region.as_mut_slice()[at..at + bytes]
    }

    pub fn som_set_now_mut(&mut self) -> &mut [u8] {
        let bytes = fatbit_bytes(self.caps.som_store_count as usize);
        &mut self.region.as_mut_slice()[self.layout.som_set_now..self.layout.som_set_now + bytes]
    }

    pub fn som_attempted_set_mut(&mut self) -> &mut [u8] {
        let bytes = fatbit_bytes(self.caps.som_store_count as usize);
        &mut self.region.as_mut_slice()
            [self.layout.som_attempted_set..self.layout.som_attempted_set + bytes]
    }

    pub fn side_scratch_mut(&mut self) -> &mut [u8] {
        let at = self.layout.side_scratch;
        &mut self.region.as_mut_slice()[at..at + self.caps.side_scratch_size as usize]
    }

    pub fn full_state_mut(&mut self) -> &mut [u8] {
        let at = self.layout.full_state;
        &mut self.region.as_mut_slice()[at..at + self.caps.full_state_size as usize]
    }
}

/// Installs scratch for `db` into `slot`.
///
/// An existing scratch is reused untouched when its capacities already cover
/// the database; otherwise every capacity is raised to the max of both and
/// the region is reallocated. On allocation failure the slot is left empty
/// (the previous region is already gone -- documented lossy behaviour).
pub fn alloc_scratch(db: &Database, slot: &mut Option<Scratch>) -> Result<(), ScratchError> {
    db.validate()?;

    let mut proto = match slot {
        Some(existing) => {
            if !existing.magic_ok() {
                return Err(ScratchError::Invalid);
            }
            existing.caps
        }
        None => ScratchCaps::default(),
    };

    let mut resize = slot.is_none();
    resize |= proto.merge_db(db);
    if !resize {
        return Ok(());
    }

    // Release the old region before attempting the new one.
    *slot = None;
    *slot = Some(Scratch::alloc_from_caps(proto)?);
    Ok(())
}

/// Allocates a fresh region with the same capacities as `src`.
///
/// The copy shares no storage with the source and starts zeroed; only the
/// layout metadata carries over. This is the supported way to hand each
/// scanning thread its own scratch.
pub fn clone_scratch(src: &Scratch) -> Result<Scratch, ScratchError> {
    if !src.magic_ok() {
        return Err(ScratchError::Invalid);
    }
    // Size from the self-describing header, as a foreign consumer would.
    let caps = ScratchCaps::from_array(src.header().caps);
    Scratch::alloc_from_caps(caps)
}

/// Releases a scratch region. Accepts an empty slot for symmetry with the
/// other operations.
pub fn free_scratch(scratch: Option<Scratch>) -> Result<(), ScratchError> {
    let Some(mut s) = scratch else { return Ok(()) };
    if !s.magic_ok() {
        return Err(ScratchError::Invalid);
    }
    // Wipe the magic so a dangling copy of the header cannot masquerade as
    // live scratch.
    let mut hdr = s.header();
    hdr.magic = 0;
    pod_write(s.region.as_mut_slice(), 0, &hdr);
    Ok(())
}

/// Total size in bytes of an installed scratch region.
pub fn scratch_size(scratch: &Scratch) -> Result<usize, ScratchError> {
    if !scratch.magic_ok() {
        return Err(ScratchError::Invalid);
    }
    Ok(scratch.header().scratch_size as usize)
}
