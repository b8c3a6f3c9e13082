//! McClellan bytecode: lowering a raw DFA into a packed, scan-ready blob.
//!
//! Purpose: compile a [`RawDfa`] into a single contiguous, 64-byte-aligned
//! byte region holding the fixed headers, the transition table, per-state
//! aux records, the deduplicated report-list pool, the acceleration
//! descriptor pool, and (16-bit encoding only) the Sherman region of
//! delta-compressed states.
//!
//! # Algorithm
//! 1. Validate the raw automaton and strip redundant EOD reports
//!    (non-streaming compiles only).
//! 2. Pick the encoding: 8-bit cells when permitted and the automaton has at
//!    most 256 states, else 16-bit cells.
//! 3. Run the daddy pass (`sherman`), then acceleration analysis (`accel`),
//!    then allocate implementation state IDs so ID ranges double as scan-time
//!    predicates.
//! 4. Size every section, allocate the blob, and fill it in one pass.
//! 5. Revisit every 16-bit transition cell and OR in the accept/accel flags
//!    derived from the target's aux record.
//!
//! # Invariants
//! - The dead state's implementation ID is 0 in both encodings.
//! - All stored offsets are relative to the blob origin.
//! - 16-bit cells reserve their two high bits for flags; implementation IDs
//!   fit [`STATE_MASK`], and exceeding it fails the compile.
//! - A Sherman state's daddy is never itself a Sherman state, so scan-time
//!   fallback needs exactly one indirection.

pub mod accel;
mod compile;
mod sherman;

use crate::api::{CompileContext, CompileError, ReportId, StateId};
use crate::dfa::RawDfa;
use crate::util::layout::{pod_read, AlignedRegion, Pod, Zeroable};

pub use accel::AccelScheme;

/// Blob kind tag: 8-bit transition cells.
pub const MCCLELLAN_NFA_8: u32 = 1;
/// Blob kind tag: 16-bit transition cells.
pub const MCCLELLAN_NFA_16: u32 = 2;

/// NFA header flag: some state fires EOD-only reports.
pub const NFA_ACCEPTS_EOD: u32 = 1;

/// McClellan flag: every non-EOD accept in the automaton fires the same
/// single report, recorded in `arb_report`.
pub const MCCLELLAN_FLAG_SINGLE: u8 = 1;

/// Accept flag bit in 16-bit transition cells.
pub const ACCEPT_FLAG: u16 = 0x8000;
/// Acceleration flag bit in 16-bit transition cells.
pub const ACCEL_FLAG: u16 = 0x4000;
/// Mask isolating the state ID in a 16-bit transition cell.
pub const STATE_MASK: u16 = 0x3fff;

/// Hard ceiling on raw state count (IDs are `u16`).
pub const MAX_STATE_COUNT: usize = 1 << 16;

/// Tag byte of a Sherman region row.
pub const SHERMAN_STATE: u8 = 1;
/// Fixed byte size of a Sherman region row.
pub const SHERMAN_FIXED_SIZE: usize = 32;
pub(crate) const SHERMAN_TYPE_OFFSET: usize = 0;
pub(crate) const SHERMAN_LEN_OFFSET: usize = 1;
pub(crate) const SHERMAN_DADDY_OFFSET: usize = 2;
pub(crate) const SHERMAN_CHARS_OFFSET: usize = 4;
pub(crate) const fn sherman_targets_offset(len: usize) -> usize {
    SHERMAN_CHARS_OFFSET + len
}

/// Fixed byte size of one accel descriptor record in the pool.
pub const ACCEL_AUX_BYTES: usize = 80;

/// Fixed-size engine header at the blob origin.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NfaHeader {
    pub kind: u32,
    pub flags: u32,
    /// Total blob length in bytes.
    pub length: u32,
    /// Raw state count.
    pub n_positions: u32,
    pub scratch_state_size: u32,
    pub stream_state_size: u32,
}
unsafe impl Pod for NfaHeader {}
unsafe impl Zeroable for NfaHeader {}

/// McClellan-specific header, directly after [`NfaHeader`].
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct McClellanHeader {
    /// Byte to implementation-symbol remap.
    pub remap: [u8; 256],
    pub state_count: u16,
    pub alpha_shift: u8,
    pub flags: u8,
    /// Blob-relative offset of the aux table.
    pub aux_offset: u32,
    /// Blob-relative offset of the accel descriptor pool.
    pub accel_offset: u32,
    /// Blob-relative offset of the Sherman region (16-bit only; 0 otherwise).
    pub sherman_offset: u32,
    /// Blob-relative end of the Sherman region.
    pub sherman_end: u32,
    /// First Sherman implementation ID; IDs below this are table rows.
    pub sherman_limit: u16,
    pub start_anchored: u16,
    pub start_floating: u16,
    /// 8-bit encoding: first accelerable implementation ID.
    pub accel_limit_8: u16,
    /// 8-bit encoding: first accepting implementation ID.
    pub accept_limit_8: u16,
    pub has_accel: u8,
    pub _pad: u8,
    /// Representative report; authoritative when `MCCLELLAN_FLAG_SINGLE`.
    pub arb_report: u32,
}
unsafe impl Pod for McClellanHeader {}
unsafe impl Zeroable for McClellanHeader {}

impl Default for McClellanHeader {
    fn default() -> Self {
        // SAFETY: all-zero is a valid value for this plain-data header.
        unsafe { core::mem::zeroed() }
    }
}

/// Per-state fixed metadata record in the aux table.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MstateAux {
    /// Report-list pool offset for mid-stream accepts; 0 means none.
    pub accept: u32,
    /// Report-list pool offset for EOD accepts; 0 means none.
    pub accept_eod: u32,
    /// Implementation ID reached on the `TOP` special.
    pub top: u16,
    pub _pad: u16,
    /// Accel pool offset for this state's descriptor; 0 means none.
    pub accel_offset: u32,
}
unsafe impl Pod for MstateAux {}
unsafe impl Zeroable for MstateAux {}

/// Blob-relative offset of the transition table.
pub(crate) const fn tran_offset() -> usize {
    crate::util::layout::align_up(
        core::mem::size_of::<NfaHeader>() + core::mem::size_of::<McClellanHeader>(),
        16,
    )
}

/// An immutable compiled-automaton byte region.
///
/// The backing allocation is 64-byte aligned; interior sections are located
/// by the offsets stored in the headers. Once built a blob is never mutated.
pub struct Blob {
    region: AlignedRegion,
}

impl Blob {
    pub(crate) fn new_zeroed(len: usize) -> Result<Self, CompileError> {
        let region = AlignedRegion::new_zeroed(len, 64).map_err(|_| CompileError::OutOfMemory)?;
        Ok(Self { region })
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.region.as_slice()
    }

    #[inline]
    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8] {
        self.region.as_mut_slice()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.region.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    /// Parses the headers into a read-only view.
    pub fn view(&self) -> McClellan<'_> {
        McClellan::new(self.as_bytes()).expect("blob carries valid headers")
    }
}

/// Diagnostics produced alongside a compiled blob.
#[derive(Clone, Debug, Default)]
pub struct CompileReport {
    /// Raw IDs of the states that received acceleration descriptors.
    pub accel_states: Vec<StateId>,
    /// Number of states encoded in the Sherman region.
    pub sherman_count: u32,
    /// Set when the automaton has no floating start and the proxy walk found
    /// no self-looping stand-in: floating acceleration silently degrades to
    /// the anchored threshold for such automata.
    pub sds_proxy_missing: bool,
    /// Mirrors `MCCLELLAN_FLAG_SINGLE`.
    pub single_report: bool,
}

/// A compiled automaton plus its compile-time diagnostics.
pub struct CompiledDfa {
    pub blob: Blob,
    pub report: CompileReport,
}

/// Lowers `raw` into McClellan bytecode.
///
/// The raw automaton may be mutated in place (EOD-report stripping). On
/// failure nothing is returned and any partially built blob is released.
///
/// # Errors
/// - `InvalidArgument` for structural contract violations or an automaton
///   with no reports at all.
/// - `StateCountExceeded` when the automaton does not fit the chosen
///   encoding's ID space.
/// - `OutOfMemory` when the blob allocation fails.
pub fn compile(raw: &mut RawDfa, cc: &CompileContext) -> Result<CompiledDfa, CompileError> {
    raw.validate()?;
    if raw.states.len() > MAX_STATE_COUNT {
        return Err(CompileError::StateCountExceeded {
            states: raw.states.len(),
            limit: MAX_STATE_COUNT,
        });
    }

    if !cc.streaming {
        raw.strip_extra_eod_reports();
    }
    let has_eod_reports = raw.has_eod_reports();

    let using8bit = cc.grey.allow_mcclellan_8 && raw.states.len() <= 256;
    let any_cyclic_near_anchored = sherman::is_cyclic_near(raw, raw.start_anchored);

    let mut info = compile::DfaInfo::new(raw);
    for id in 0..info.size() {
        sherman::find_better_daddy(
            &mut info,
            id as StateId,
            using8bit,
            any_cyclic_near_anchored,
            &cc.grey,
        );
    }

    let mut out = if using8bit {
        compile::compile8(&mut info, cc)?
    } else {
        compile::compile16(&mut info, cc)?
    };

    if has_eod_reports {
        let bytes = out.blob.as_mut_bytes();
        let mut hdr: NfaHeader = pod_read(bytes, 0).expect("header present");
        hdr.flags |= NFA_ACCEPTS_EOD;
        crate::util::layout::pod_write(bytes, 0, &hdr);
    }

    Ok(out)
}

/// Read-only view over a compiled blob.
///
/// This is the lookup contract the scan loop consumes: stepping the packed
/// table (including Sherman dispatch), aux records, report lists, and accel
/// descriptors. It performs no allocation besides report-list decoding.
pub struct McClellan<'a> {
    bytes: &'a [u8],
    nfa: NfaHeader,
    m: McClellanHeader,
}

impl<'a> McClellan<'a> {
    /// Parses the headers. Returns `None` when the region is too short or
    /// carries an unknown kind tag.
    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        let nfa: NfaHeader = pod_read(bytes, 0)?;
        if nfa.kind != MCCLELLAN_NFA_8 && nfa.kind != MCCLELLAN_NFA_16 {
            return None;
        }
        if bytes.len() < nfa.length as usize {
            return None;
        }
        let m: McClellanHeader = pod_read(bytes, core::mem::size_of::<NfaHeader>())?;
        Some(Self { bytes, nfa, m })
    }

    #[inline]
    pub fn nfa_header(&self) -> &NfaHeader {
        &self.nfa
    }

    #[inline]
    pub fn header(&self) -> &McClellanHeader {
        &self.m
    }

    #[inline]
    pub fn is_eight_bit(&self) -> bool {
        self.nfa.kind == MCCLELLAN_NFA_8
    }

    #[inline]
    pub fn state_count(&self) -> u16 {
        self.m.state_count
    }

    /// Aux record for an implementation state.
    #[inline]
    pub fn aux(&self, impl_id: u16) -> MstateAux {
        debug_assert!(impl_id < self.m.state_count);
        let off = self.m.aux_offset as usize
            + impl_id as usize * core::mem::size_of::<MstateAux>();
        pod_read(self.bytes, off).expect("aux table in bounds")
    }

    #[inline]
    fn read_cell16(&self, cell_index: usize) -> u16 {
        let off = tran_offset() + cell_index * 2;
        u16::from_ne_bytes([self.bytes[off], self.bytes[off + 1]])
    }

    /// Steps the automaton by one input byte, returning the successor's
    /// implementation ID (flag bits stripped).
    pub fn step(&self, impl_id: u16, byte: u8) -> u16 {
        let sym = self.m.remap[byte as usize] as usize;
        if self.is_eight_bit() {
            let row = (impl_id as usize) << self.m.alpha_shift;
            return self.bytes[tran_offset() + row + sym] as u16;
        }
        if impl_id < self.m.sherman_limit {
            let row = (impl_id as usize) << self.m.alpha_shift;
            return self.read_cell16(row + sym) & STATE_MASK;
        }
        self.sherman_step(impl_id, sym)
    }

    fn sherman_step(&self, impl_id: u16, sym: usize) -> u16 {
        let entry = self.sherman_entry(impl_id);
        debug_assert_eq!(self.bytes[entry + SHERMAN_TYPE_OFFSET], SHERMAN_STATE);
        let len = self.bytes[entry + SHERMAN_LEN_OFFSET] as usize;
        let chars = &self.bytes[entry + SHERMAN_CHARS_OFFSET..entry + SHERMAN_CHARS_OFFSET + len];
        if let Some(i) = chars.iter().position(|&c| c as usize == sym) {
            let toff = entry + sherman_targets_offset(len) + i * 2;
            let target = u16::from_ne_bytes([self.bytes[toff], self.bytes[toff + 1]]);
            return target & STATE_MASK;
        }
        // No override: fall back to the daddy's dense row. Daddies are never
        // Sherman states, so one hop suffices.
        let daddy = u16::from_ne_bytes([
            self.bytes[entry + SHERMAN_DADDY_OFFSET],
            self.bytes[entry + SHERMAN_DADDY_OFFSET + 1],
        ]);
        debug_assert!(daddy < self.m.sherman_limit);
        let row = (daddy as usize) << self.m.alpha_shift;
        self.read_cell16(row + sym) & STATE_MASK
    }

    #[inline]
    fn sherman_entry(&self, impl_id: u16) -> usize {
        debug_assert!(impl_id >= self.m.sherman_limit && impl_id < self.m.state_count);
        self.m.sherman_offset as usize
            + (impl_id - self.m.sherman_limit) as usize * SHERMAN_FIXED_SIZE
    }

    /// Raw 16-bit cell for a dense row, flag bits included.
    ///
    /// # Panics
    /// Panics (via debug assertions) when called on an 8-bit blob or a
    /// Sherman-range ID; flags live only in dense 16-bit cells.
    pub fn cell16(&self, impl_id: u16, byte: u8) -> u16 {
        debug_assert!(!self.is_eight_bit());
        debug_assert!(impl_id < self.m.sherman_limit);
        let sym = self.m.remap[byte as usize] as usize;
        self.read_cell16(((impl_id as usize) << self.m.alpha_shift) + sym)
    }

    /// Decodes a report list at a pool offset from an aux record.
    pub fn report_list(&self, offset: u32) -> Vec<ReportId> {
        let base = offset as usize;
        let count = u32::from_ne_bytes(
            self.bytes[base..base + 4].try_into().expect("report count in bounds"),
        ) as usize;
        (0..count)
            .map(|i| {
                let off = base + 4 + i * 4;
                u32::from_ne_bytes(self.bytes[off..off + 4].try_into().expect("report in bounds"))
            })
            .collect()
    }

    /// Decodes the accel descriptor referenced by an aux record.
    pub fn accel(&self, offset: u32) -> AccelScheme {
        accel::decode(&self.bytes[offset as usize..offset as usize + ACCEL_AUX_BYTES])
    }
}
