//! Blob construction for the 8- and 16-bit McClellan encodings.
//!
//! The two encoders differ only in cell width, in how implementation IDs are
//! ordered (the 8-bit table encodes accept/accel membership as ID ranges,
//! the 16-bit table as per-cell flag bits), and in the presence of the
//! Sherman region. Everything else -- headers, aux records, the report pool,
//! the accel pool -- is shared.

use std::collections::BTreeSet;

use ahash::AHashMap;

use crate::api::{
    CompileContext, CompileError, ReportId, StateId, DEAD_STATE, INVALID_REPORT_INDEX,
};
use crate::dfa::{RawDfa, ALPHABET, TOP};
use crate::util::layout::{align_up, pod_read, pod_write};

use super::{
    accel, sherman, tran_offset, Blob, CompileReport, CompiledDfa, McClellanHeader, MstateAux,
    NfaHeader, ACCEL_AUX_BYTES, ACCEL_FLAG, ACCEPT_FLAG, MCCLELLAN_FLAG_SINGLE, MCCLELLAN_NFA_16,
    MCCLELLAN_NFA_8, SHERMAN_CHARS_OFFSET, SHERMAN_DADDY_OFFSET, SHERMAN_FIXED_SIZE,
    SHERMAN_LEN_OFFSET, SHERMAN_STATE, SHERMAN_TYPE_OFFSET, STATE_MASK,
};

/// Compiler-side annotations for one raw state.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct ExtraInfo {
    pub daddytaken: u16,
    pub sherman: bool,
    pub accelerable: bool,
}

/// The raw automaton plus the per-state working set of the lowering pass.
pub(crate) struct DfaInfo<'a> {
    pub raw: &'a mut RawDfa,
    pub extra: Vec<ExtraInfo>,
}

impl<'a> DfaInfo<'a> {
    pub fn new(raw: &'a mut RawDfa) -> Self {
        let extra = vec![ExtraInfo::default(); raw.states.len()];
        Self { raw, extra }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.raw.states.len()
    }

    #[inline]
    pub fn impl_id(&self, raw_id: StateId) -> u16 {
        self.raw.states[raw_id as usize].impl_id
    }

    #[inline]
    pub fn is_sherman(&self, raw_id: StateId) -> bool {
        self.extra[raw_id as usize].sherman
    }

    #[inline]
    pub fn is_accel(&self, raw_id: StateId) -> bool {
        self.extra[raw_id as usize].accelerable
    }

    /// Row width exponent: rows hold `1 << alpha_shift` cells so scan-time
    /// indexing is a shift, not a multiply.
    pub fn alpha_shift(&self) -> u8 {
        let n = self.raw.impl_alpha_size() as u32;
        if n < 2 {
            1
        } else {
            (32 - (n - 1).leading_zeros()) as u8
        }
    }
}

/// The deduplicated report lists plus each state's index into them.
pub(crate) struct ReportPool {
    lists: Vec<Vec<ReportId>>,
    state_report: Vec<u32>,
    state_report_eod: Vec<u32>,
    single: bool,
    arb: ReportId,
}

/// Collapses identical report sets across states into one list table.
///
/// EOD and mid-stream sets share the table, so a state whose EOD set equals
/// another state's accept set lands on the same pooled list.
pub(crate) fn gather_reports(raw: &RawDfa) -> Result<ReportPool, CompileError> {
    let mut lists: Vec<Vec<ReportId>> = Vec::new();
    let mut rev: AHashMap<Vec<ReportId>, u32> = AHashMap::new();
    let mut intern = |set: &BTreeSet<ReportId>, lists: &mut Vec<Vec<ReportId>>| -> u32 {
        let key: Vec<ReportId> = set.iter().copied().collect();
        *rev.entry(key.clone()).or_insert_with(|| {
            lists.push(key);
            lists.len() as u32 - 1
        })
    };

    let mut state_report = Vec::with_capacity(raw.states.len());
    for s in &raw.states {
        if s.reports.is_empty() {
            state_report.push(INVALID_REPORT_INDEX);
        } else {
            state_report.push(intern(&s.reports, &mut lists));
        }
    }
    let mut state_report_eod = Vec::with_capacity(raw.states.len());
    for s in &raw.states {
        if s.reports_eod.is_empty() {
            state_report_eod.push(INVALID_REPORT_INDEX);
        } else {
            state_report_eod.push(intern(&s.reports_eod, &mut lists));
        }
    }

    if lists.is_empty() {
        // Every component should be able to generate reports; an automaton
        // with none should have been rejected upstream.
        return Err(CompileError::InvalidArgument("automaton generates no reports"));
    }

    let mut arb = lists[0][0];
    let mut reps: BTreeSet<ReportId> = BTreeSet::new();
    for &idx in &state_report {
        if idx != INVALID_REPORT_INDEX {
            reps.extend(lists[idx as usize].iter().copied());
        }
    }
    let single = reps.len() == 1;
    if single {
        arb = *reps.iter().next().expect("one report");
    }

    Ok(ReportPool { lists, state_report, state_report_eod, single, arb })
}

impl ReportPool {
    fn pool_bytes(&self) -> usize {
        self.lists.iter().map(|l| 4 + 4 * l.len()).sum()
    }

    /// Writes the pool at `base` and returns each list's blob offset.
    fn fill(&self, bytes: &mut [u8], base: usize) -> Vec<u32> {
        let mut offsets = Vec::with_capacity(self.lists.len());
        let mut cursor = base;
        for list in &self.lists {
            offsets.push(cursor as u32);
            pod_write(bytes, cursor, &(list.len() as u32));
            cursor += 4;
            for &r in list {
                pod_write(bytes, cursor, &r);
                cursor += 4;
            }
        }
        offsets
    }
}

/// Shared section geometry of a blob being built.
struct Layout {
    aux_offset: usize,
    report_base: usize,
    accel_offset: usize,
    total: usize,
    sherman_offset: usize,
}

fn layout_sections(
    cell_bytes: usize,
    row_states: usize,
    state_count: usize,
    alpha_shift: u8,
    pool_bytes: usize,
    accel_count: u32,
    sherman_count: Option<u32>,
) -> Layout {
    let tran_size = cell_bytes * (row_states << alpha_shift);
    let aux_offset = align_up(tran_offset() + tran_size, 16);
    let aux_size = core::mem::size_of::<MstateAux>() * state_count;
    let report_base = aux_offset + aux_size;
    let accel_offset = align_up(report_base + pool_bytes, 32);
    let accel_end = accel_offset + ACCEL_AUX_BYTES * accel_count as usize;
    // Only the 16-bit encoding carries a Sherman region; its base is rounded
    // even when the region is empty.
    let (sherman_offset, total) = match sherman_count {
        Some(n) => {
            let base = align_up(accel_end, 16);
            (base, base + n as usize * SHERMAN_FIXED_SIZE)
        }
        None => (0, accel_end),
    };
    Layout { aux_offset, report_base, accel_offset, total, sherman_offset }
}

#[inline]
fn put_u16(bytes: &mut [u8], off: usize, v: u16) {
    bytes[off..off + 2].copy_from_slice(&v.to_ne_bytes());
}

#[inline]
fn get_u16(bytes: &[u8], off: usize) -> u16 {
    u16::from_ne_bytes([bytes[off], bytes[off + 1]])
}

fn write_headers(
    blob: &mut Blob,
    kind: u32,
    cell_bytes: u32,
    info: &DfaInfo<'_>,
    layout: &Layout,
    accel_count: u32,
    pool: &ReportPool,
    sherman_limit: u16,
    accel_limit_8: u16,
    accept_limit_8: u16,
) {
    let nfa = NfaHeader {
        kind,
        flags: 0,
        length: layout.total as u32,
        n_positions: info.size() as u32,
        scratch_state_size: cell_bytes,
        stream_state_size: cell_bytes,
    };

    let mut m = McClellanHeader {
        state_count: info.size() as u16,
        alpha_shift: info.alpha_shift(),
        flags: if pool.single { MCCLELLAN_FLAG_SINGLE } else { 0 },
        aux_offset: layout.aux_offset as u32,
        accel_offset: layout.accel_offset as u32,
        sherman_offset: 0,
        sherman_end: 0,
        sherman_limit,
        start_anchored: info.impl_id(info.raw.start_anchored),
        start_floating: info.impl_id(info.raw.start_floating),
        accel_limit_8,
        accept_limit_8,
        has_accel: u8::from(accel_count > 0),
        arb_report: pool.arb,
        ..McClellanHeader::default()
    };
    for i in 0..ALPHABET {
        m.remap[i] = info.raw.alpha_remap[i] as u8;
    }
    if kind == MCCLELLAN_NFA_16 {
        m.sherman_offset = layout.sherman_offset as u32;
        m.sherman_end = layout.total as u32;
    }

    let bytes = blob.as_mut_bytes();
    pod_write(bytes, 0, &nfa);
    pod_write(bytes, core::mem::size_of::<NfaHeader>(), &m);
}

fn fill_aux(
    bytes: &mut [u8],
    aux_offset: usize,
    fs: u16,
    raw_id: StateId,
    info: &DfaInfo<'_>,
    pool: &ReportPool,
    report_offsets: &[u32],
) {
    let state = &info.raw.states[raw_id as usize];
    let accept = if state.reports.is_empty() {
        0
    } else {
        report_offsets[pool.state_report[raw_id as usize] as usize]
    };
    let accept_eod = if state.reports_eod.is_empty() {
        0
    } else {
        report_offsets[pool.state_report_eod[raw_id as usize] as usize]
    };
    let raw_top = if raw_id == DEAD_STATE {
        info.raw.start_floating
    } else {
        state.next[info.raw.alpha_remap[TOP] as usize]
    };
    let aux = MstateAux {
        accept,
        accept_eod,
        top: info.impl_id(raw_top),
        _pad: 0,
        accel_offset: 0,
    };
    pod_write(bytes, aux_offset + fs as usize * core::mem::size_of::<MstateAux>(), &aux);
}

fn aux_record(bytes: &[u8], aux_offset: usize, fs: u16) -> MstateAux {
    pod_read(bytes, aux_offset + fs as usize * core::mem::size_of::<MstateAux>())
        .expect("aux record in bounds")
}

fn set_aux_accel(bytes: &mut [u8], aux_offset: usize, fs: u16, accel: u32) {
    let mut aux = aux_record(bytes, aux_offset, fs);
    aux.accel_offset = accel;
    pod_write(bytes, aux_offset + fs as usize * core::mem::size_of::<MstateAux>(), &aux);
}

/// Builds and stores the accel descriptor for `raw_id`, advancing the pool
/// cursor.
fn emit_accel(
    bytes: &mut [u8],
    aux_offset: usize,
    fs: u16,
    raw_id: StateId,
    info: &DfaInfo<'_>,
    accel_cursor: &mut usize,
) {
    set_aux_accel(bytes, aux_offset, fs, *accel_cursor as u32);
    let scheme = accel::build_accel(info.raw, raw_id);
    accel::encode_into(&scheme, &mut bytes[*accel_cursor..*accel_cursor + ACCEL_AUX_BYTES]);
    *accel_cursor += ACCEL_AUX_BYTES;
}

/// Assigns 16-bit implementation IDs: dead, then normal states, then Sherman
/// states. Fails when the top ID spills into the flag bits.
fn allocate_fsn16(info: &mut DfaInfo<'_>) -> Result<u16, CompileError> {
    info.raw.states[DEAD_STATE as usize].impl_id = 0;

    let mut norm: Vec<StateId> = Vec::new();
    let mut sherm: Vec<StateId> = Vec::new();
    for i in 1..info.size() {
        if info.is_sherman(i as StateId) {
            sherm.push(i as StateId);
        } else {
            norm.push(i as StateId);
        }
    }

    // IDs are assigned through a u32 counter so an automaton that busts the
    // 14-bit ID space is detected rather than wrapped.
    let mut next: u32 = 1;
    for &s in &norm {
        info.raw.states[s as usize].impl_id = next as u16;
        next += 1;
    }
    let sherman_base = next;
    for &s in &sherm {
        info.raw.states[s as usize].impl_id = next as u16;
        next += 1;
    }

    if next - 1 != (next - 1) & STATE_MASK as u32 {
        return Err(CompileError::StateCountExceeded {
            states: info.size(),
            limit: STATE_MASK as usize + 1,
        });
    }
    Ok(sherman_base as u16)
}

/// Assigns 8-bit implementation IDs ordered so that ID ranges express the
/// accept/accel classification: plain, then accelerable, then accepting.
fn allocate_fsn8(info: &mut DfaInfo<'_>) -> (u16, u16) {
    debug_assert!(info.size() <= 256);
    info.raw.states[DEAD_STATE as usize].impl_id = 0;

    let mut norm: Vec<StateId> = Vec::new();
    let mut accel: Vec<StateId> = Vec::new();
    let mut accept: Vec<StateId> = Vec::new();
    for i in 1..info.size() {
        let id = i as StateId;
        if !info.raw.states[i].reports.is_empty() {
            accept.push(id);
        } else if info.is_accel(id) {
            accel.push(id);
        } else {
            norm.push(id);
        }
    }

    let mut j: u16 = 1;
    for &s in &norm {
        info.raw.states[s as usize].impl_id = j;
        j += 1;
    }
    let accel_limit = j;
    for &s in &accel {
        info.raw.states[s as usize].impl_id = j;
        j += 1;
    }
    let accept_limit = j;
    for &s in &accept {
        info.raw.states[s as usize].impl_id = j;
        j += 1;
    }
    (accel_limit, accept_limit)
}

fn populate_accel_marks(info: &mut DfaInfo<'_>, cc: &CompileContext) -> (u32, bool) {
    let mut marks = vec![false; info.size()];
    let (count, sds_missing) =
        accel::populate_acceleration_info(info.raw, &mut marks, cc.grey.accelerate_dfa);
    for (extra, mark) in info.extra.iter_mut().zip(marks) {
        extra.accelerable = mark;
    }
    (count, sds_missing)
}

fn report_from(info: &DfaInfo<'_>, pool: &ReportPool, sds_proxy_missing: bool) -> CompileReport {
    let accel_states: Vec<StateId> = (0..info.size())
        .filter(|&i| info.extra[i].accelerable)
        .map(|i| i as StateId)
        .collect();
    CompileReport {
        accel_states,
        sherman_count: sherman_count(info),
        sds_proxy_missing,
        single_report: pool.single,
    }
}

fn sherman_count(info: &DfaInfo<'_>) -> u32 {
    info.extra.iter().filter(|e| e.sherman).count() as u32
}

/// Flag-marking pass: OR accept/accel bits into every 16-bit cell, normal
/// rows and Sherman override targets alike. Flags are derived purely from
/// the target's aux record, which is what keeps them consistent with it.
fn mark_edges(bytes: &mut [u8], info: &DfaInfo<'_>, sherman_limit: u16, sherman_offset: usize) {
    let alpha_shift = info.alpha_shift();
    let alpha_size = info.raw.impl_alpha_size() as usize;
    let hdr: McClellanHeader =
        pod_read(bytes, core::mem::size_of::<NfaHeader>()).expect("header present");
    let aux_offset = hdr.aux_offset as usize;

    for i in 0..sherman_limit as usize {
        for j in 0..alpha_size {
            let cell_off = tran_offset() + ((i << alpha_shift) + j) * 2;
            let mut cell = get_u16(bytes, cell_off);
            let aux = aux_record(bytes, aux_offset, cell & STATE_MASK);
            if aux.accept != 0 {
                cell |= ACCEPT_FLAG;
            }
            if aux.accel_offset != 0 {
                cell |= ACCEL_FLAG;
            }
            put_u16(bytes, cell_off, cell);
        }
    }

    for fs in sherman_limit..hdr.state_count {
        let entry = sherman_offset + (fs - sherman_limit) as usize * SHERMAN_FIXED_SIZE;
        debug_assert_eq!(bytes[entry + SHERMAN_TYPE_OFFSET], SHERMAN_STATE);
        let len = bytes[entry + SHERMAN_LEN_OFFSET] as usize;
        for i in 0..len {
            let toff = entry + super::sherman_targets_offset(len) + i * 2;
            let mut target = get_u16(bytes, toff);
            let aux = aux_record(bytes, aux_offset, target & STATE_MASK);
            if aux.accept != 0 {
                target |= ACCEPT_FLAG;
            }
            if aux.accel_offset != 0 {
                target |= ACCEL_FLAG;
            }
            put_u16(bytes, toff, target);
        }
    }
}

pub(crate) fn compile16(
    info: &mut DfaInfo<'_>,
    cc: &CompileContext,
) -> Result<CompiledDfa, CompileError> {
    let alpha_shift = info.alpha_shift();
    debug_assert!(alpha_shift <= 8);

    let sherman_limit = allocate_fsn16(info)?;
    let pool = gather_reports(info.raw)?;
    let (accel_count, sds_missing) = populate_accel_marks(info, cc);

    let layout = layout_sections(
        2,
        sherman_limit as usize,
        info.size(),
        alpha_shift,
        pool.pool_bytes(),
        accel_count,
        Some(sherman_count(info)),
    );

    let mut blob = Blob::new_zeroed(layout.total)?;
    write_headers(
        &mut blob,
        MCCLELLAN_NFA_16,
        2,
        info,
        &layout,
        accel_count,
        &pool,
        sherman_limit,
        0,
        0,
    );

    let bytes = blob.as_mut_bytes();
    let report_offsets = pool.fill(bytes, layout.report_base);
    let mut accel_cursor = layout.accel_offset;

    // Dense rows first.
    for i in 0..info.size() {
        let raw_id = i as StateId;
        if info.is_sherman(raw_id) {
            continue;
        }
        let fs = info.impl_id(raw_id);
        debug_assert!(fs < sherman_limit);

        for j in 0..info.raw.impl_alpha_size() as usize {
            let target = info.impl_id(info.raw.states[i].next[j]);
            put_u16(bytes, tran_offset() + ((fs as usize) << alpha_shift) * 2 + j * 2, target);
        }

        fill_aux(bytes, layout.aux_offset, fs, raw_id, info, &pool, &report_offsets);
        if info.is_accel(raw_id) {
            emit_accel(bytes, layout.aux_offset, fs, raw_id, info, &mut accel_cursor);
        }
    }

    // Then the Sherman region.
    for i in 0..info.size() {
        let raw_id = i as StateId;
        if !info.is_sherman(raw_id) {
            continue;
        }
        let fs = info.impl_id(raw_id);
        debug_assert!(fs >= sherman_limit);

        fill_aux(bytes, layout.aux_offset, fs, raw_id, info, &pool, &report_offsets);
        if info.is_accel(raw_id) {
            emit_accel(bytes, layout.aux_offset, fs, raw_id, info, &mut accel_cursor);
        }

        let entry =
            layout.sherman_offset + (fs - sherman_limit) as usize * SHERMAN_FIXED_SIZE;
        let len = (info.raw.impl_alpha_size() - info.extra[i].daddytaken) as u8;
        debug_assert!(len as u16 <= sherman::MAX_SHERMAN_LIST_LEN + 1);
        let daddy = info.raw.states[i].daddy;

        bytes[entry + SHERMAN_TYPE_OFFSET] = SHERMAN_STATE;
        bytes[entry + SHERMAN_LEN_OFFSET] = len;
        put_u16(bytes, entry + SHERMAN_DADDY_OFFSET, info.impl_id(daddy));

        let mut chars_off = entry + SHERMAN_CHARS_OFFSET;
        let mut targets_off = entry + super::sherman_targets_offset(len as usize);
        for s in 0..info.raw.impl_alpha_size() as usize {
            let mine = info.raw.states[i].next[s];
            let theirs = info.raw.states[daddy as usize].next[s];
            if mine != theirs {
                bytes[chars_off] = s as u8;
                chars_off += 1;
                put_u16(bytes, targets_off, info.impl_id(mine));
                targets_off += 2;
            }
        }
        debug_assert_eq!(chars_off, entry + SHERMAN_CHARS_OFFSET + len as usize);
    }

    debug_assert_eq!(
        accel_cursor,
        layout.accel_offset + ACCEL_AUX_BYTES * accel_count as usize
    );

    mark_edges(bytes, info, sherman_limit, layout.sherman_offset);

    let report = report_from(info, &pool, sds_missing);
    Ok(CompiledDfa { blob, report })
}

pub(crate) fn compile8(
    info: &mut DfaInfo<'_>,
    cc: &CompileContext,
) -> Result<CompiledDfa, CompileError> {
    let alpha_shift = info.alpha_shift();
    debug_assert!(alpha_shift <= 8);

    let pool = gather_reports(info.raw)?;
    let (accel_count, sds_missing) = populate_accel_marks(info, cc);
    let (accel_limit, accept_limit) = allocate_fsn8(info);

    let layout = layout_sections(
        1,
        info.size(),
        info.size(),
        alpha_shift,
        pool.pool_bytes(),
        accel_count,
        None,
    );

    let mut blob = Blob::new_zeroed(layout.total)?;
    write_headers(
        &mut blob,
        MCCLELLAN_NFA_8,
        1,
        info,
        &layout,
        accel_count,
        &pool,
        0,
        accel_limit,
        accept_limit,
    );

    let bytes = blob.as_mut_bytes();
    let report_offsets = pool.fill(bytes, layout.report_base);
    let mut accel_cursor = layout.accel_offset;

    for i in 0..info.size() {
        let raw_id = i as StateId;
        let fs = info.impl_id(raw_id);

        fill_aux(bytes, layout.aux_offset, fs, raw_id, info, &pool, &report_offsets);
        if info.is_accel(raw_id) {
            emit_accel(bytes, layout.aux_offset, fs, raw_id, info, &mut accel_cursor);
        }

        for s in 0..info.raw.impl_alpha_size() as usize {
            let target = info.impl_id(info.raw.states[i].next[s]);
            debug_assert!(target <= u8::MAX as u16);
            bytes[tran_offset() + ((fs as usize) << alpha_shift) + s] = target as u8;
        }
    }

    debug_assert_eq!(
        accel_cursor,
        layout.accel_offset + ACCEL_AUX_BYTES * accel_count as usize
    );

    let report = report_from(info, &pool, sds_missing);
    Ok(CompiledDfa { blob, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfa::{DfaKind, DfaState};

    fn toy_dfa() -> RawDfa {
        let mut remap = [0u16; ALPHABET + 1];
        remap[b'a' as usize] = 1;
        remap[TOP] = 2;
        let mut start = DfaState::filled(3, 1);
        start.next[1] = 2;
        start.next[2] = 1;
        let mut accept = DfaState::filled(3, 1);
        accept.reports.insert(88);
        RawDfa {
            kind: DfaKind::Callback,
            states: vec![DfaState::filled(3, DEAD_STATE), start, accept],
            start_anchored: 1,
            start_floating: 1,
            alpha_size: 3,
            alpha_remap: remap,
        }
    }

    #[test]
    fn report_pool_dedups_and_detects_single() {
        let mut raw = toy_dfa();
        raw.states[1].reports_eod.insert(88);
        let pool = gather_reports(&raw).unwrap();
        // {88} interned once, shared by accept and EOD use.
        assert_eq!(pool.lists.len(), 1);
        assert!(pool.single);
        assert_eq!(pool.arb, 88);
        assert_eq!(pool.state_report[2], pool.state_report_eod[1]);
        assert_eq!(pool.state_report[0], INVALID_REPORT_INDEX);
    }

    #[test]
    fn multiple_reports_clear_single_flag() {
        let mut raw = toy_dfa();
        raw.states[1].reports.insert(11);
        let pool = gather_reports(&raw).unwrap();
        assert_eq!(pool.lists.len(), 2);
        assert!(!pool.single);
    }

    #[test]
    fn reportless_automaton_is_rejected() {
        let mut raw = toy_dfa();
        raw.states[2].reports.clear();
        assert!(matches!(
            gather_reports(&raw),
            Err(CompileError::InvalidArgument(_))
        ));
    }

    #[test]
    fn fsn8_orders_plain_accel_accept() {
        let mut raw = toy_dfa();
        let mut info = DfaInfo::new(&mut raw);
        info.extra[1].accelerable = true;
        let (accel_limit, accept_limit) = allocate_fsn8(&mut info);
        // One plain range (empty), then state 1 (accel), then state 2
        // (accept).
        assert_eq!(accel_limit, 1);
        assert_eq!(accept_limit, 2);
        assert_eq!(info.impl_id(0), 0);
        assert_eq!(info.impl_id(1), 1);
        assert_eq!(info.impl_id(2), 2);
    }

    #[test]
    fn fsn16_places_shermans_last() {
        let mut raw = toy_dfa();
        let mut info = DfaInfo::new(&mut raw);
        info.extra[1].sherman = true;
        let sherman_limit = allocate_fsn16(&mut info).unwrap();
        assert_eq!(sherman_limit, 2);
        assert_eq!(info.impl_id(2), 1);
        assert_eq!(info.impl_id(1), 2);
    }

    #[test]
    fn alpha_shift_rounds_up() {
        let mut raw = toy_dfa();
        let info = DfaInfo::new(&mut raw);
        // impl alphabet of 2 -> shift 1.
        assert_eq!(info.alpha_shift(), 1);
    }
}
