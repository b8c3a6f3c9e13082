//! Per-state acceleration analysis and descriptor synthesis.
//!
//! A state is accelerable when few input bytes can move the automaton out of
//! it; the scanner then skips ahead with a SIMD kernel that hunts only for
//! those "stop" bytes. This module decides which states qualify, builds the
//! minimal descriptor for the best applicable kernel, and provides scalar
//! reference kernels so the descriptors can be validated byte-for-byte.
//!
//! # Invariants
//! - A descriptor's stop set always covers the true escape set: stopping
//!   early is safe, skipping past an escape is not. The single-byte schemes
//!   are exact; the caseless and double schemes may widen the set.
//! - States of callback-generating automata with non-empty report sets are
//!   never accelerated, since skipping would reorder reports.

use std::collections::BTreeSet;

use ahash::AHashSet;

use crate::api::{StateId, DEAD_STATE};
use crate::dfa::{RawDfa, ALPHABET};
use crate::stdx::ByteSet256;

use super::ACCEL_AUX_BYTES;

/// Escape-set cardinality ceiling for ordinary states.
pub const ACCEL_MAX_STOP_CHAR: usize = 160;
/// Wider ceiling for the stream-default state (or its proxy); keeping the
/// floating start accelerable matters more than descriptor quality.
pub const ACCEL_MAX_FLOATING_STOP_CHAR: usize = 192;

/// Clears the ASCII case bit.
const CASE_CLEAR: u8 = 0xdf;

/// Descriptor tag values as stored in the accel pool.
const ACCEL_NONE: u8 = 0;
const ACCEL_VERM: u8 = 1;
const ACCEL_VERM_NOCASE: u8 = 2;
const ACCEL_DVERM: u8 = 3;
const ACCEL_DVERM_NOCASE: u8 = 4;
const ACCEL_SHUFTI: u8 = 5;
const ACCEL_DSHUFTI: u8 = 6;
const ACCEL_TRUFFLE: u8 = 7;
const ACCEL_RED_TAPE: u8 = 8;

/// An acceleration descriptor: the discriminator plus the minimal payload
/// its kernel needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccelScheme {
    /// State is too broad to accelerate.
    None,
    /// Dead end: no byte leaves the state, the scanner may skip everything.
    RedTape,
    /// Single stop byte.
    Verm { c: u8 },
    /// Caseless letter pair; `c` is the uppercase representative.
    VermNocase { c: u8 },
    /// Single stop byte pair.
    DVerm { c1: u8, c2: u8 },
    /// Caseless stop byte pair; uppercase representatives.
    DVermNocase { c1: u8, c2: u8 },
    /// Nibble-mask membership over the stop set.
    Shufti { lo: [u8; 16], hi: [u8; 16] },
    /// Nibble-mask membership over stop pairs plus singleton first bytes.
    DShufti { lo1: [u8; 16], hi1: [u8; 16], lo2: [u8; 16], hi2: [u8; 16] },
    /// Full 256-bit membership; always representable.
    Truffle { mask1: [u8; 16], mask2: [u8; 16] },
}

/// Escape analysis of one state.
#[derive(Clone, Debug, Default)]
pub(crate) struct EscapeInfo {
    /// Bytes whose transition leaves the state.
    pub outs: ByteSet256,
    /// Byte pairs `(b1, b2)` that remain an escape two symbols deep.
    pub outs2: BTreeSet<(u8, u8)>,
    /// First bytes folded out of `outs2` because their successor's row
    /// diverges too broadly from this state's row.
    pub outs2_single: ByteSet256,
    /// Pair analysis abandoned (report successor or pair-set blowup).
    pub outs2_broken: bool,
}

/// Computes the escape sets of `idx`.
pub(crate) fn find_escape_strings(raw: &RawDfa, idx: StateId) -> EscapeInfo {
    let state = &raw.states[idx as usize];
    let mut out = EscapeInfo::default();
    let mut outs2_local: BTreeSet<(u8, u8)> = BTreeSet::new();

    for i in 0..ALPHABET {
        outs2_local.clear();

        let succ_id = state.next[raw.alpha_remap[i] as usize];
        if succ_id == idx {
            continue;
        }
        out.outs.set(i as u8);

        let succ = &raw.states[succ_id as usize];
        if !succ.reports.is_empty() && raw.kind.generates_callbacks() {
            // Cannot accelerate over a report boundary.
            out.outs2_broken = true;
        }

        if !out.outs2_broken {
            for j in 0..ALPHABET {
                let sym = raw.alpha_remap[j] as usize;
                if succ.next[sym] == state.next[sym] {
                    continue;
                }
                outs2_local.insert((i as u8, j as u8));
            }
        }

        if outs2_local.len() > 8 {
            out.outs2_single.set(i as u8);
        } else {
            out.outs2.extend(outs2_local.iter().copied());
        }
        if out.outs2.len() > 8 {
            out.outs2_broken = true;
        }
    }

    out
}

/// Whether `s` loops to itself on any input byte symbol (`TOP` excluded).
fn has_self_loop(s: StateId, raw: &RawDfa) -> bool {
    let top = raw.top_symbol();
    raw.states[s as usize]
        .next
        .iter()
        .enumerate()
        .any(|(i, &t)| i as u16 != top && t == s)
}

/// Finds the stream-default state or a stand-in for it.
///
/// With no distinct floating start, walks forward from the anchored start
/// looking for a self-looping state to treat as the hot "default" state.
/// Gives up with the dead state when the walk exhausts its frontier; the
/// caller surfaces that in diagnostics since floating acceleration silently
/// degrades for such automata.
pub(crate) fn get_sds_or_proxy(raw: &RawDfa) -> StateId {
    if raw.start_floating != DEAD_STATE {
        return raw.start_floating;
    }

    let mut s = raw.start_anchored;
    if has_self_loop(s, raw) {
        return s;
    }

    let top = raw.top_symbol();
    let mut seen: AHashSet<StateId> = AHashSet::new();
    loop {
        seen.insert(s);

        let row = &raw.states[s as usize].next;
        for (i, &t) in row.iter().enumerate() {
            if i as u16 != top && t != DEAD_STATE && has_self_loop(t, raw) {
                return t;
            }
        }

        let mut next_basis = DEAD_STATE;
        for (i, &t) in row.iter().enumerate() {
            if i as u16 != top && t != DEAD_STATE && !seen.contains(&t) {
                next_basis = t;
                break;
            }
        }
        if next_basis == DEAD_STATE {
            return DEAD_STATE;
        }
        s = next_basis;
        seen.insert(next_basis);
    }
}

/// Accelerability test for one state.
pub(crate) fn is_accel(raw: &RawDfa, sds_or_proxy: StateId, idx: StateId) -> bool {
    if idx == DEAD_STATE {
        return false;
    }

    // Accumulating automata do not raise reports during the scan itself, so
    // their accept states may still be accelerated.
    if raw.kind.generates_callbacks() && !raw.states[idx as usize].reports.is_empty() {
        return false;
    }

    let single_limit = if idx == sds_or_proxy {
        ACCEL_MAX_FLOATING_STOP_CHAR
    } else {
        ACCEL_MAX_STOP_CHAR
    };

    let state = &raw.states[idx as usize];
    let mut out = ByteSet256::empty();
    for i in 0..ALPHABET {
        if state.next[raw.alpha_remap[i] as usize] != idx {
            out.set(i as u8);
        }
    }

    out.count() <= single_limit
}

/// Marks every accelerable state and returns `(count, sds_proxy_missing)`.
pub(crate) fn populate_acceleration_info(
    raw: &RawDfa,
    accelerable: &mut [bool],
    enabled: bool,
) -> (u32, bool) {
    if !enabled {
        return (0, false);
    }

    let sds_proxy = get_sds_or_proxy(raw);
    let sds_proxy_missing = raw.start_floating == DEAD_STATE && sds_proxy == DEAD_STATE;

    let mut count = 0u32;
    for idx in 0..raw.states.len() {
        if is_accel(raw, sds_proxy, idx as StateId) {
            accelerable[idx] = true;
            count += 1;
        }
    }
    (count, sds_proxy_missing)
}

/// `{c, c|0x20}` for an ASCII letter?
fn is_caseless_letter_pair(outs: &ByteSet256) -> bool {
    if outs.count() != 2 {
        return false;
    }
    let first = outs.first().expect("non-empty");
    first.is_ascii_uppercase() && outs.contains(first | 0x20)
}

/// Synthesizes the best applicable scheme for an accelerable state.
pub(crate) fn build_accel(raw: &RawDfa, idx: StateId) -> AccelScheme {
    let out = find_escape_strings(raw, idx);

    if !out.outs2_broken && out.outs2_single.is_empty() && out.outs2.len() == 1 {
        let &(c1, c2) = out.outs2.iter().next().expect("one pair");
        return AccelScheme::DVerm { c1, c2 };
    }

    if !out.outs2_broken
        && out.outs2_single.is_empty()
        && (out.outs2.len() == 2 || out.outs2.len() == 4)
    {
        let &(f, s) = out.outs2.iter().next().expect("non-empty");
        let (first_c, second_c) = (f & CASE_CLEAR, s & CASE_CLEAR);
        if out
            .outs2
            .iter()
            .all(|&(a, b)| a & CASE_CLEAR == first_c && b & CASE_CLEAR == second_c)
        {
            return AccelScheme::DVermNocase { c1: first_c, c2: second_c };
        }
    }

    if !out.outs2_broken
        && out.outs2_single.count() + out.outs2.len() <= 8
        && out.outs2_single.count() < out.outs2.len()
        && out.outs2_single.count() <= 2
        && !out.outs2.is_empty()
    {
        let (lo1, hi1, lo2, hi2) = shufti_build_double_masks(&out.outs2_single, &out.outs2);
        return AccelScheme::DShufti { lo1, hi1, lo2, hi2 };
    }

    if out.outs.is_empty() {
        return AccelScheme::RedTape;
    }

    if out.outs.count() == 1 {
        return AccelScheme::Verm { c: out.outs.first().expect("one byte") };
    }

    if is_caseless_letter_pair(&out.outs) {
        return AccelScheme::VermNocase { c: out.outs.first().expect("two bytes") & CASE_CLEAR };
    }

    if out.outs.count() > ACCEL_MAX_FLOATING_STOP_CHAR {
        return AccelScheme::None;
    }

    if let Some((lo, hi)) = shufti_build_masks(&out.outs) {
        return AccelScheme::Shufti { lo, hi };
    }

    let (mask1, mask2) = truffle_build_masks(&out.outs);
    AccelScheme::Truffle { mask1, mask2 }
}

/// Builds exact shufti nibble masks for `set`, one bucket per distinct high
/// nibble. Fails (`None`) past eight buckets; the caller falls through to
/// truffle.
pub(crate) fn shufti_build_masks(set: &ByteSet256) -> Option<([u8; 16], [u8; 16])> {
    let mut bucket_of_hi = [None::<u8>; 16];
    let mut next_bucket = 0u8;
    let mut lo = [0u8; 16];
    let mut hi = [0u8; 16];

    for b in set.iter() {
        let hi_nib = (b >> 4) as usize;
        let bucket = match bucket_of_hi[hi_nib] {
            Some(bk) => bk,
            None => {
                if next_bucket == 8 {
                    return None;
                }
                bucket_of_hi[hi_nib] = Some(next_bucket);
                next_bucket += 1;
                next_bucket - 1
            }
        };
        lo[(b & 0xf) as usize] |= 1 << bucket;
        hi[hi_nib] |= 1 << bucket;
    }
    Some((lo, hi))
}

/// Builds the four double-shufti masks: one bucket per pair plus one bucket
/// per singleton first byte (singleton buckets accept any second byte).
///
/// The caller guarantees `singles.count() + pairs.len() <= 8`.
pub(crate) fn shufti_build_double_masks(
    singles: &ByteSet256,
    pairs: &BTreeSet<(u8, u8)>,
) -> ([u8; 16], [u8; 16], [u8; 16], [u8; 16]) {
    debug_assert!(singles.count() + pairs.len() <= 8);

    let mut lo1 = [0u8; 16];
    let mut hi1 = [0u8; 16];
    let mut lo2 = [0u8; 16];
    let mut hi2 = [0u8; 16];
    let mut bucket = 0u8;

    for &(a, b) in pairs {
        let bit = 1u8 << bucket;
        lo1[(a & 0xf) as usize] |= bit;
        hi1[(a >> 4) as usize] |= bit;
        lo2[(b & 0xf) as usize] |= bit;
        hi2[(b >> 4) as usize] |= bit;
        bucket += 1;
    }
    for a in singles.iter() {
        let bit = 1u8 << bucket;
        lo1[(a & 0xf) as usize] |= bit;
        hi1[(a >> 4) as usize] |= bit;
        for nib in 0..16 {
            lo2[nib] |= bit;
            hi2[nib] |= bit;
        }
        bucket += 1;
    }
    (lo1, hi1, lo2, hi2)
}

/// Builds the truffle category masks; exact for any byte set.
pub(crate) fn truffle_build_masks(set: &ByteSet256) -> ([u8; 16], [u8; 16]) {
    let mut mask1 = [0u8; 16];
    let mut mask2 = [0u8; 16];
    for b in set.iter() {
        if b < 0x80 {
            mask1[(b & 0xf) as usize] |= 1 << (b >> 4);
        } else {
            mask2[(b & 0xf) as usize] |= 1 << ((b >> 4) & 0x7);
        }
    }
    (mask1, mask2)
}

/// Encodes a scheme into its fixed-size pool record.
///
/// Record layout: tag byte at 0, vermicelli chars at 1..3, first mask pair
/// at 16/32, second mask pair at 48/64.
pub(crate) fn encode_into(scheme: &AccelScheme, out: &mut [u8]) {
    debug_assert_eq!(out.len(), ACCEL_AUX_BYTES);
    match *scheme {
        AccelScheme::None => out[0] = ACCEL_NONE,
        AccelScheme::RedTape => out[0] = ACCEL_RED_TAPE,
        AccelScheme::Verm { c } => {
            out[0] = ACCEL_VERM;
            out[1] = c;
        }
        AccelScheme::VermNocase { c } => {
            out[0] = ACCEL_VERM_NOCASE;
            out[1] = c;
        }
        AccelScheme::DVerm { c1, c2 } => {
            out[0] = ACCEL_DVERM;
            out[1] = c1;
            out[2] = c2;
        }
        AccelScheme::DVermNocase { c1, c2 } => {
            out[0] = ACCEL_DVERM_NOCASE;
            out[1] = c1;
            out[2] = c2;
        }
        AccelScheme::Shufti { lo, hi } => {
            out[0] = ACCEL_SHUFTI;
            out[16..32].copy_from_slice(&lo);
            out[32..48].copy_from_slice(&hi);
        }
        AccelScheme::DShufti { lo1, hi1, lo2, hi2 } => {
            out[0] = ACCEL_DSHUFTI;
            out[16..32].copy_from_slice(&lo1);
            out[32..48].copy_from_slice(&hi1);
            out[48..64].copy_from_slice(&lo2);
            out[64..80].copy_from_slice(&hi2);
        }
        AccelScheme::Truffle { mask1, mask2 } => {
            out[0] = ACCEL_TRUFFLE;
            out[16..32].copy_from_slice(&mask1);
            out[32..48].copy_from_slice(&mask2);
        }
    }
}

/// Decodes a pool record back into a scheme.
pub(crate) fn decode(bytes: &[u8]) -> AccelScheme {
    debug_assert!(bytes.len() >= ACCEL_AUX_BYTES);
    let mask = |off: usize| -> [u8; 16] { bytes[off..off + 16].try_into().expect("16 bytes") };
    match bytes[0] {
        ACCEL_NONE => AccelScheme::None,
        ACCEL_RED_TAPE => AccelScheme::RedTape,
        ACCEL_VERM => AccelScheme::Verm { c: bytes[1] },
        ACCEL_VERM_NOCASE => AccelScheme::VermNocase { c: bytes[1] },
        ACCEL_DVERM => AccelScheme::DVerm { c1: bytes[1], c2: bytes[2] },
        ACCEL_DVERM_NOCASE => AccelScheme::DVermNocase { c1: bytes[1], c2: bytes[2] },
        ACCEL_SHUFTI => AccelScheme::Shufti { lo: mask(16), hi: mask(32) },
        ACCEL_DSHUFTI => AccelScheme::DShufti {
            lo1: mask(16),
            hi1: mask(32),
            lo2: mask(48),
            hi2: mask(64),
        },
        ACCEL_TRUFFLE => AccelScheme::Truffle { mask1: mask(16), mask2: mask(32) },
        other => unreachable!("unknown accel tag {other}"),
    }
}

impl AccelScheme {
    /// Whether the kernel stops on `byte` (single-byte schemes) or on a pair
    /// beginning with `byte` (double schemes evaluate both positions via
    /// [`AccelScheme::stops_on_pair`]).
    pub fn stops_on(&self, byte: u8) -> bool {
        match *self {
            AccelScheme::None => true,
            AccelScheme::RedTape => false,
            AccelScheme::Verm { c } => byte == c,
            AccelScheme::VermNocase { c } => byte & CASE_CLEAR == c,
            AccelScheme::DVerm { c1, .. } => byte == c1,
            AccelScheme::DVermNocase { c1, .. } => byte & CASE_CLEAR == c1,
            AccelScheme::Shufti { lo, hi } => {
                lo[(byte & 0xf) as usize] & hi[(byte >> 4) as usize] != 0
            }
            AccelScheme::DShufti { lo1, hi1, .. } => {
                lo1[(byte & 0xf) as usize] & hi1[(byte >> 4) as usize] != 0
            }
            AccelScheme::Truffle { mask1, mask2 } => {
                if byte < 0x80 {
                    mask1[(byte & 0xf) as usize] & (1 << (byte >> 4)) != 0
                } else {
                    mask2[(byte & 0xf) as usize] & (1 << ((byte >> 4) & 0x7)) != 0
                }
            }
        }
    }

    /// Pair predicate for the double schemes.
    pub fn stops_on_pair(&self, a: u8, b: u8) -> bool {
        match *self {
            AccelScheme::DVerm { c1, c2 } => a == c1 && b == c2,
            AccelScheme::DVermNocase { c1, c2 } => {
                a & CASE_CLEAR == c1 && b & CASE_CLEAR == c2
            }
            AccelScheme::DShufti { lo1, hi1, lo2, hi2 } => {
                let m1 = lo1[(a & 0xf) as usize] & hi1[(a >> 4) as usize];
                let m2 = lo2[(b & 0xf) as usize] & hi2[(b >> 4) as usize];
                m1 & m2 != 0
            }
            _ => self.stops_on(a),
        }
    }

    /// Scalar reference scan: position of the first byte (or pair start) the
    /// kernel would stop at, or `None` to skip the whole buffer. Mirrors the
    /// SIMD kernels' contracts for validation and diagnostics.
    pub fn reference_scan(&self, haystack: &[u8]) -> Option<usize> {
        match *self {
            AccelScheme::None => {
                if haystack.is_empty() {
                    None
                } else {
                    Some(0)
                }
            }
            AccelScheme::RedTape => None,
            AccelScheme::Verm { c } => memchr::memchr(c, haystack),
            AccelScheme::VermNocase { c } => memchr::memchr2(c, c | 0x20, haystack),
            AccelScheme::DVerm { .. }
            | AccelScheme::DVermNocase { .. }
            | AccelScheme::DShufti { .. } => {
                // Double kernels stop at a matching pair, or at a lone first
                // byte in the final position.
                let n = haystack.len();
                for i in 0..n {
                    let a = haystack[i];
                    if i + 1 < n {
                        if self.stops_on_pair(a, haystack[i + 1]) {
                            return Some(i);
                        }
                    } else if self.stops_on(a) {
                        return Some(i);
                    }
                }
                None
            }
            _ => haystack.iter().position(|&b| self.stops_on(b)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfa::{DfaKind, DfaState, TOP};

    /// DFA over symbols {0: other, 1: 'a', 2: 'b', 3: TOP}. State 1 loops on
    /// everything but 'a'; 'a' goes to state 2 which reports and returns.
    fn looping_dfa(kind: DfaKind) -> RawDfa {
        let mut remap = [0u16; ALPHABET + 1];
        remap[b'a' as usize] = 1;
        remap[b'b' as usize] = 2;
        remap[TOP] = 3;
        let mut start = DfaState::filled(4, 1);
        start.next[1] = 2;
        let mut accept = DfaState::filled(4, 1);
        accept.reports.insert(42);
        RawDfa {
            kind,
            states: vec![DfaState::filled(4, DEAD_STATE), start, accept],
            start_anchored: 1,
            start_floating: 1,
            alpha_size: 4,
            alpha_remap: remap,
        }
    }

    #[test]
    fn escape_sets_of_self_looping_state() {
        let raw = looping_dfa(DfaKind::Callback);
        let esc = find_escape_strings(&raw, 1);
        assert_eq!(esc.outs.iter().collect::<Vec<_>>(), vec![b'a']);
        // Successor reports and the automaton generates callbacks.
        assert!(esc.outs2_broken);
    }

    #[test]
    fn verm_for_single_escape() {
        let raw = looping_dfa(DfaKind::Callback);
        assert!(is_accel(&raw, 1, 1));
        assert_eq!(build_accel(&raw, 1), AccelScheme::Verm { c: b'a' });
    }

    #[test]
    fn report_states_not_accelerable_for_callback_kinds() {
        let raw = looping_dfa(DfaKind::Callback);
        assert!(!is_accel(&raw, 1, 2));
        let raw = looping_dfa(DfaKind::Accumulate);
        assert!(is_accel(&raw, 1, 2));
    }

    #[test]
    fn dead_state_never_accelerable() {
        let raw = looping_dfa(DfaKind::Callback);
        assert!(!is_accel(&raw, 1, DEAD_STATE));
    }

    #[test]
    fn dverm_for_accumulating_pair() {
        // Accumulate kind so the reporting successor does not poison pairs.
        let raw = looping_dfa(DfaKind::Accumulate);
        let esc = find_escape_strings(&raw, 1);
        assert!(!esc.outs2_broken);
        // The successor's row differs from state 1's only on 'a', so the
        // lone two-deep escape pair is ('a', 'a').
        assert_eq!(build_accel(&raw, 1), AccelScheme::DVerm { c1: b'a', c2: b'a' });
    }

    #[test]
    fn red_tape_for_dead_end() {
        let mut raw = looping_dfa(DfaKind::Callback);
        // Make state 2 loop on every byte symbol.
        for sym in 0..3 {
            raw.states[2].next[sym] = 2;
        }
        let esc = find_escape_strings(&raw, 2);
        assert!(esc.outs.is_empty());
        assert_eq!(build_accel(&raw, 2), AccelScheme::RedTape);
    }

    #[test]
    fn sds_proxy_prefers_floating_start() {
        let raw = looping_dfa(DfaKind::Callback);
        assert_eq!(get_sds_or_proxy(&raw), 1);
    }

    #[test]
    fn sds_proxy_walks_to_self_loop() {
        // Chain: 1 -> 2 on everything; 2 self-loops on symbol 0.
        let mut remap = [0u16; ALPHABET + 1];
        remap[b'x' as usize] = 1;
        remap[TOP] = 2;
        let start = DfaState::filled(3, 2);
        let mut looper = DfaState::filled(3, 2);
        looper.next[1] = 1;
        let raw = RawDfa {
            kind: DfaKind::Callback,
            states: vec![DfaState::filled(3, DEAD_STATE), start, looper],
            start_anchored: 1,
            start_floating: DEAD_STATE,
            alpha_size: 3,
            alpha_remap: remap,
        };
        assert_eq!(get_sds_or_proxy(&raw), 2);
    }

    #[test]
    fn sds_proxy_gives_up_on_acyclic_chain() {
        // 1 -> 2 -> dead with no self loops anywhere.
        let mut remap = [0u16; ALPHABET + 1];
        remap[TOP] = 1;
        let start = DfaState::filled(2, 2);
        let two = DfaState::filled(2, DEAD_STATE);
        let raw = RawDfa {
            kind: DfaKind::Callback,
            states: vec![DfaState::filled(2, DEAD_STATE), start, two],
            start_anchored: 1,
            start_floating: DEAD_STATE,
            alpha_size: 2,
            alpha_remap: remap,
        };
        assert_eq!(get_sds_or_proxy(&raw), DEAD_STATE);
    }

    #[test]
    fn shufti_masks_are_exact() {
        let set = ByteSet256::from_bytes([b'a', b'b', b'Z', 0x03]);
        let (lo, hi) = shufti_build_masks(&set).expect("few hi nibbles");
        let scheme = AccelScheme::Shufti { lo, hi };
        for b in 0u16..=255 {
            assert_eq!(scheme.stops_on(b as u8), set.contains(b as u8), "byte {b:#x}");
        }
    }

    #[test]
    fn shufti_fails_past_eight_hi_nibbles() {
        let set = ByteSet256::from_bytes((0..9).map(|i| (i as u8) << 4));
        assert!(shufti_build_masks(&set).is_none());
    }

    #[test]
    fn truffle_masks_are_exact_for_any_set() {
        let set = ByteSet256::from_bytes((0..=255u8).filter(|b| b % 3 == 0));
        let (mask1, mask2) = truffle_build_masks(&set);
        let scheme = AccelScheme::Truffle { mask1, mask2 };
        for b in 0u16..=255 {
            assert_eq!(scheme.stops_on(b as u8), set.contains(b as u8), "byte {b:#x}");
        }
    }

    #[test]
    fn double_shufti_pairs_and_singles() {
        let mut pairs = BTreeSet::new();
        pairs.insert((b'a', b'b'));
        pairs.insert((b'c', b'd'));
        let singles = ByteSet256::from_bytes([b'z']);
        let (lo1, hi1, lo2, hi2) = shufti_build_double_masks(&singles, &pairs);
        let scheme = AccelScheme::DShufti { lo1, hi1, lo2, hi2 };
        assert!(scheme.stops_on_pair(b'a', b'b'));
        assert!(scheme.stops_on_pair(b'c', b'd'));
        assert!(!scheme.stops_on_pair(b'a', b'd'));
        // Singleton accepts any second byte.
        assert!(scheme.stops_on_pair(b'z', 0x00));
        assert!(scheme.stops_on_pair(b'z', 0xff));
        assert!(!scheme.stops_on_pair(b'q', b'b'));
    }

    #[test]
    fn encode_decode_roundtrip() {
        let schemes = [
            AccelScheme::None,
            AccelScheme::RedTape,
            AccelScheme::Verm { c: b'x' },
            AccelScheme::VermNocase { c: b'Q' },
            AccelScheme::DVerm { c1: 1, c2: 2 },
            AccelScheme::DVermNocase { c1: b'A', c2: b'B' },
            AccelScheme::Shufti { lo: [1; 16], hi: [2; 16] },
            AccelScheme::DShufti { lo1: [1; 16], hi1: [2; 16], lo2: [3; 16], hi2: [4; 16] },
            AccelScheme::Truffle { mask1: [5; 16], mask2: [6; 16] },
        ];
        let mut buf = [0u8; ACCEL_AUX_BYTES];
        for s in &schemes {
            buf.fill(0);
            encode_into(s, &mut buf);
            assert_eq!(&decode(&buf), s);
        }
    }

    #[test]
    fn reference_scan_behaviour() {
        let verm = AccelScheme::Verm { c: b'k' };
        assert_eq!(verm.reference_scan(b"abckd"), Some(3));
        assert_eq!(verm.reference_scan(b"abcd"), None);

        let nocase = AccelScheme::VermNocase { c: b'K' };
        assert_eq!(nocase.reference_scan(b"zzkz"), Some(2));
        assert_eq!(nocase.reference_scan(b"zzKz"), Some(2));

        let dverm = AccelScheme::DVerm { c1: b'a', c2: b'b' };
        assert_eq!(dverm.reference_scan(b"xxaab"), Some(3));
        // Lone first byte at the end still stops the skip.
        assert_eq!(dverm.reference_scan(b"xxa"), Some(2));

        assert_eq!(AccelScheme::RedTape.reference_scan(b"anything"), None);
        assert_eq!(AccelScheme::None.reference_scan(b"x"), Some(0));
    }
}
