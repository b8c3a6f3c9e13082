//! Sherman selection: choosing which states become row deltas.
//!
//! A Sherman state drops its dense transition row and stores only the
//! positions where it differs from a "daddy" state, trading a bounded
//! scan-time indirection for table space. This module scores daddy
//! candidates and decides promotion; encoding happens in `compile`.
//!
//! # Invariants
//! - A daddy is always an earlier-numbered, non-Sherman state, so Sherman
//!   lookups never chain.
//! - Hot states stay dense: states in the ID windows right after either
//!   start (when the anchored start is cyclic-near), and states with wide
//!   self-loops, are never promoted.

use crate::api::{Grey, StateId, DEAD_STATE};
use crate::dfa::{RawDfa, ALPHABET};

use super::compile::DfaInfo;

/// Most row overrides a Sherman entry can store.
pub(crate) const MAX_SHERMAN_LIST_LEN: u16 = 8;

/// Self-loop width (in bytes) past which a state is considered too hot to
/// be a Sherman state.
const MAX_SHERMAN_SELF_LOOP: usize = 20;

/// Whether `root` has a cyclic state within two hops.
///
/// Used to spot anchored starts whose neighbourhood is revisited constantly;
/// the states numbered just after such a start are banned from promotion.
/// This leans on the upstream determinizer numbering states in BFS order.
pub(crate) fn is_cyclic_near(raw: &RawDfa, root: StateId) -> bool {
    let alphasize = raw.impl_alpha_size();
    let root_row = &raw.states[root as usize].next;
    for s in 0..alphasize {
        let succ_id = root_row[s as usize];
        if succ_id == DEAD_STATE {
            continue;
        }
        let succ = &raw.states[succ_id as usize];
        for t in 0..alphasize {
            let next = succ.next[t as usize];
            if next == root || next == succ_id {
                return true;
            }
        }
    }
    false
}

fn add_if_earlier(dest: &mut Vec<StateId>, candidate: StateId, max: StateId) {
    if candidate < max && !dest.contains(&candidate) {
        dest.push(candidate);
    }
}

fn add_successors(dest: &mut Vec<StateId>, raw: &RawDfa, source: StateId, curr_id: StateId) {
    let alphasize = raw.impl_alpha_size();
    for s in 0..alphasize as usize {
        add_if_earlier(dest, raw.states[source as usize].next[s], curr_id);
    }
}

/// Scores daddy candidates for `curr_id`, records the best one, and promotes
/// the state to Sherman when the leftover difference list fits.
pub(crate) fn find_better_daddy(
    info: &mut DfaInfo<'_>,
    curr_id: StateId,
    using8bit: bool,
    any_cyclic_near_anchored_state: bool,
    grey: &Grey,
) {
    if !grey.allow_sherman_states {
        return;
    }

    let width: u16 = if using8bit { 1 } else { 2 };
    let alphasize = info.raw.impl_alpha_size();

    // Keep the frequently visited neighbourhoods of the starts dense. The ID
    // arithmetic assumes the upstream determinizer numbered states in BFS
    // order from the starts.
    if info.raw.start_anchored != DEAD_STATE
        && any_cyclic_near_anchored_state
        && (curr_id as u32) < alphasize as u32 * 3
    {
        return;
    }
    if info.raw.start_floating != DEAD_STATE
        && curr_id >= info.raw.start_floating
        && (curr_id as u32) < info.raw.start_floating as u32 + alphasize as u32 * 3
    {
        return;
    }

    let full_state_size = width * alphasize;
    let max_list_len =
        MAX_SHERMAN_LIST_LEN.min(full_state_size.saturating_sub(2) / (width + 1));

    let mut hinted: Vec<StateId> = Vec::new();
    add_if_earlier(&mut hinted, DEAD_STATE, curr_id);
    add_if_earlier(&mut hinted, info.raw.start_anchored, curr_id);
    add_if_earlier(&mut hinted, info.raw.start_floating, curr_id);

    let mydaddy = info.raw.states[curr_id as usize].daddy;
    if mydaddy != DEAD_STATE {
        add_if_earlier(&mut hinted, mydaddy, curr_id);
        add_successors(&mut hinted, info.raw, mydaddy, curr_id);
        let mygranddaddy = info.raw.states[mydaddy as usize].daddy;
        if mygranddaddy != DEAD_STATE {
            add_if_earlier(&mut hinted, mygranddaddy, curr_id);
            add_successors(&mut hinted, info.raw, mygranddaddy, curr_id);
        }
    }
    hinted.sort_unstable();

    let mut best_score: u16 = 0;
    let mut best_daddy: StateId = 0;
    for &donor in &hinted {
        debug_assert!(donor < curr_id);
        if info.is_sherman(donor) {
            continue;
        }

        let mut score: u16 = 0;
        for s in 0..alphasize as usize {
            if info.raw.states[curr_id as usize].next[s]
                == info.raw.states[donor as usize].next[s]
            {
                score += 1;
            }
        }

        // Candidates are visited in ascending ID order, so a strict
        // improvement keeps the lowest ID among equal scores. Lower IDs give
        // stability amongst potential siblings.
        if score > best_score {
            best_daddy = donor;
            best_score = score;
            if score == alphasize {
                break;
            }
        }
    }

    info.raw.states[curr_id as usize].daddy = best_daddy;
    info.extra[curr_id as usize].daddytaken = best_score;

    if best_score + max_list_len < alphasize {
        return;
    }

    if info.is_sherman(best_daddy) {
        return;
    }

    let mut self_loop_width = 0usize;
    for i in 0..ALPHABET {
        let sym = info.raw.alpha_remap[i] as usize;
        if info.raw.states[curr_id as usize].next[sym] == curr_id {
            self_loop_width += 1;
        }
    }
    if self_loop_width > MAX_SHERMAN_SELF_LOOP {
        return;
    }

    info.extra[curr_id as usize].sherman = true;
}
