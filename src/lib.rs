//! Multi-pattern DFA matcher core: bytecode compilation and per-scan
//! scratch assembly.
//!
//! The crate covers the two artifact-producing halves of a multi-pattern
//! matching engine:
//!
//! - **Compilation**: [`mcclellan::compile`] lowers a fully determinized
//!   automaton ([`dfa::RawDfa`]) into a packed, cache-friendly bytecode blob
//!   with mixed-width transition tables, delta-compressed (Sherman) states,
//!   pooled report lists, and per-state acceleration descriptors.
//! - **Scratch assembly**: [`scratch::alloc_scratch`] derives, from a
//!   [`db::Database`]'s declared capacities, the exact layout of the
//!   per-thread working region every scan needs, and grows it monotonically
//!   as further databases raise requirements.
//!
//! Pattern parsing, determinization, literal matching, and the scan loop
//! itself are external collaborators; this crate defines the contracts they
//! consume (the blob layout read through [`mcclellan::McClellan`], and the
//! scratch accessors).
//!
//! # Invariants
//! - Compiled blobs are immutable after construction; all mutable scan state
//!   lives in [`scratch::Scratch`], which is single-threaded and owned by
//!   one caller at a time.
//! - Configuration ([`api::Grey`]) is passed explicitly; there is no
//!   process-wide state.
//! - All offsets stored in artifacts are relative to their region's origin.

pub mod api;
pub mod db;
pub mod dfa;
pub mod mcclellan;
pub mod scratch;
pub mod stdx;
#[cfg(test)]
pub mod test_utils;
pub mod util;

pub use api::{
    CompileContext, CompileError, Grey, ReportId, ScanMode, ScratchError, StateId, DEAD_STATE,
};
pub use db::{Database, EngineLimits};
pub use dfa::{DfaKind, DfaState, RawDfa};
pub use mcclellan::{compile, AccelScheme, Blob, CompileReport, CompiledDfa, McClellan};
pub use scratch::{
    alloc_scratch, clone_scratch, free_scratch, scratch_size, Scratch, ScratchCaps,
};
