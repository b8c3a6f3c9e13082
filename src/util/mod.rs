//! Low-level layout and allocation utilities.
//!
//! Everything here is byte-level plumbing shared by the bytecode builder and
//! the scratch assembler. The helpers are intentionally explicit about safety
//! and layout assumptions; we avoid external "bytemuck"-style dependencies so
//! the invariants are visible at the call site and easy to audit.

pub mod layout;

pub use layout::{align_up, AlignedRegion, Pod, RegionError, Zeroable};
