#![allow(dead_code)]
//! Small, self-contained data structures used across the crate.
//!
//! # Scope
//! `stdx` hosts narrow utilities shared by the compiler and the scratch
//! assembler. They are tuned for predictable memory use rather than
//! general-purpose ergonomics.
//!
//! # Module map
//! - `byteset`: fixed 256-bit byte set used for escape and reach analysis.
//! - `multibit`: sizing rules for the bit structures carved into scratch.

pub mod byteset;
pub mod multibit;

pub use byteset::ByteSet256;
pub use multibit::{fatbit_bytes, mmbit_bytes};
