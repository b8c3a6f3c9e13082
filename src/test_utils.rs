//! Test-only helpers.

/// Resolves the proptest case count for a suite whose default is `default`.
///
/// `PROPTEST_CASES` overrides everything; CI runs the full default; local
/// runs are clamped low so `cargo test` stays quick.
pub fn proptest_cases(default: u32) -> u32 {
    if let Ok(value) = std::env::var("PROPTEST_CASES") {
        if let Ok(n) = value.parse::<u32>() {
            return n.max(1);
        }
    }
    if std::env::var_os("CI").is_some() {
        default.max(1)
    } else {
        default.clamp(1, 8)
    }
}
