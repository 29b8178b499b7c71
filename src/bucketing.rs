//! Deterministic bucketing for rollout strategies and variant selection.
//!
//! The normalization here is a cross-implementation contract: independently implemented
//! evaluators sharing a configuration must agree bit-for-bit on bucket assignment, so the hash
//! function, the `group:identifier` input shape, and the seeds must not change.

use std::io::Cursor;

/// Seed for variant bucketing. Distinct from the strategy seed (0) so variant buckets do not
/// correlate with rollout buckets for the same identifier.
const VARIANT_SEED: u32 = 86_028_157;

/// Normalize `(identifier, group)` into `1..=100` for percentage rollouts.
pub fn normalized_strategy_value(identifier: &str, group: &str) -> u32 {
    normalized_value(identifier, group, 100, 0)
}

/// Normalize `(identifier, group)` into `1..=total_weight` for variant selection.
///
/// Returns 0 when `total_weight` is 0; callers reject empty weight sets before selecting.
pub fn normalized_variant_value(identifier: &str, group: &str, total_weight: u32) -> u32 {
    normalized_value(identifier, group, total_weight, VARIANT_SEED)
}

fn normalized_value(identifier: &str, group: &str, normalizer: u32, seed: u32) -> u32 {
    if normalizer == 0 {
        return 0;
    }
    let input = format!("{group}:{identifier}");
    let hash = murmur3::murmur3_32(&mut Cursor::new(input), seed)
        .expect("reading from an in-memory cursor should not fail");
    hash % normalizer + 1
}
