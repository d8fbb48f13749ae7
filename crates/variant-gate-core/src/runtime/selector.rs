// crates/variant-gate-core/src/runtime/selector.rs
// ============================================================================
// Module: Variant Gate Creative Selector
// Description: Weighted-random creative selection with deterministic fallback.
// Purpose: Pick one creative from an ordered, weighted list.
// Dependencies: crate::core, rand
// ============================================================================

//! ## Overview
//! Selection draws a uniform value in `[0, total_weight)` and scans the
//! creative list in order, subtracting each weight, returning the first
//! index where the remainder drops to or below zero. When every weight is
//! zero (or missing), index 0 is returned deterministically to avoid a
//! division by zero and wasted rolls. The draw uses a non-cryptographic,
//! non-deterministic source and need not be reproducible across calls.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rand::Rng;

use crate::core::Creative;

// ============================================================================
// SECTION: Selection
// ============================================================================

/// Selects a creative by weighted random draw using the thread RNG.
///
/// Returns `None` for an empty list.
#[must_use]
pub fn select_creative(creatives: &[Creative]) -> Option<(u32, &Creative)> {
    select_creative_with_rng(creatives, &mut rand::thread_rng())
}

/// Selects a creative by weighted random draw using the provided RNG.
///
/// Negative weights are clamped to zero so a single bad row cannot skew the
/// running remainder. Returns `None` for an empty list.
#[must_use]
pub fn select_creative_with_rng<'a, R: Rng>(
    creatives: &'a [Creative],
    rng: &mut R,
) -> Option<(u32, &'a Creative)> {
    let first = creatives.first()?;
    let total: f64 = creatives.iter().map(|creative| creative.distribution.max(0.0)).sum();
    if total <= 0.0 || !total.is_finite() {
        return Some((0, first));
    }
    let mut remainder = rng.gen_range(0.0..total);
    for (index, creative) in creatives.iter().enumerate() {
        remainder -= creative.distribution.max(0.0);
        if remainder <= 0.0 {
            let index = u32::try_from(index).unwrap_or(u32::MAX);
            return Some((index, creative));
        }
    }
    // Floating-point accumulation can leave a hair of remainder after the
    // last subtraction; fall back to the final creative.
    let last_index = u32::try_from(creatives.len() - 1).unwrap_or(u32::MAX);
    creatives.last().map(|creative| (last_index, creative))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
