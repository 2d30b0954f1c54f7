// THEORY:
// The `selection` module is the final, stateless stage of size detection. The
// candidate sweep collects evidence (perfect matches, good matches with their
// differences, and whether the original size itself round-trips); this module
// turns that evidence into exactly one `Detection`.
//
// Priority order:
// 1.  **Perfect matches**: the smallest perfect candidate wins. The original size
//     only beats it when the original width is smaller still.
// 2.  **Original size**: a perfect original with no perfect candidate is returned
//     as-is, non-square dimensions included.
// 3.  **Good matches**: the lowest difference wins, but every good match whose
//     difference lies within `similarity_threshold` (relative) of that minimum
//     forms a group, and the smallest size of the group is returned. The group is
//     measured against the minimum only, never pairwise.
// 4.  **Fallback**: nothing matched.

use crate::core_modules::pixel_art_detector::{Detection, FallbackReason, Resolution};

/// Evidence gathered by the candidate sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepOutcome {
    /// Candidate sizes whose round trip was exact, in test order.
    pub perfect: Vec<u32>,
    /// Candidate sizes within tolerance, with their (compensated) difference.
    pub good: Vec<(u32, f64)>,
    /// The original dimensions, present only when they round-trip exactly.
    pub original: Option<Resolution>,
}

pub mod selection {
    use super::*;

    /// Applies the selection policy. `fallback` is the downscale target used when
    /// no evidence points at a native resolution.
    pub fn select_resolution(outcome: &SweepOutcome, similarity_threshold: f64, fallback: u32) -> Detection {
        if let Some(&best) = outcome.perfect.iter().min() {
            return match outcome.original {
                Some(original) if original.width <= best => Detection::Native(original),
                _ => Detection::Native(Resolution::square(best)),
            };
        }

        if let Some(original) = outcome.original {
            return Detection::Native(original);
        }

        if let Some(&(_, min_difference)) = outcome.good.iter().min_by(|a, b| a.1.total_cmp(&b.1)) {
            let allowance = min_difference * similarity_threshold;
            let chosen = outcome
                .good
                .iter()
                .filter(|(_, difference)| (difference - min_difference).abs() <= allowance)
                .map(|&(size, _)| size)
                .min();

            if let Some(size) = chosen {
                return Detection::Native(Resolution::square(size));
            }
        }

        Detection::Fallback { size: fallback, reason: FallbackReason::NoMatch }
    }
}
