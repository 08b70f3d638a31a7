//! Constraint Projector.
//!
//! Enforces the cap hierarchy on normalized weights, in fixed order:
//!
//! 1. single security (market table), iterative clip and redistribute
//! 2. theme bucket (market table), one proportional scaling pass
//! 3. sector (global), one proportional scaling pass
//!
//! Steps 2 and 3 only ever shrink weights, so they cannot undo step 1.

use std::collections::BTreeMap;

use svip_common::config::{AllocationConfig, MarketParams};

use super::types::{ProjectionSummary, SecurityInput};

/// Cap projection for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintProjector {
    caps: MarketParams,
    sector_cap: f64,
    max_passes: u32,
    tolerance: f64,
}

impl ConstraintProjector {
    /// Build a projector for the given market caps.
    pub fn new(caps: MarketParams, config: &AllocationConfig) -> Self {
        Self {
            caps,
            sector_cap: config.sector_cap,
            max_passes: config.max_projection_passes,
            tolerance: config.convergence_tolerance,
        }
    }

    /// Run all three caps. `weights` is aligned with `securities`.
    pub fn project(
        &self,
        securities: &[SecurityInput],
        weights: &[f64],
    ) -> (Vec<f64>, ProjectionSummary) {
        let (capped, summary) = self.cap_single(weights);

        let themes: Vec<&str> = securities.iter().map(SecurityInput::theme_key).collect();
        let capped = cap_groups(&capped, &themes, self.caps.theme_bucket_cap);

        let sectors: Vec<&str> = securities.iter().map(SecurityInput::sector_key).collect();
        let capped = cap_groups(&capped, &sectors, self.sector_cap);

        (capped, summary)
    }

    /// Clip every weight to the single-security cap, redistributing the
    /// clipped overflow over holdings still strictly below the cap in
    /// proportion to their current weight.
    ///
    /// Overflow that no holding can absorb is released (it becomes cash), as
    /// is any overflow at or below `convergence_tolerance`.
    /// When the pass bound runs out the best approximation is returned and the
    /// remaining excess is reported in the summary.
    pub fn cap_single(&self, weights: &[f64]) -> (Vec<f64>, ProjectionSummary) {
        let cap = self.caps.single_security_cap;
        let mut weights = weights.to_vec();
        let mut summary = ProjectionSummary::default();

        for pass in 1..=self.max_passes {
            summary.passes = pass;

            let mut overflow = 0.0;
            for w in weights.iter_mut().filter(|w| **w > cap) {
                overflow += *w - cap;
                *w = cap;
            }

            if overflow <= self.tolerance {
                summary.converged = true;
                break;
            }

            let absorbing: f64 = weights.iter().filter(|w| **w > 0.0 && **w < cap).sum();
            if absorbing <= 0.0 {
                summary.unabsorbed_overflow += overflow;
                summary.converged = true;
                break;
            }

            for w in weights.iter_mut().filter(|w| **w > 0.0 && **w < cap) {
                *w += overflow * (*w / absorbing);
            }
        }

        if !summary.converged {
            summary.residual_excess = weights.iter().map(|w| (w - cap).max(0.0)).sum();
            summary.converged = summary.residual_excess <= self.tolerance;
        }

        tracing::debug!(
            cap,
            passes = summary.passes,
            converged = summary.converged,
            unabsorbed = summary.unabsorbed_overflow,
            residual = summary.residual_excess,
            "Single-security cap projected"
        );

        (weights, summary)
    }
}

/// Sum weights per group key.
pub fn group_totals<'a>(weights: &[f64], keys: &[&'a str]) -> BTreeMap<&'a str, f64> {
    let mut totals = BTreeMap::new();
    for (weight, key) in weights.iter().zip(keys) {
        *totals.entry(*key).or_insert(0.0) += weight;
    }
    totals
}

/// Scale every member of a group whose total exceeds `cap` by `cap / total`.
pub fn cap_groups(weights: &[f64], keys: &[&str], cap: f64) -> Vec<f64> {
    let totals = group_totals(weights, keys);

    let over: Vec<_> = totals.iter().filter(|(_, total)| **total > cap).collect();
    if !over.is_empty() {
        tracing::debug!(cap, groups = over.len(), "Scaling groups above cap");
    }

    weights
        .iter()
        .zip(keys)
        .map(|(weight, key)| match totals.get(key) {
            Some(total) if *total > cap => weight * (cap / total),
            _ => *weight,
        })
        .collect()
}
