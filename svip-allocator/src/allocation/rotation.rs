//! Thematic rotation.
//!
//! Ranks themes by the mean acceleration score of their securities, converts
//! each mean into a Z-score against the cross-theme distribution and tilts
//! theme members by a banded adjustment:
//!
//! | Z                     | adjustment |
//! |-----------------------|------------|
//! | Z >= strong           | +strong    |
//! | mild <= Z < strong    | +mild      |
//! | -strong < Z <= -mild  | -mild      |
//! | Z <= -strong          | -strong    |
//! | otherwise             | 0          |
//!
//! Rotation runs after cap projection and is not re-projected.

use std::collections::{BTreeMap, HashMap};

use svip_common::config::RotationConfig;

use super::types::{RotationSignal, SecurityInput};

/// Map a Z-score to its weight adjustment.
pub fn adjustment_for(z: f64, config: &RotationConfig) -> f64 {
    if z >= config.z_strong {
        config.strong_adjustment
    } else if z >= config.z_mild {
        config.mild_adjustment
    } else if z <= -config.z_strong {
        -config.strong_adjustment
    } else if z <= -config.z_mild {
        -config.mild_adjustment
    } else {
        0.0
    }
}

/// Mean acceleration score per named theme.
///
/// Securities without a score or without a theme do not participate.
pub fn theme_acceleration(securities: &[SecurityInput]) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for security in securities {
        let theme = security.theme.trim();
        let Some(score) = security.acceleration_score() else {
            continue;
        };
        if theme.is_empty() || !score.is_finite() {
            continue;
        }
        let entry = sums.entry(theme.to_string()).or_insert((0.0, 0));
        entry.0 += score;
        entry.1 += 1;
    }

    sums.into_iter()
        .map(|(theme, (sum, count))| (theme, sum / count as f64))
        .collect()
}

/// Rotation signals, sorted by Z-score, highest first.
///
/// A single theme, or a spread below `min_std`, standardizes with a unit
/// deviation so every Z stays finite.
pub fn compute_rotation_signals(
    securities: &[SecurityInput],
    config: &RotationConfig,
) -> Vec<RotationSignal> {
    let means = theme_acceleration(securities);
    if means.is_empty() {
        return Vec::new();
    }

    let n = means.len() as f64;
    let global_mean = means.values().sum::<f64>() / n;
    let std = if means.len() > 1 {
        (means.values().map(|m| (m - global_mean).powi(2)).sum::<f64>() / n).sqrt()
    } else {
        1.0
    };
    let std = if std < config.min_std { 1.0 } else { std };

    let mut signals: Vec<RotationSignal> = means
        .into_iter()
        .map(|(theme, avg_acceleration)| {
            let z_score = (avg_acceleration - global_mean) / std;
            RotationSignal {
                theme,
                avg_acceleration,
                z_score,
                weight_adjustment: adjustment_for(z_score, config),
            }
        })
        .collect();

    signals.sort_by(|a, b| b.z_score.total_cmp(&a.z_score));

    tracing::debug!(
        themes = signals.len(),
        global_mean,
        std,
        "Rotation signals computed"
    );

    signals
}

/// Apply the theme tilt to positive weights; never produces a negative weight.
pub fn apply_rotation(
    securities: &[SecurityInput],
    weights: &[f64],
    signals: &[RotationSignal],
) -> Vec<f64> {
    let adjustments: HashMap<&str, f64> = signals
        .iter()
        .map(|s| (s.theme.as_str(), s.weight_adjustment))
        .collect();

    securities
        .iter()
        .zip(weights)
        .map(|(security, weight)| {
            if *weight <= 0.0 {
                return *weight;
            }
            let adjustment = adjustments
                .get(security.theme.trim())
                .copied()
                .unwrap_or(0.0);
            (weight * (1.0 + adjustment)).max(0.0)
        })
        .collect()
}
