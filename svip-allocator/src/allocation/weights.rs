//! Raw weight calculation and equity normalization.
//!
//! ```text
//! quality_factor = clamp01((score - floor) / (ceiling - floor))
//! raw_weight     = quality_factor x valuation_factor x phase_factor   (Core only)
//! target_weight  = raw_weight / sum(raw_weight) x adjusted_equity
//! ```

use svip_common::config::AllocationConfig;

use super::types::{Pool, PortfolioInput, SecurityInput};

/// Piecewise-linear map of a quality score onto [0, 1].
///
/// 0 at or below `floor`, 1 at or above `ceiling`. A missing score maps to 0.
pub fn quality_factor(score: Option<f64>, floor: f64, ceiling: f64) -> f64 {
    let Some(score) = score else {
        return 0.0;
    };
    let span = ceiling - floor;
    if !(score.is_finite() && span > 0.0) {
        return 0.0;
    }
    ((score - floor) / span).clamp(0.0, 1.0)
}

/// Unnormalized multiplicative weight of one security.
///
/// Watch and Block securities carry no raw weight.
pub fn raw_weight(security: &SecurityInput, pool: Pool, config: &AllocationConfig) -> f64 {
    if pool != Pool::Core {
        return 0.0;
    }

    let quality = quality_factor(
        security.quality_score(),
        config.quality_floor,
        config.quality_ceiling,
    );
    let weight = quality * security.valuation_factor() * security.phase_factor();

    if weight.is_finite() {
        weight.max(0.0)
    } else {
        0.0
    }
}

/// Raw weights, aligned with `securities`.
pub fn raw_weights(
    securities: &[SecurityInput],
    pools: &[Pool],
    config: &AllocationConfig,
) -> Vec<f64> {
    securities
        .iter()
        .zip(pools)
        .map(|(security, pool)| raw_weight(security, *pool, config))
        .collect()
}

/// Equity budget after risk multipliers and the absolute ceiling.
pub fn adjusted_equity(base_target_equity: f64, portfolio: &PortfolioInput, max_equity: f64) -> f64 {
    let equity = base_target_equity * portfolio.macro_risk_factor * portfolio.tail_risk_factor;
    if equity.is_finite() {
        equity.clamp(0.0, max_equity)
    } else {
        0.0
    }
}

/// Scale raw weights proportionally so they sum to `equity`.
///
/// All zeros when the raw weights sum to zero.
pub fn normalize(raw: &[f64], equity: f64) -> Vec<f64> {
    let total: f64 = raw.iter().sum();
    if total <= 0.0 {
        return vec![0.0; raw.len()];
    }
    raw.iter().map(|w| w / total * equity).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::types::{Phase, QualityTier, ValuationTier};

    const EPS: f64 = 1e-12;

    #[test]
    fn test_quality_factor_piecewise() {
        assert_eq!(quality_factor(Some(50.0), 65.0, 90.0), 0.0);
        assert_eq!(quality_factor(Some(65.0), 65.0, 90.0), 0.0);
        assert!((quality_factor(Some(75.0), 65.0, 90.0) - 0.4).abs() < EPS);
        assert_eq!(quality_factor(Some(90.0), 65.0, 90.0), 1.0);
        assert_eq!(quality_factor(Some(99.0), 65.0, 90.0), 1.0);
        assert_eq!(quality_factor(None, 65.0, 90.0), 0.0);
    }

    #[test]
    fn test_two_security_worked_example() {
        let config = AllocationConfig::default();
        let a = SecurityInput::new("A")
            .with_quality(90.0, QualityTier::Core)
            .with_valuation(ValuationTier::A, 1.0)
            .with_phase(Phase::Accelerating, 1.2);
        let b = SecurityInput::new("B")
            .with_quality(75.0, QualityTier::Core)
            .with_valuation(ValuationTier::B, 0.6)
            .with_phase(Phase::Steady, 1.0);

        let raw = raw_weights(&[a, b], &[Pool::Core, Pool::Core], &config);
        assert!((raw[0] - 1.2).abs() < EPS);
        assert!((raw[1] - 0.24).abs() < EPS);

        let weights = normalize(&raw, 0.80);
        assert!((weights[0] - 1.2 / 1.44 * 0.80).abs() < EPS);
        assert!((weights[1] - 0.24 / 1.44 * 0.80).abs() < EPS);
        assert!((weights.iter().sum::<f64>() - 0.80).abs() < EPS);
    }

    #[test]
    fn test_non_core_pools_get_no_raw_weight() {
        let config = AllocationConfig::default();
        let security = SecurityInput::new("W")
            .with_quality(95.0, QualityTier::Core)
            .with_valuation(ValuationTier::A, 1.0);
        assert_eq!(raw_weight(&security, Pool::Watch, &config), 0.0);
        assert_eq!(raw_weight(&security, Pool::Block, &config), 0.0);
        assert_eq!(raw_weight(&security, Pool::Core, &config), 1.0);
    }

    #[test]
    fn test_missing_factors_use_defaults() {
        let config = AllocationConfig::default();
        let security = SecurityInput::new("X").with_quality(90.0, QualityTier::Core);
        // valuation factor 0.2, phase factor 1.0
        assert!((raw_weight(&security, Pool::Core, &config) - 0.2).abs() < EPS);
    }

    #[test]
    fn test_adjusted_equity_clamped() {
        let portfolio = PortfolioInput::default().with_risk_factors(1.10, 1.0);
        assert_eq!(adjusted_equity(0.90, &portfolio, 0.85), 0.85);

        let portfolio = PortfolioInput::default().with_risk_factors(0.75, 0.6);
        assert!((adjusted_equity(0.80, &portfolio, 0.85) - 0.36).abs() < EPS);

        let portfolio = PortfolioInput::default().with_risk_factors(-1.0, 1.0);
        assert_eq!(adjusted_equity(0.80, &portfolio, 0.85), 0.0);
    }

    #[test]
    fn test_zero_sum_normalizes_to_zero() {
        assert_eq!(normalize(&[0.0, 0.0, 0.0], 0.8), vec![0.0, 0.0, 0.0]);
        assert!(normalize(&[], 0.8).is_empty());
    }
}
