//! Cash Level Policy.
//!
//! Picks the cash reserve from the composition of the portfolio after pool
//! classification. The tier-C ratio is measured over the Core-quality subset
//! (quality tier Core, before valuation or phase demotion); tier-A and
//! accelerating names are counted over the classified Core pool only.
//! Rules are priority-ordered; they never combine.

use svip_common::config::CashLevelConfig;

use super::types::{CashRule, Pool, QualityTier, SecurityInput, ValuationTier};

/// Counts that drive the cash rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoreComposition {
    /// Core-quality securities
    pub total: usize,
    /// Tier-A securities in the Core pool
    pub tier_a: usize,
    /// Tier-C securities among the Core-quality subset
    pub tier_c: usize,
    /// Accelerating, not tier C, in the Core pool
    pub accelerating: usize,
}

impl CoreComposition {
    /// `pools` is aligned with `securities`.
    pub fn from_securities(securities: &[SecurityInput], pools: &[Pool]) -> Self {
        securities
            .iter()
            .zip(pools)
            .fold(Self::default(), |mut acc, (s, pool)| {
                if matches!(s.quality, Some(q) if q.tier == QualityTier::Core) {
                    acc.total += 1;
                    if s.is_expensive() {
                        acc.tier_c += 1;
                    }
                }
                if *pool == Pool::Core {
                    if s.valuation_tier() == Some(ValuationTier::A) {
                        acc.tier_a += 1;
                    }
                    if s.is_accelerating() && !s.is_expensive() {
                        acc.accelerating += 1;
                    }
                }
                acc
            })
    }

    /// Share of tier-C names; 0 for an empty subset.
    pub fn tier_c_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.tier_c as f64 / self.total as f64
        }
    }
}

/// Cash level decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CashDecision {
    pub level: f64,
    pub rule: CashRule,
}

/// Select the cash level for a composition.
pub fn cash_level(composition: &CoreComposition, config: &CashLevelConfig) -> CashDecision {
    let (level, rule) = if composition.tier_c_ratio() > config.stress_c_ratio {
        (config.high_stress, CashRule::HighStress)
    } else if composition.tier_a < config.min_tier_a_count {
        (config.conservative, CashRule::Conservative)
    } else if composition.accelerating >= config.min_accelerating_count {
        (config.aggressive, CashRule::Aggressive)
    } else {
        (config.default, CashRule::Default)
    };

    CashDecision { level, rule }
}

/// Determine the cash level directly from the securities.
pub fn determine_cash_level(
    securities: &[SecurityInput],
    pools: &[Pool],
    config: &CashLevelConfig,
) -> CashDecision {
    let composition = CoreComposition::from_securities(securities, pools);
    let decision = cash_level(&composition, config);

    tracing::debug!(
        core_quality = composition.total,
        tier_a = composition.tier_a,
        tier_c = composition.tier_c,
        accelerating = composition.accelerating,
        cash_level = decision.level,
        rule = %decision.rule,
        "Cash level selected"
    );

    decision
}
