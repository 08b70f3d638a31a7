//! Exposure aggregation and violation checks.
//!
//! Violations are diagnostics. They never fail a run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use svip_common::config::MarketParams;

use super::types::{Pool, SecurityInput};

// ============================================================================
// Exposure
// ============================================================================

/// Aggregated weights of one allocation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Exposure {
    pub total_equity: f64,
    /// `1 - total_equity`, floored at 0
    pub cash_weight: f64,
    pub core_pool_weight: f64,
    pub watch_pool_weight: f64,
    /// Only groups with positive weight
    pub theme_exposure: BTreeMap<String, f64>,
    pub sector_exposure: BTreeMap<String, f64>,
}

impl Exposure {
    /// Aggregate realized target weights, aligned with `securities` and `pools`.
    pub fn aggregate(securities: &[SecurityInput], pools: &[Pool], weights: &[f64]) -> Self {
        let mut exposure = Self::default();

        for ((security, pool), weight) in securities.iter().zip(pools).zip(weights) {
            if *weight <= 0.0 {
                continue;
            }
            exposure.total_equity += weight;
            match pool {
                Pool::Core => exposure.core_pool_weight += weight,
                Pool::Watch => exposure.watch_pool_weight += weight,
                Pool::Block => {}
            }
            *exposure
                .theme_exposure
                .entry(security.theme_key().to_string())
                .or_insert(0.0) += weight;
            *exposure
                .sector_exposure
                .entry(security.sector_key().to_string())
                .or_insert(0.0) += weight;
        }

        exposure.cash_weight = (1.0 - exposure.total_equity).max(0.0);
        exposure
    }
}

// ============================================================================
// Violations
// ============================================================================

/// A residual cap breach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    TotalEquity { total: f64, ceiling: f64 },
    Theme { theme: String, weight: f64, cap: f64 },
    Sector { sector: String, weight: f64, cap: f64 },
    SingleSecurity { symbol: String, weight: f64, cap: f64 },
    /// Single-security projection ran out of passes
    ProjectionNotConverged { passes: u32, residual: f64 },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TotalEquity { total, ceiling } => write!(
                f,
                "Total equity {:.1}% exceeds ceiling {:.1}%",
                total * 100.0,
                ceiling * 100.0
            ),
            Self::Theme { theme, weight, cap } => write!(
                f,
                "Theme [{}] exposure {:.1}% exceeds cap {:.1}%",
                theme,
                weight * 100.0,
                cap * 100.0
            ),
            Self::Sector {
                sector,
                weight,
                cap,
            } => write!(
                f,
                "Sector [{}] exposure {:.1}% exceeds cap {:.1}%",
                sector,
                weight * 100.0,
                cap * 100.0
            ),
            Self::SingleSecurity {
                symbol,
                weight,
                cap,
            } => write!(
                f,
                "{} weight {:.2}% exceeds single-security cap {:.1}%",
                symbol,
                weight * 100.0,
                cap * 100.0
            ),
            Self::ProjectionNotConverged { passes, residual } => write!(
                f,
                "Single-security cap projection did not converge after {} passes (residual {:.4}%)",
                passes,
                residual * 100.0
            ),
        }
    }
}

/// Caps and tolerance a finished allocation is checked against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViolationChecker {
    pub caps: MarketParams,
    pub sector_cap: f64,
    pub final_equity_ceiling: f64,
    /// Absolute slack above each cap before a breach is reported
    pub tolerance: f64,
}

impl ViolationChecker {
    pub fn check(
        &self,
        securities: &[SecurityInput],
        weights: &[f64],
        exposure: &Exposure,
    ) -> Vec<Violation> {
        let mut violations = Vec::new();

        if exposure.total_equity > self.final_equity_ceiling + self.tolerance {
            violations.push(Violation::TotalEquity {
                total: exposure.total_equity,
                ceiling: self.final_equity_ceiling,
            });
        }

        let theme_cap = self.caps.theme_bucket_cap;
        for (theme, weight) in &exposure.theme_exposure {
            if *weight > theme_cap + self.tolerance {
                violations.push(Violation::Theme {
                    theme: theme.clone(),
                    weight: *weight,
                    cap: theme_cap,
                });
            }
        }

        for (sector, weight) in &exposure.sector_exposure {
            if *weight > self.sector_cap + self.tolerance {
                violations.push(Violation::Sector {
                    sector: sector.clone(),
                    weight: *weight,
                    cap: self.sector_cap,
                });
            }
        }

        let single_cap = self.caps.single_security_cap;
        for (security, weight) in securities.iter().zip(weights) {
            if *weight > single_cap + self.tolerance {
                violations.push(Violation::SingleSecurity {
                    symbol: security.symbol.clone(),
                    weight: *weight,
                    cap: single_cap,
                });
            }
        }

        violations
    }
}
