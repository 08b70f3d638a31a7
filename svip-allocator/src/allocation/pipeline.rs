//! Allocation pipeline.
//!
//! ```text
//! classify → cash level → raw weights → normalize → cap projection
//!          → rotation → actions → exposure / violations → Allocation
//! ```
//!
//! Each stage takes the previous stage's weights by reference and returns a
//! new vector aligned with the input securities. The configuration is
//! validated once in [`Allocator::new`]; a run itself cannot fail.

use svip_common::config::AllocationConfig;
use svip_common::{Validate, ValidationError};

use super::actions::ActionResolver;
use super::cash::determine_cash_level;
use super::constraints::ConstraintProjector;
use super::exposure::{Exposure, Violation, ViolationChecker};
use super::pools::classify_all;
use super::rotation::{apply_rotation, compute_rotation_signals};
use super::types::{AllocatedSecurity, Allocation, PortfolioInput, SecurityInput};
use super::weights::{adjusted_equity, normalize, raw_weights};

/// Portfolio allocator bound to one validated configuration.
#[derive(Debug, Clone)]
pub struct Allocator {
    config: AllocationConfig,
}

impl Allocator {
    /// Validate `config` and build an allocator.
    pub fn new(config: AllocationConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    /// Run the full pipeline for one portfolio.
    pub fn allocate(&self, portfolio: &PortfolioInput, securities: &[SecurityInput]) -> Allocation {
        let config = &self.config;
        let caps = config.market_params(&portfolio.market);

        let pools = classify_all(securities);

        let cash = determine_cash_level(securities, &pools, &config.cash);
        let base_target_equity = portfolio
            .base_target_equity
            .unwrap_or(1.0 - cash.level);
        let ceiling = adjusted_equity(base_target_equity, portfolio, config.core_pool_weight_max);

        let raw = raw_weights(securities, &pools, config);
        let normalized = normalize(&raw, ceiling);
        tracing::debug!(
            base_target_equity,
            ceiling,
            raw_total = raw.iter().sum::<f64>(),
            "Raw weights normalized"
        );

        let projector = ConstraintProjector::new(caps, config);
        let (projected, projection) = projector.project(securities, &normalized);

        let rotation_signals = compute_rotation_signals(securities, &config.rotation);
        let computed = apply_rotation(securities, &projected, &rotation_signals);

        let resolver = ActionResolver::new(config.initial_position_ratio, config.rebalance_band);
        let resolutions: Vec<_> = securities
            .iter()
            .zip(&pools)
            .zip(&computed)
            .map(|((security, pool), weight)| resolver.resolve(security, *pool, *weight))
            .collect();
        let targets: Vec<f64> = resolutions.iter().map(|r| r.target_weight).collect();

        let exposure = Exposure::aggregate(securities, &pools, &targets);
        let checker = ViolationChecker {
            caps,
            sector_cap: config.sector_cap,
            final_equity_ceiling: ceiling,
            tolerance: config.violation_tolerance,
        };
        let mut violations = checker.check(securities, &targets, &exposure);
        if !projection.converged {
            violations.push(Violation::ProjectionNotConverged {
                passes: projection.passes,
                residual: projection.residual_excess,
            });
        }
        for violation in &violations {
            tracing::warn!(market = %portfolio.market, "{}", violation);
        }

        let allocated = securities
            .iter()
            .enumerate()
            .map(|(i, security)| AllocatedSecurity {
                symbol: security.symbol.clone(),
                name: security.name.clone(),
                market: security.market.clone(),
                sector: security.sector.clone(),
                theme: security.theme.clone(),
                quality_score: security.quality_score(),
                valuation_tier: security.valuation_tier(),
                phase: security.phase(),
                pool: pools[i],
                raw_weight: raw[i],
                computed_weight: computed[i],
                target_weight: resolutions[i].target_weight,
                current_weight: security.current_weight,
                action: resolutions[i].action,
            })
            .collect();

        tracing::info!(
            market = %portfolio.market,
            securities = securities.len(),
            cash_level = cash.level,
            cash_rule = %cash.rule,
            ceiling,
            total_equity = exposure.total_equity,
            violations = violations.len(),
            "Allocation complete"
        );

        Allocation {
            market: portfolio.market.clone(),
            securities: allocated,
            cash_level: cash.level,
            cash_rule: cash.rule,
            base_target_equity,
            total_equity: exposure.total_equity,
            cash_weight: exposure.cash_weight,
            core_pool_weight: exposure.core_pool_weight,
            watch_pool_weight: exposure.watch_pool_weight,
            theme_exposure: exposure.theme_exposure,
            sector_exposure: exposure.sector_exposure,
            macro_risk_factor: portfolio.macro_risk_factor,
            tail_risk_factor: portfolio.tail_risk_factor,
            final_equity_ceiling: ceiling,
            rotation_signals,
            projection,
            violations: violations.iter().map(ToString::to_string).collect(),
        }
    }
}
