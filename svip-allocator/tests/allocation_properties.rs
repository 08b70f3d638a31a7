//! Property-based tests for the allocation pipeline.
//!
//! Universes are generated across every pool, valuation and phase
//! combination, with a handful of shared sectors and themes so that group
//! caps actually bind.

use proptest::prelude::*;

use svip_allocator::allocation::weights::raw_weight;
use svip_allocator::allocation::{
    Allocator, ConstraintProjector, Phase, Pool, PortfolioInput, QualityTier, SecurityInput,
    ValuationTier,
};
use svip_common::config::AllocationConfig;

const EPS: f64 = 1e-9;

const SECTORS: &[&str] = &["Tech", "Health", "Energy", ""];
const THEMES: &[&str] = &["AI", "Grid", "Bio", "Cloud", ""];
const MARKETS: &[&str] = &["US", "HK", "CN", "SG"];

fn quality_tier() -> impl Strategy<Value = QualityTier> {
    prop_oneof![
        4 => Just(QualityTier::Core),
        1 => Just(QualityTier::Watch),
        1 => Just(QualityTier::Block),
    ]
}

fn valuation() -> impl Strategy<Value = Option<(ValuationTier, f64)>> {
    prop::option::weighted(
        0.9,
        prop_oneof![
            3 => Just((ValuationTier::A, 1.0)),
            2 => Just((ValuationTier::B, 0.6)),
            1 => Just((ValuationTier::C, 0.2)),
        ],
    )
}

fn phase() -> impl Strategy<Value = Option<(Phase, f64)>> {
    prop::option::weighted(
        0.9,
        prop_oneof![
            Just((Phase::Accelerating, 1.2)),
            Just((Phase::Steady, 1.0)),
            Just((Phase::Decaying, 0.5)),
        ],
    )
}

prop_compose! {
    fn security(with_rotation: bool)(
        quality in prop::option::weighted(0.95, (0.0f64..100.0, quality_tier())),
        valuation in valuation(),
        phase in phase(),
        acceleration_score in 0.0f64..100.0,
        sector in 0..SECTORS.len(),
        theme in 0..THEMES.len(),
        held in any::<bool>(),
        current_weight in 0.0f64..0.10,
    ) -> SecurityInput {
        let mut security = SecurityInput::new("").with_groups(SECTORS[sector], THEMES[theme]);
        if let Some((score, tier)) = quality {
            security = security.with_quality(score, tier);
        }
        if let Some((tier, factor)) = valuation {
            security = security.with_valuation(tier, factor);
        }
        if let Some((phase, factor)) = phase {
            security = security.with_phase(phase, factor);
        }
        if with_rotation {
            security = security.with_acceleration_score(acceleration_score);
        }
        if held {
            security = security.with_current_weight(current_weight);
        }
        security
    }
}

fn universe(with_rotation: bool) -> impl Strategy<Value = Vec<SecurityInput>> {
    prop::collection::vec(security(with_rotation), 0..60).prop_map(|securities| {
        securities
            .into_iter()
            .enumerate()
            .map(|(i, mut s)| {
                s.symbol = format!("S{i:03}");
                s
            })
            .collect()
    })
}

fn portfolio() -> impl Strategy<Value = PortfolioInput> {
    (0..MARKETS.len(), 0.75f64..1.10, 0.6f64..1.0).prop_map(|(market, macro_risk, tail_risk)| {
        PortfolioInput::new(MARKETS[market]).with_risk_factors(macro_risk, tail_risk)
    })
}

fn allocator() -> Allocator {
    Allocator::new(AllocationConfig::default()).unwrap()
}

proptest! {
    #[test]
    fn prop_caps_hold_without_rotation(
        securities in universe(false),
        portfolio in portfolio(),
    ) {
        let allocator = allocator();
        let caps = allocator.config().market_params(&portfolio.market);
        let allocation = allocator.allocate(&portfolio, &securities);

        if allocation.projection.converged {
            for security in &allocation.securities {
                prop_assert!(security.target_weight >= 0.0);
                prop_assert!(security.target_weight <= caps.single_security_cap + EPS);
            }
        } else {
            prop_assert!(allocation
                .violations
                .iter()
                .any(|v| v.contains("did not converge")));
        }

        prop_assert!(allocation.total_equity <= allocation.final_equity_ceiling + EPS);
        for weight in allocation.theme_exposure.values() {
            prop_assert!(*weight <= caps.theme_bucket_cap + EPS);
        }
        for weight in allocation.sector_exposure.values() {
            prop_assert!(*weight <= allocator.config().sector_cap + EPS);
        }
    }

    #[test]
    fn prop_completeness_and_block_exclusion(
        securities in universe(true),
        portfolio in portfolio(),
    ) {
        let allocation = allocator().allocate(&portfolio, &securities);

        prop_assert_eq!(allocation.securities.len(), securities.len());
        prop_assert!(allocation.cash_weight >= 0.0);

        let sum: f64 = allocation.securities.iter().map(|s| s.target_weight).sum();
        prop_assert!((sum + allocation.cash_weight - 1.0).abs() < EPS);
        prop_assert!((sum - allocation.total_equity).abs() < EPS);

        for security in allocation.pool(Pool::Block) {
            prop_assert_eq!(security.target_weight, 0.0);
        }
        for security in allocation.pool(Pool::Watch) {
            prop_assert_eq!(security.raw_weight, 0.0);
        }
    }

    #[test]
    fn prop_rotation_breaches_are_reported(
        securities in universe(true),
        portfolio in portfolio(),
    ) {
        let allocator = allocator();
        let config = allocator.config();
        let caps = config.market_params(&portfolio.market);
        let allocation = allocator.allocate(&portfolio, &securities);

        let tolerance = config.violation_tolerance;
        for security in &allocation.securities {
            if security.target_weight > caps.single_security_cap + tolerance {
                prop_assert!(allocation.violations.iter().any(|v| v.starts_with(&security.symbol)));
            }
        }
        if allocation.total_equity > allocation.final_equity_ceiling + tolerance {
            prop_assert!(allocation.violations.iter().any(|v| v.starts_with("Total equity")));
        }
        let max_total = allocation.final_equity_ceiling * (1.0 + config.rotation.strong_adjustment);
        prop_assert!(allocation.total_equity <= max_total + EPS);
    }

    #[test]
    fn prop_projection_is_fixed_point(
        securities in universe(false),
        market in 0..MARKETS.len(),
        seed in prop::collection::vec(0.0f64..1.0, 60),
    ) {
        let config = AllocationConfig::default();
        let projector = ConstraintProjector::new(config.market_params(MARKETS[market]), &config);

        let total: f64 = seed.iter().take(securities.len()).sum();
        let weights: Vec<f64> = seed
            .iter()
            .take(securities.len())
            .map(|w| if total > 0.0 { w / total * 0.85 } else { 0.0 })
            .collect();

        let (once, summary) = projector.project(&securities, &weights);
        prop_assume!(summary.converged);
        let (twice, _) = projector.project(&securities, &once);

        for (a, b) in once.iter().zip(&twice) {
            prop_assert!((a - b).abs() < 1e-8, "{} != {}", a, b);
        }
    }

    #[test]
    fn prop_raw_weight_monotone_in_quality(
        low in 0.0f64..100.0,
        bump in 0.001f64..50.0,
        valuation in valuation(),
        phase in phase(),
    ) {
        let config = AllocationConfig::default();
        let build = |score: f64| {
            let mut security = SecurityInput::new("X").with_quality(score, QualityTier::Core);
            if let Some((tier, factor)) = valuation {
                security = security.with_valuation(tier, factor);
            }
            if let Some((phase, factor)) = phase {
                security = security.with_phase(phase, factor);
            }
            security
        };

        let lower = raw_weight(&build(low), Pool::Core, &config);
        let higher = raw_weight(&build(low + bump), Pool::Core, &config);
        prop_assert!(higher >= lower);
    }
}
