//! End-to-end worked examples for the allocation pipeline.

use svip_allocator::allocation::{
    apply_rotation, compute_rotation_signals, Action, Allocator, CashRule, Phase, Pool,
    PortfolioInput, QualityTier, SecurityInput, ValuationTier,
};
use svip_common::config::{AllocationConfig, RotationConfig};

const EPS: f64 = 1e-9;

fn allocator() -> Allocator {
    Allocator::new(AllocationConfig::default()).unwrap()
}

fn core_security(symbol: &str, valuation: ValuationTier, factor: f64) -> SecurityInput {
    SecurityInput::new(symbol)
        .with_groups(format!("Sector-{symbol}"), format!("Theme-{symbol}"))
        .with_quality(85.0, QualityTier::Core)
        .with_valuation(valuation, factor)
        .with_phase(Phase::Steady, 1.0)
}

#[test]
fn test_glide_path_opens_half_position() {
    // HK caps a single name at 6%
    let securities = vec![SecurityInput::new("X")
        .with_groups("Tech", "Platforms")
        .with_quality(90.0, QualityTier::Core)
        .with_valuation(ValuationTier::A, 1.0)
        .with_phase(Phase::Accelerating, 1.2)];

    let allocation = allocator().allocate(&PortfolioInput::new("HK"), &securities);
    let x = allocation.security("X").unwrap();

    assert!((x.computed_weight - 0.06).abs() < EPS);
    assert_eq!(x.action, Action::Build);
    assert!((x.target_weight - 0.03).abs() < EPS);
    assert!((allocation.cash_weight - 0.97).abs() < EPS);
}

#[test]
fn test_expensive_core_pool_raises_cash() {
    let mut securities: Vec<_> = (0..8)
        .map(|i| core_security(&format!("C{i}"), ValuationTier::C, 0.2))
        .collect();
    securities.push(core_security("A0", ValuationTier::A, 1.0));
    securities.push(core_security("A1", ValuationTier::A, 1.0));

    let allocation = allocator().allocate(&PortfolioInput::default(), &securities);

    assert_eq!(allocation.cash_rule, CashRule::HighStress);
    assert_eq!(allocation.cash_level, 0.30);
    assert!((allocation.base_target_equity - 0.70).abs() < EPS);
    assert_eq!(allocation.pool(Pool::Watch).count(), 8);
    assert_eq!(allocation.pool(Pool::Core).count(), 2);
}

#[test]
fn test_risk_factors_shrink_ceiling() {
    let securities: Vec<_> = (0..12)
        .map(|i| core_security(&format!("S{i}"), ValuationTier::A, 1.0))
        .collect();
    let portfolio = PortfolioInput::new("US").with_risk_factors(0.80, 0.75);

    let allocation = allocator().allocate(&portfolio, &securities);

    // Twelve tier-A names, none accelerating: default cash 15%
    assert_eq!(allocation.cash_rule, CashRule::Default);
    assert!((allocation.final_equity_ceiling - 0.85 * 0.80 * 0.75).abs() < EPS);
    let computed: f64 = allocation.securities.iter().map(|s| s.computed_weight).sum();
    assert!((computed - allocation.final_equity_ceiling).abs() < EPS);
}

#[test]
fn test_rotation_tilts_strong_and_weak_themes() {
    let themed = |symbol: &str, theme: &str, score: f64| {
        SecurityInput::new(symbol)
            .with_groups("Any", theme)
            .with_acceleration_score(score)
    };
    let securities = vec![
        themed("H1", "Hot", 90.0),
        themed("H2", "Hot", 90.0),
        themed("M1", "Mid", 50.0),
        themed("C1", "Cold", 10.0),
    ];

    let signals = compute_rotation_signals(&securities, &RotationConfig::default());
    assert_eq!(signals[0].theme, "Hot");
    assert!(signals[0].z_score >= 1.0);
    assert!(signals[2].z_score <= -1.0);

    // Hot theme holds 5% in aggregate, Cold holds 1%
    let weights = apply_rotation(&securities, &[0.025, 0.025, 0.03, 0.01], &signals);
    assert!((weights[0] + weights[1] - 0.055).abs() < EPS);
    assert!((weights[2] - 0.03).abs() < EPS);
    assert!((weights[3] - 0.009).abs() < EPS);
}

#[test]
fn test_rotation_applied_after_caps() {
    let hot = |symbol: &str| {
        SecurityInput::new(symbol)
            .with_groups(format!("Sector-{symbol}"), "Hot")
            .with_quality(90.0, QualityTier::Core)
            .with_valuation(ValuationTier::A, 1.0)
            .with_phase(Phase::Accelerating, 1.2)
            .with_acceleration_score(95.0)
            .with_current_weight(0.08)
    };
    let cold = |symbol: &str| {
        SecurityInput::new(symbol)
            .with_groups(format!("Sector-{symbol}"), "Cold")
            .with_quality(90.0, QualityTier::Core)
            .with_valuation(ValuationTier::A, 1.0)
            .with_phase(Phase::Steady, 1.0)
            .with_acceleration_score(5.0)
            .with_current_weight(0.08)
    };
    let securities = vec![hot("H1"), hot("H2"), cold("C1"), cold("C2")];

    let allocation = allocator().allocate(&PortfolioInput::default(), &securities);

    // Pre-rotation every name sits at the 8% cap; the hot theme is lifted to 8.8%
    let h1 = allocation.security("H1").unwrap();
    assert!((h1.computed_weight - 0.088).abs() < EPS);
    assert_eq!(h1.action, Action::Add);
    let c1 = allocation.security("C1").unwrap();
    assert!((c1.computed_weight - 0.072).abs() < EPS);
    assert_eq!(c1.action, Action::LightReduce);

    // 8.8% is within the 1% reporting slack above the 8% cap
    assert!(allocation.is_compliant());
}

#[test]
fn test_missing_scores_never_fail() {
    let securities = vec![
        SecurityInput::new("NOTHING"),
        SecurityInput::new("ONLY-QUALITY").with_quality(99.0, QualityTier::Core),
        SecurityInput::new("HELD-BLOCK")
            .with_quality(10.0, QualityTier::Block)
            .with_current_weight(0.04),
    ];

    let allocation = allocator().allocate(&PortfolioInput::default(), &securities);

    assert_eq!(allocation.security("NOTHING").unwrap().pool, Pool::Block);
    assert_eq!(allocation.security("HELD-BLOCK").unwrap().action, Action::Exit);
    let only = allocation.security("ONLY-QUALITY").unwrap();
    assert_eq!(only.pool, Pool::Core);
    assert_eq!(only.action, Action::Build);
    assert!((only.target_weight - 0.04).abs() < EPS);
}
