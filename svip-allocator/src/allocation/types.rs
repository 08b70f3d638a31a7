//! Allocation Types and Structures.
//!
//! Inputs supplied by the factor scoring stage, the closed tag types the
//! pipeline rules match on, and the immutable `Allocation` returned per run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Group name used for securities without a theme or sector.
pub const UNASSIGNED_GROUP: &str = "Other";

/// Valuation factor assumed when the valuation stage supplied none.
pub const MISSING_VALUATION_FACTOR: f64 = 0.2;

/// Phase factor assumed when the acceleration stage supplied none.
pub const MISSING_PHASE_FACTOR: f64 = 1.0;

// ============================================================================
// Tag Types
// ============================================================================

/// Structural-quality tier assigned by the quality scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Core,
    Watch,
    Block,
}

/// Pool membership after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pool {
    /// Receives capital
    Core,
    /// Monitored only
    Watch,
    /// Excluded; always carries zero target weight
    Block,
}

impl std::fmt::Display for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Core => write!(f, "core"),
            Self::Watch => write!(f, "watch"),
            Self::Block => write!(f, "block"),
        }
    }
}

/// Valuation tier: A = favorable price, C = expensive or fragile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValuationTier {
    A,
    B,
    C,
}

impl std::fmt::Display for ValuationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
            Self::C => write!(f, "C"),
        }
    }
}

/// Growth-acceleration phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Accelerating,
    Steady,
    Decaying,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accelerating => write!(f, "accelerating"),
            Self::Steady => write!(f, "steady"),
            Self::Decaying => write!(f, "decaying"),
        }
    }
}

/// Recommended trading action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Open a new position (first tranche only)
    Build,
    /// Increase an existing position
    Add,
    Hold,
    /// Trim an existing position
    LightReduce,
    /// Close the position
    Exit,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Add => write!(f, "add"),
            Self::Hold => write!(f, "hold"),
            Self::LightReduce => write!(f, "light_reduce"),
            Self::Exit => write!(f, "exit"),
        }
    }
}

/// Cash-level rule that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashRule {
    /// Too many expensive names among Core-quality securities
    HighStress,
    /// Too few tier-A names
    Conservative,
    /// Enough accelerating, reasonably priced names
    Aggressive,
    Default,
}

impl std::fmt::Display for CashRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HighStress => write!(f, "high_stress"),
            Self::Conservative => write!(f, "conservative"),
            Self::Aggressive => write!(f, "aggressive"),
            Self::Default => write!(f, "default"),
        }
    }
}

// ============================================================================
// Inputs
// ============================================================================

/// Structural-quality assessment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// Score in 0-100
    pub score: f64,
    pub tier: QualityTier,
}

/// Valuation safety-margin assessment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuationAssessment {
    pub tier: ValuationTier,
    /// Nominally 1.0 / 0.6 / 0.2 for A / B / C
    #[serde(default)]
    pub factor: Option<f64>,
}

/// Growth-acceleration assessment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelerationAssessment {
    pub phase: Phase,
    /// Nominally 1.2 / 1.0 / 0.5 for accelerating / steady / decaying
    #[serde(default)]
    pub factor: Option<f64>,
    /// Acceleration score in 0-100, used for thematic rotation
    #[serde(default)]
    pub score: Option<f64>,
}

/// One security as delivered by the factor scoring stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityInput {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub sector: String,
    /// Theme bucket
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub quality: Option<QualityAssessment>,
    #[serde(default)]
    pub valuation: Option<ValuationAssessment>,
    #[serde(default)]
    pub acceleration: Option<AccelerationAssessment>,
    /// Currently held weight (0-1)
    #[serde(default)]
    pub current_weight: f64,
}

impl SecurityInput {
    /// Create a security with identity only; all scores absent.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: String::new(),
            market: String::new(),
            sector: String::new(),
            theme: String::new(),
            quality: None,
            valuation: None,
            acceleration: None,
            current_weight: 0.0,
        }
    }

    pub fn with_groups(mut self, sector: impl Into<String>, theme: impl Into<String>) -> Self {
        self.sector = sector.into();
        self.theme = theme.into();
        self
    }

    pub fn with_quality(mut self, score: f64, tier: QualityTier) -> Self {
        self.quality = Some(QualityAssessment { score, tier });
        self
    }

    pub fn with_valuation(mut self, tier: ValuationTier, factor: f64) -> Self {
        self.valuation = Some(ValuationAssessment {
            tier,
            factor: Some(factor),
        });
        self
    }

    pub fn with_phase(mut self, phase: Phase, factor: f64) -> Self {
        let score = self.acceleration.and_then(|a| a.score);
        self.acceleration = Some(AccelerationAssessment {
            phase,
            factor: Some(factor),
            score,
        });
        self
    }

    pub fn with_acceleration_score(mut self, score: f64) -> Self {
        let mut acceleration = self.acceleration.unwrap_or(AccelerationAssessment {
            phase: Phase::Steady,
            factor: None,
            score: None,
        });
        acceleration.score = Some(score);
        self.acceleration = Some(acceleration);
        self
    }

    pub fn with_current_weight(mut self, weight: f64) -> Self {
        self.current_weight = weight;
        self
    }

    pub fn quality_score(&self) -> Option<f64> {
        self.quality.map(|q| q.score)
    }

    pub fn valuation_tier(&self) -> Option<ValuationTier> {
        self.valuation.map(|v| v.tier)
    }

    pub fn valuation_factor(&self) -> f64 {
        self.valuation
            .and_then(|v| v.factor)
            .unwrap_or(MISSING_VALUATION_FACTOR)
    }

    pub fn phase(&self) -> Option<Phase> {
        self.acceleration.map(|a| a.phase)
    }

    pub fn phase_factor(&self) -> f64 {
        self.acceleration
            .and_then(|a| a.factor)
            .unwrap_or(MISSING_PHASE_FACTOR)
    }

    pub fn acceleration_score(&self) -> Option<f64> {
        self.acceleration.and_then(|a| a.score)
    }

    /// Valuation tier C. An absent valuation is not treated as expensive.
    pub fn is_expensive(&self) -> bool {
        self.valuation_tier() == Some(ValuationTier::C)
    }

    pub fn is_accelerating(&self) -> bool {
        self.phase() == Some(Phase::Accelerating)
    }

    pub fn is_decaying(&self) -> bool {
        self.phase() == Some(Phase::Decaying)
    }

    /// Theme bucket used for capping and exposure.
    pub fn theme_key(&self) -> &str {
        group_key(&self.theme)
    }

    /// Sector used for capping and exposure.
    pub fn sector_key(&self) -> &str {
        group_key(&self.sector)
    }
}

fn group_key(name: &str) -> &str {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        UNASSIGNED_GROUP
    } else {
        trimmed
    }
}

/// Portfolio-level inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioInput {
    /// Target market code; selects the cap table
    #[serde(default = "default_market")]
    pub market: String,
    /// Macro-risk multiplier (0.75-1.10)
    #[serde(default = "default_factor")]
    pub macro_risk_factor: f64,
    /// Tail-risk multiplier (0.6-1.0)
    #[serde(default = "default_factor")]
    pub tail_risk_factor: f64,
    /// Overrides `1 - cash_level` as the base target equity
    #[serde(default)]
    pub base_target_equity: Option<f64>,
}

impl PortfolioInput {
    pub fn new(market: impl Into<String>) -> Self {
        Self {
            market: market.into(),
            macro_risk_factor: default_factor(),
            tail_risk_factor: default_factor(),
            base_target_equity: None,
        }
    }

    pub fn with_risk_factors(mut self, macro_risk: f64, tail_risk: f64) -> Self {
        self.macro_risk_factor = macro_risk;
        self.tail_risk_factor = tail_risk;
        self
    }

    pub fn with_base_target_equity(mut self, equity: f64) -> Self {
        self.base_target_equity = Some(equity);
        self
    }
}

impl Default for PortfolioInput {
    fn default() -> Self {
        Self::new(default_market())
    }
}

fn default_market() -> String {
    "US".to_string()
}

fn default_factor() -> f64 {
    1.0
}

// ============================================================================
// Outputs
// ============================================================================

/// Theme rotation signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationSignal {
    pub theme: String,
    /// Mean acceleration score of the theme's securities
    pub avg_acceleration: f64,
    /// Z-score against the cross-theme distribution
    pub z_score: f64,
    /// Weight multiplier delta (+0.10 = +10%)
    pub weight_adjustment: f64,
}

/// Outcome of the single-security cap projection.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectionSummary {
    /// Redistribution passes executed
    pub passes: u32,
    pub converged: bool,
    /// Clipped weight that no sub-cap security could absorb (released to cash)
    pub unabsorbed_overflow: f64,
    /// Weight still above the single-security cap when the pass bound ran out
    pub residual_excess: f64,
}

/// A security after the full pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatedSecurity {
    pub symbol: String,
    pub name: String,
    pub market: String,
    pub sector: String,
    pub theme: String,
    pub quality_score: Option<f64>,
    pub valuation_tier: Option<ValuationTier>,
    pub phase: Option<Phase>,
    pub pool: Pool,
    /// Quality x valuation x phase
    pub raw_weight: f64,
    /// Weight after normalization, projection and rotation
    pub computed_weight: f64,
    /// Weight to trade towards (glide path applied)
    pub target_weight: f64,
    pub current_weight: f64,
    pub action: Action,
}

/// Complete allocation for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub market: String,
    /// In input order
    pub securities: Vec<AllocatedSecurity>,
    /// Cash reserve selected from the Core composition
    pub cash_level: f64,
    pub cash_rule: CashRule,
    pub base_target_equity: f64,
    pub total_equity: f64,
    pub cash_weight: f64,
    pub core_pool_weight: f64,
    pub watch_pool_weight: f64,
    pub theme_exposure: BTreeMap<String, f64>,
    pub sector_exposure: BTreeMap<String, f64>,
    pub macro_risk_factor: f64,
    pub tail_risk_factor: f64,
    pub final_equity_ceiling: f64,
    /// Sorted by Z-score, highest first
    pub rotation_signals: Vec<RotationSignal>,
    pub projection: ProjectionSummary,
    pub violations: Vec<String>,
}

impl Allocation {
    pub fn security(&self, symbol: &str) -> Option<&AllocatedSecurity> {
        self.securities.iter().find(|s| s.symbol == symbol)
    }

    pub fn pool(&self, pool: Pool) -> impl Iterator<Item = &AllocatedSecurity> {
        self.securities.iter().filter(move |s| s.pool == pool)
    }

    pub fn is_compliant(&self) -> bool {
        self.violations.is_empty()
    }
}
