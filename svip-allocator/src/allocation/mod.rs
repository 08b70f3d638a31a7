//! Portfolio Allocation Module.
//!
//! Converts independently computed factor scores into a constrained
//! allocation: target weights, cash reserve, pool membership and one
//! trading action per security.
//!
//! # Components
//!
//! - **Pools**: Core / Watch / Block classification
//! - **Cash**: priority-ordered cash level rules over the Core-quality subset
//! - **Weights**: multiplicative raw weights and equity normalization
//! - **Constraints**: single-security, theme and sector caps
//! - **Rotation**: cross-theme Z-score tilt
//! - **Actions**: turnover-limiting actions with a first-tranche glide path
//! - **Exposure**: aggregate weights and residual cap breaches
//!
//! # Usage
//!
//! ```ignore
//! use svip_allocator::allocation::{Allocator, PortfolioInput};
//!
//! let allocator = Allocator::new(config.allocation.clone())?;
//! let allocation = allocator.allocate(&PortfolioInput::new("HK"), &securities);
//!
//! for security in allocation.securities {
//!     println!("{} {} {:.2}%", security.symbol, security.action, security.target_weight * 100.0);
//! }
//! ```

pub mod actions;
pub mod cash;
pub mod constraints;
pub mod exposure;
pub mod pipeline;
pub mod pools;
pub mod request;
pub mod rotation;
pub mod types;
pub mod weights;

// Re-export main types
pub use actions::{ActionResolver, Resolution};
pub use cash::{determine_cash_level, CashDecision, CoreComposition};
pub use constraints::ConstraintProjector;
pub use exposure::{Exposure, Violation, ViolationChecker};
pub use pipeline::Allocator;
pub use pools::{classify, classify_all};
pub use request::AllocationRequest;
pub use rotation::{apply_rotation, compute_rotation_signals};

pub use types::{
    AccelerationAssessment, Action, AllocatedSecurity, Allocation, CashRule, Phase, Pool,
    PortfolioInput, ProjectionSummary, QualityAssessment, QualityTier, RotationSignal,
    SecurityInput, ValuationAssessment, ValuationTier,
};
