//! Pool Classifier.
//!
//! Splits securities into Core / Watch / Block. Quality decides
//! eligibility; an expensive valuation or a decaying phase demotes a
//! Core-quality name to Watch rather than excluding it.

use super::types::{Pool, QualityTier, SecurityInput};

/// Classify one security.
///
/// Rules, first match wins:
/// 1. quality tier Core, valuation not C, phase not Decaying → Core
/// 2. quality tier Core or Watch → Watch
/// 3. otherwise (or no quality assessment at all) → Block
pub fn classify(security: &SecurityInput) -> Pool {
    let Some(quality) = security.quality else {
        return Pool::Block;
    };

    match quality.tier {
        QualityTier::Core if !security.is_expensive() && !security.is_decaying() => Pool::Core,
        QualityTier::Core | QualityTier::Watch => Pool::Watch,
        QualityTier::Block => Pool::Block,
    }
}

/// Classify every security, preserving input order.
pub fn classify_all(securities: &[SecurityInput]) -> Vec<Pool> {
    let pools: Vec<Pool> = securities.iter().map(classify).collect();

    tracing::debug!(
        core = pools.iter().filter(|p| **p == Pool::Core).count(),
        watch = pools.iter().filter(|p| **p == Pool::Watch).count(),
        block = pools.iter().filter(|p| **p == Pool::Block).count(),
        "Pools classified"
    );

    pools
}
