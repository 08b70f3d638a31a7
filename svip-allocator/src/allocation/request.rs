//! Allocation request envelope.
//!
//! Request checks guard the HTTP and CLI boundary only. The pipeline
//! accepts whatever it is given and defaults missing scores.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use svip_common::{Validate, ValidationError, ValidationResult};

use super::types::{PortfolioInput, SecurityInput};

/// One allocation run: portfolio inputs plus the scored universe.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AllocationRequest {
    #[serde(default)]
    pub portfolio: PortfolioInput,
    pub securities: Vec<SecurityInput>,
}

fn invalid(field: String, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

fn check_finite(errors: &mut Vec<ValidationError>, field: String, value: f64) {
    if !value.is_finite() {
        errors.push(invalid(field, format!("{value} is not a finite number")));
    }
}

impl Validate for AllocationRequest {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        let portfolio = &self.portfolio;
        if portfolio.market.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                field: "portfolio.market".into(),
            });
        }
        check_finite(
            &mut errors,
            "portfolio.macro_risk_factor".into(),
            portfolio.macro_risk_factor,
        );
        check_finite(
            &mut errors,
            "portfolio.tail_risk_factor".into(),
            portfolio.tail_risk_factor,
        );
        if let Some(equity) = portfolio.base_target_equity {
            if !(equity.is_finite() && (0.0..=1.0).contains(&equity)) {
                errors.push(invalid(
                    "portfolio.base_target_equity".into(),
                    format!("{equity} must be in [0, 1]"),
                ));
            }
        }

        let mut seen = HashSet::new();
        for (i, security) in self.securities.iter().enumerate() {
            let prefix = format!("securities[{i}]");
            let symbol = security.symbol.trim();

            if symbol.is_empty() {
                errors.push(ValidationError::MissingField {
                    field: format!("{prefix}.symbol"),
                });
            } else if !seen.insert(symbol) {
                errors.push(invalid(
                    format!("{prefix}.symbol"),
                    format!("duplicate symbol '{symbol}'"),
                ));
            }

            let current = security.current_weight;
            if !(current.is_finite() && (0.0..=1.0).contains(&current)) {
                errors.push(invalid(
                    format!("{prefix}.current_weight"),
                    format!("{current} must be in [0, 1]"),
                ));
            }

            if let Some(quality) = security.quality {
                if !(quality.score.is_finite() && (0.0..=100.0).contains(&quality.score)) {
                    errors.push(invalid(
                        format!("{prefix}.quality.score"),
                        format!("{} must be in [0, 100]", quality.score),
                    ));
                }
            }
            if let Some(factor) = security.valuation.and_then(|v| v.factor) {
                check_finite(&mut errors, format!("{prefix}.valuation.factor"), factor);
            }
            if let Some(acceleration) = security.acceleration {
                if let Some(factor) = acceleration.factor {
                    check_finite(&mut errors, format!("{prefix}.acceleration.factor"), factor);
                }
                if let Some(score) = acceleration.score {
                    check_finite(&mut errors, format!("{prefix}.acceleration.score"), score);
                }
            }
        }

        ValidationError::collect(errors)
    }
}
