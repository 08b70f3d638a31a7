//! Configuration validation for SVIP services.
//!
//! Malformed configuration is the only fatal condition in an allocation
//! run, so it is rejected here, eagerly, before any pipeline executes.

use thiserror::Error;

use crate::config::{
    AllocationConfig, CashLevelConfig, Config, MarketParams, ObservabilityConfig, RotationConfig,
};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Configuration conflict: {reason}")]
    Conflict { reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Collapse a list of errors into a single result.
    pub fn collect(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Multiple(errors)),
        }
    }

    /// Flattened display messages, one per leaf error.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Multiple(errors) => errors.iter().flat_map(Self::messages).collect(),
            other => vec![other.to_string()],
        }
    }

    /// Flatten nested `Multiple` errors into a list.
    pub fn into_vec(self) -> Vec<ValidationError> {
        match self {
            Self::Multiple(errors) => errors.into_iter().flat_map(Self::into_vec).collect(),
            other => vec![other],
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

/// Value must be finite and in (0, 1].
fn check_cap(errors: &mut Vec<ValidationError>, field: &str, value: f64) {
    if !(value.is_finite() && value > 0.0 && value <= 1.0) {
        errors.push(ValidationError::invalid(
            field,
            format!("{value} must be in (0, 1]"),
        ));
    }
}

/// Value must be finite and in [0, 1).
fn check_fraction(errors: &mut Vec<ValidationError>, field: &str, value: f64) {
    if !(value.is_finite() && (0.0..1.0).contains(&value)) {
        errors.push(ValidationError::invalid(
            field,
            format!("{value} must be in [0, 1)"),
        ));
    }
}

fn check_non_negative(errors: &mut Vec<ValidationError>, field: &str, value: f64) {
    if !(value.is_finite() && value >= 0.0) {
        errors.push(ValidationError::invalid(
            field,
            format!("{value} must be finite and non-negative"),
        ));
    }
}

fn check_market(errors: &mut Vec<ValidationError>, prefix: &str, params: &MarketParams) {
    check_cap(
        errors,
        &format!("{prefix}.single_security_cap"),
        params.single_security_cap,
    );
    check_cap(
        errors,
        &format!("{prefix}.theme_bucket_cap"),
        params.theme_bucket_cap,
    );
}

impl Validate for Config {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.observability.validate() {
            errors.push(e);
        }

        if let Err(e) = self.allocation.validate() {
            errors.extend(e.into_vec());
        }

        ValidationError::collect(errors)
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
        const FORMATS: &[&str] = &["json", "pretty"];

        let mut errors = Vec::new();
        if !LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            errors.push(ValidationError::invalid(
                "observability.log_level",
                format!("unknown level '{}'", self.log_level),
            ));
        }
        if !FORMATS.contains(&self.log_format.as_str()) {
            errors.push(ValidationError::invalid(
                "observability.log_format",
                format!("unknown format '{}', expected json or pretty", self.log_format),
            ));
        }
        ValidationError::collect(errors)
    }
}

impl Validate for AllocationConfig {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if !(self.quality_floor.is_finite() && self.quality_ceiling.is_finite()) {
            errors.push(ValidationError::invalid(
                "allocation.quality_floor",
                "quality floor and ceiling must be finite",
            ));
        } else if self.quality_floor >= self.quality_ceiling {
            errors.push(ValidationError::Conflict {
                reason: format!(
                    "allocation.quality_floor ({}) must be below allocation.quality_ceiling ({})",
                    self.quality_floor, self.quality_ceiling
                ),
            });
        }

        check_market(&mut errors, "allocation.default_market", &self.default_market);
        for (code, params) in &self.markets {
            if code.trim().is_empty() || *code != code.to_ascii_uppercase() {
                errors.push(ValidationError::invalid(
                    format!("allocation.markets.{code}"),
                    "market codes must be non-empty and upper-case",
                ));
            }
            check_market(&mut errors, &format!("allocation.markets.{code}"), params);
        }

        check_cap(&mut errors, "allocation.sector_cap", self.sector_cap);
        check_cap(
            &mut errors,
            "allocation.core_pool_weight_max",
            self.core_pool_weight_max,
        );
        check_cap(
            &mut errors,
            "allocation.initial_position_ratio",
            self.initial_position_ratio,
        );
        check_fraction(&mut errors, "allocation.rebalance_band", self.rebalance_band);

        if self.max_projection_passes == 0 {
            errors.push(ValidationError::invalid(
                "allocation.max_projection_passes",
                "at least one projection pass is required",
            ));
        }
        check_non_negative(
            &mut errors,
            "allocation.convergence_tolerance",
            self.convergence_tolerance,
        );
        check_non_negative(
            &mut errors,
            "allocation.violation_tolerance",
            self.violation_tolerance,
        );

        if let Err(e) = self.cash.validate() {
            errors.extend(e.into_vec());
        }
        if let Err(e) = self.rotation.validate() {
            errors.extend(e.into_vec());
        }

        ValidationError::collect(errors)
    }
}

impl Validate for CashLevelConfig {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if !(self.stress_c_ratio.is_finite() && (0.0..=1.0).contains(&self.stress_c_ratio)) {
            errors.push(ValidationError::invalid(
                "allocation.cash.stress_c_ratio",
                format!("{} must be in [0, 1]", self.stress_c_ratio),
            ));
        }
        check_fraction(&mut errors, "allocation.cash.high_stress", self.high_stress);
        check_fraction(&mut errors, "allocation.cash.conservative", self.conservative);
        check_fraction(&mut errors, "allocation.cash.aggressive", self.aggressive);
        check_fraction(&mut errors, "allocation.cash.default", self.default);

        ValidationError::collect(errors)
    }
}

impl Validate for RotationConfig {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if !(self.z_mild.is_finite() && self.z_strong.is_finite())
            || self.z_mild < 0.0
            || self.z_mild >= self.z_strong
        {
            errors.push(ValidationError::Conflict {
                reason: format!(
                    "allocation.rotation requires 0 <= z_mild ({}) < z_strong ({})",
                    self.z_mild, self.z_strong
                ),
            });
        }

        check_fraction(
            &mut errors,
            "allocation.rotation.strong_adjustment",
            self.strong_adjustment,
        );
        check_fraction(
            &mut errors,
            "allocation.rotation.mild_adjustment",
            self.mild_adjustment,
        );
        if self.mild_adjustment > self.strong_adjustment {
            errors.push(ValidationError::Conflict {
                reason: "allocation.rotation.mild_adjustment exceeds strong_adjustment".into(),
            });
        }

        if !(self.min_std.is_finite() && self.min_std > 0.0) {
            errors.push(ValidationError::invalid(
                "allocation.rotation.min_std",
                "must be positive",
            ));
        }

        ValidationError::collect(errors)
    }
}
