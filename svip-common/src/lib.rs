//! SVIP Common - Shared types, utilities, and configuration for the SVIP services.
//!
//! This crate provides:
//! - Configuration types and loading (single file plus modular overlays)
//! - Configuration validation
//! - Request error types
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod config_loader;
pub mod error;
pub mod logging;
pub mod validation;

pub use config::{
    AllocationConfig, CashLevelConfig, Config, MarketParams, ObservabilityConfig, RotationConfig,
    ServerConfig,
};
pub use error::Error;
pub use validation::{Validate, ValidationError, ValidationResult};
