//! Configuration management for SVIP services.
//!
//! All services share one configuration file at `~/.svip/config.json`.
//! An `allocation.json` next to it, when present, is merged over the
//! `allocation` section (see [`crate::config_loader`]).
//!
//! # Configuration Priority
//!
//! 1. Environment variables (SVIP_* prefix, applied by [`Config::load_with_env`])
//! 2. `allocation.json` overlay
//! 3. `config.json` values
//! 4. Default values
//!
//! Overlays merge key by key over the defaults, so a `markets` object adds
//! or replaces individual markets and never drops a built-in cap table.
//!
//! # Environment Variable Mapping
//!
//! - `SVIP_CONFIG_DIR` → configuration directory (tilde expanded)
//! - `SVIP_HOST` → server.host
//! - `SVIP_PORT` → server.port
//! - `SVIP_LOG_LEVEL` → observability.log_level
//! - `SVIP_LOG_FORMAT` → observability.log_format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config_loader::{load_modular_config, merge_json};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SVIP_CONFIG_DIR") {
        return PathBuf::from(shellexpand::tilde(&dir).into_owned());
    }

    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".svip"),
        |dirs| dirs.home_dir().join(".svip"),
    )
}


// ============================================================================
// Service Configuration
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host. Default: "127.0.0.1" (local only)
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets to pin at `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

// ============================================================================
// Allocation Configuration
// ============================================================================

/// Per-market cap table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketParams {
    /// Maximum weight of any single security
    pub single_security_cap: f64,
    /// Maximum summed weight of one theme bucket
    pub theme_bucket_cap: f64,
}

impl MarketParams {
    pub const fn new(single_security_cap: f64, theme_bucket_cap: f64) -> Self {
        Self {
            single_security_cap,
            theme_bucket_cap,
        }
    }
}

impl Default for MarketParams {
    fn default() -> Self {
        Self::new(0.08, 0.30)
    }
}

/// Cash reserve levels and the thresholds that select them.
///
/// Rules are evaluated in priority order; the first match wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CashLevelConfig {
    /// Share of tier-C names among Core-quality securities above which the
    /// high-stress level applies
    pub stress_c_ratio: f64,
    /// Fewer tier-A Core-quality names than this selects the conservative level
    pub min_tier_a_count: usize,
    /// At least this many accelerating, non-C Core-quality names selects the
    /// aggressive level
    pub min_accelerating_count: usize,
    pub high_stress: f64,
    pub conservative: f64,
    pub aggressive: f64,
    pub default: f64,
}

impl Default for CashLevelConfig {
    fn default() -> Self {
        Self {
            stress_c_ratio: 0.60,
            min_tier_a_count: 6,
            min_accelerating_count: 4,
            high_stress: 0.30,
            conservative: 0.20,
            aggressive: 0.10,
            default: 0.15,
        }
    }
}

/// Thematic rotation tilt parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// |Z| at or beyond which the strong adjustment applies
    pub z_strong: f64,
    /// |Z| at or beyond which the mild adjustment applies
    pub z_mild: f64,
    /// Multiplier delta for strong signals (0.10 = ±10%)
    pub strong_adjustment: f64,
    /// Multiplier delta for mild signals
    pub mild_adjustment: f64,
    /// Cross-theme standard deviation below which the spread is treated as 1.0
    pub min_std: f64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            z_strong: 1.0,
            z_mild: 0.5,
            strong_adjustment: 0.10,
            mild_adjustment: 0.05,
            min_std: 1e-6,
        }
    }
}

/// Weight pipeline configuration: caps, factor mapping, glide path and
/// convergence bounds.
///
/// Read-only input to every allocation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// Quality score mapped to a quality factor of 0
    pub quality_floor: f64,
    /// Quality score mapped to a quality factor of 1
    pub quality_ceiling: f64,
    /// Cap table used when the target market has no entry in `markets`
    pub default_market: MarketParams,
    /// Per-market cap tables, keyed by upper-case market code
    pub markets: BTreeMap<String, MarketParams>,
    /// Maximum summed weight of one sector (all markets)
    pub sector_cap: f64,
    /// Absolute ceiling on the equity budget
    pub core_pool_weight_max: f64,
    /// Fraction of the computed target bought when opening a new position
    pub initial_position_ratio: f64,
    /// Target-vs-current difference below which no add or reduce is issued
    pub rebalance_band: f64,
    pub cash: CashLevelConfig,
    pub rotation: RotationConfig,
    /// Upper bound on single-security redistribution passes
    pub max_projection_passes: u32,
    /// Overflow below which the single-security projection counts as converged
    pub convergence_tolerance: f64,
    /// Slack allowed before a cap breach is reported
    pub violation_tolerance: f64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        let markets = BTreeMap::from([
            ("US".to_string(), MarketParams::new(0.08, 0.30)),
            ("HK".to_string(), MarketParams::new(0.06, 0.25)),
            ("CN".to_string(), MarketParams::new(0.05, 0.20)),
        ]);

        Self {
            quality_floor: 65.0,
            quality_ceiling: 90.0,
            default_market: MarketParams::default(),
            markets,
            sector_cap: 0.25,
            core_pool_weight_max: 0.85,
            initial_position_ratio: 0.50,
            rebalance_band: 0.005,
            cash: CashLevelConfig::default(),
            rotation: RotationConfig::default(),
            max_projection_passes: 10,
            convergence_tolerance: 1e-9,
            violation_tolerance: 0.01,
        }
    }
}

impl AllocationConfig {
    /// Resolve the cap table for a market code, falling back to the default.
    pub fn market_params(&self, market: &str) -> MarketParams {
        let key = market.trim().to_ascii_uppercase();
        self.markets
            .get(&key)
            .copied()
            .unwrap_or(self.default_market)
    }
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration shared by all SVIP services.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub allocation: AllocationConfig,
}

impl Config {
    /// Load configuration from the config directory.
    ///
    /// Missing files fall back to defaults.
    pub fn load() -> Result<Self> {
        Self::load_dir(&config_dir())
    }

    /// Load configuration (with modular overlays) from a specific directory.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let overlay = load_modular_config(Some(dir.to_path_buf()))?;

        // Only the allocation section is seeded: the other sections accept
        // field aliases that would collide with serialized defaults.
        let mut value = serde_json::json!({
            "allocation": serde_json::to_value(AllocationConfig::default())
                .context("Failed to serialize default allocation config")?,
        });
        merge_json(&mut value, overlay);

        serde_json::from_value(value)
            .with_context(|| format!("Failed to parse config from {}", dir.display()))
    }

    /// Load from `dir` (or the default directory) and apply environment
    /// overrides.
    pub fn load_with_env(dir: Option<&Path>) -> Result<Self> {
        let mut config = match dir {
            Some(dir) => Self::load_dir(dir)?,
            None => Self::load()?,
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("SVIP_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("SVIP_PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid SVIP_PORT"),
            }
        }
        if let Ok(level) = std::env::var("SVIP_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("SVIP_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4450
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 4450);
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.allocation.quality_floor, 65.0);
        assert_eq!(config.allocation.max_projection_passes, 10);
        assert_eq!(config.allocation.markets.len(), 3);
    }

    #[test]
    fn test_market_params_lookup() {
        let config = AllocationConfig::default();
        assert_eq!(config.market_params("HK"), MarketParams::new(0.06, 0.25));
        assert_eq!(config.market_params(" cn "), MarketParams::new(0.05, 0.20));
        // Unknown markets use the global default
        assert_eq!(config.market_params("JP"), config.default_market);
    }

    #[test]
    fn test_partial_config_deserialization() {
        let json = r#"{ "allocation": { "sector_cap": 0.2, "cash": { "default": 0.12 } } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.allocation.sector_cap, 0.2);
        assert_eq!(config.allocation.cash.default, 0.12);
        assert_eq!(config.allocation.cash.high_stress, 0.30);
        assert_eq!(config.allocation.quality_ceiling, 90.0);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.allocation, config.allocation);
    }

    #[test]
    fn test_observability_aliases() {
        let json = r#"{ "observability": { "level": "debug", "format": "json" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.log_format, "json");
    }

    #[test]
    fn test_load_dir_reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), r#"{ "server": { "port": 5000 } }"#).unwrap();

        let config = Config::load_dir(dir.path()).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.allocation, AllocationConfig::default());
    }

    #[test]
    fn test_market_overlay_keeps_builtin_caps() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("allocation.json"),
            r#"{ "markets": { "SG": { "single_security_cap": 0.07, "theme_bucket_cap": 0.28 } } }"#,
        )
        .unwrap();

        let config = Config::load_dir(dir.path()).unwrap();
        let allocation = &config.allocation;
        assert_eq!(allocation.markets.len(), 4);
        assert_eq!(allocation.market_params("SG"), MarketParams::new(0.07, 0.28));
        assert_eq!(allocation.market_params("HK"), MarketParams::new(0.06, 0.25));
        assert_eq!(allocation.market_params("CN"), MarketParams::new(0.05, 0.20));
    }

    #[test]
    fn test_market_overlay_tightens_one_field() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{ "allocation": { "markets": { "HK": { "single_security_cap": 0.04 } } } }"#,
        )
        .unwrap();

        let config = Config::load_dir(dir.path()).unwrap();
        assert_eq!(config.allocation.market_params("HK"), MarketParams::new(0.04, 0.25));
    }

    #[test]
    fn test_observability_aliases_in_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{ "observability": { "level": "debug" } }"#,
        )
        .unwrap();

        let config = Config::load_dir(dir.path()).unwrap();
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_load_dir_missing_files_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_dir(dir.path()).unwrap();
        assert_eq!(config.server.port, 4450);
    }
}
