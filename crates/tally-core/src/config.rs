//! # Engine Configuration
//!
//! Loyalty rates and transaction settings.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`TALLY_*`)
//! 2. Defaults (this file)
//!
//! | Variable | Field | Default |
//! |---|---|---|
//! | `TALLY_LOYALTY_ENABLED` | `loyalty.enabled` | `true` |
//! | `TALLY_POINTS_PER_UNIT` | `loyalty.points_per_unit` | `1` |
//! | `TALLY_POINTS_UNIT_CENTS` | `loyalty.unit_cents` | `100` |
//! | `TALLY_REDEMPTION_CENTS_PER_POINT` | `loyalty.redemption_cents_per_point` | `1` |
//! | `TALLY_INVOICE_PREFIX` | `invoice_prefix` | `INV` |
//! | `TALLY_BUSY_RETRIES` | `busy_retries` | `3` |
//!
//! Configuration is read-only after startup.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Tier bonus: customers whose lifetime spend reaches the threshold earn
/// `multiplier_bps / 10000` times the base points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyTier {
    pub min_total_spent_cents: i64,
    /// 10000 = 1×, 15000 = 1.5×.
    pub multiplier_bps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoyaltyConfig {
    pub enabled: bool,
    /// Points earned per `unit_cents` of sale total.
    pub points_per_unit: i64,
    pub unit_cents: i64,
    /// What one point is worth when redeemed.
    pub redemption_cents_per_point: i64,
    pub tiers: Vec<LoyaltyTier>,
}

impl Default for LoyaltyConfig {
    /// One point per whole currency unit spent, one cent per point redeemed.
    fn default() -> Self {
        LoyaltyConfig {
            enabled: true,
            points_per_unit: 1,
            unit_cents: 100,
            redemption_cents_per_point: 1,
            tiers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub loyalty: LoyaltyConfig,
    /// Prefix of generated invoice numbers.
    pub invoice_prefix: String,
    /// How often a unit of work retries when the write lock is busy.
    pub busy_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            loyalty: LoyaltyConfig::default(),
            invoice_prefix: "INV".to_string(),
            busy_retries: 3,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup (environment, map, …).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = EngineConfig::default();
        let base = defaults.loyalty;

        let config = EngineConfig {
            loyalty: LoyaltyConfig {
                enabled: parse_or(&lookup, "TALLY_LOYALTY_ENABLED", base.enabled)?,
                points_per_unit: parse_or(&lookup, "TALLY_POINTS_PER_UNIT", base.points_per_unit)?,
                unit_cents: parse_or(&lookup, "TALLY_POINTS_UNIT_CENTS", base.unit_cents)?,
                redemption_cents_per_point: parse_or(
                    &lookup,
                    "TALLY_REDEMPTION_CENTS_PER_POINT",
                    base.redemption_cents_per_point,
                )?,
                tiers: base.tiers,
            },
            invoice_prefix: lookup("TALLY_INVOICE_PREFIX").unwrap_or(defaults.invoice_prefix),
            busy_retries: parse_or(&lookup, "TALLY_BUSY_RETRIES", defaults.busy_retries)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Rejects rates that would divide by zero or award negative points.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loyalty.unit_cents <= 0 {
            return Err(ConfigError::InvalidValue("TALLY_POINTS_UNIT_CENTS".to_string()));
        }
        if self.loyalty.points_per_unit < 0 {
            return Err(ConfigError::InvalidValue("TALLY_POINTS_PER_UNIT".to_string()));
        }
        if self.loyalty.redemption_cents_per_point <= 0 {
            return Err(ConfigError::InvalidValue(
                "TALLY_REDEMPTION_CENTS_PER_POINT".to_string(),
            ));
        }
        if self.invoice_prefix.trim().is_empty() {
            return Err(ConfigError::InvalidValue("TALLY_INVOICE_PREFIX".to_string()));
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
