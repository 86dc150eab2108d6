//! Engine configuration
//!
//! Layered: built-in defaults, then an optional file, then `COWGUARD__*`
//! environment variables (`COWGUARD__LEDGER__TREASURY_ID`,
//! `COWGUARD__TARIFF__PROFIT_MARGIN`, ...).

use cowguard_actuary::TariffTable;
use cowguard_common::{CowGuardError, ProductSpec, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ledger::LedgerSettings;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "COWGUARD";

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tariff: TariffTable,
    pub ledger: LedgerSettings,
    /// Products created at startup
    pub products: ProductSettings,
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tariff: TariffTable::default(),
            ledger: LedgerSettings::default(),
            products: ProductSettings::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load from `.env`, the environment and no file
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load from `.env`, an optional config file and the environment
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        // Missing .env is fine
        let _ = dotenvy::dotenv();

        let defaults = config::Config::try_from(&Self::default()).map_err(config_error)?;
        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let cfg: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_error)?
            .try_deserialize()
            .map_err(config_error)?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.tariff.validate()?;
        if self.ledger.treasury_id.trim().is_empty() {
            return Err(CowGuardError::Config("ledger.treasury_id must not be empty".into()));
        }
        if !(0.0..=cowguard_common::MAX_RISK_SCORE).contains(&self.ledger.high_risk_threshold) {
            return Err(CowGuardError::Config(format!(
                "ledger.high_risk_threshold {} outside [0, 100]",
                self.ledger.high_risk_threshold
            )));
        }
        for spec in &self.products.catalogue {
            spec.validate()?;
        }
        Ok(())
    }
}

/// Startup product catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductSettings {
    /// Install the built-in catalogue when `catalogue` is empty
    pub install_defaults: bool,
    pub catalogue: Vec<ProductSpec>,
}

impl Default for ProductSettings {
    fn default() -> Self {
        Self {
            install_defaults: true,
            catalogue: Vec::new(),
        }
    }
}

impl ProductSettings {
    /// Specs to create at startup
    pub fn startup_catalogue(&self) -> Vec<ProductSpec> {
        if self.catalogue.is_empty() && self.install_defaults {
            ProductSpec::default_catalogue()
        } else {
            self.catalogue.clone()
        }
    }
}

fn config_error(err: config::ConfigError) -> CowGuardError {
    CowGuardError::Config(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = EngineConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.products.startup_catalogue().len(), 4);
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join(format!("cowguard-config-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("engine.json");
        std::fs::write(
            &path,
            r#"{"ledger": {"treasury_id": "ops-treasury"}, "tariff": {"profit_margin": 0.15}}"#,
        )
        .unwrap();

        let cfg = EngineConfig::load_from(Some(&path)).unwrap();
        assert_eq!(cfg.ledger.treasury_id, "ops-treasury");
        assert_eq!(cfg.tariff.profit_margin, 0.15);
        assert_eq!(cfg.tariff.operating_cost, 0.05);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.ledger.high_risk_threshold = 150.0;
        assert!(matches!(cfg.validate(), Err(CowGuardError::Config(_))));
    }

    #[test]
    fn test_explicit_catalogue_wins() {
        let settings = ProductSettings {
            install_defaults: true,
            catalogue: vec![ProductSpec::default_catalogue().remove(0)],
        };
        assert_eq!(settings.startup_catalogue().len(), 1);
    }
}
