//! Engine configuration.
//!
//! Fee tables, provider credentials and reporting knobs are injected rather than
//! compiled in, so policy changes only need a config change. Configuration can be
//! loaded from YAML files and overridden with `PAYOUT__`-prefixed environment variables.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::PayoutMethod;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "payout.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "PAYOUT_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "PAYOUT";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "PAYOUT_LOG";

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Fee and limit policy for one payout method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodPolicy {
    /// Flat fee charged per payout
    pub fixed_fee: BigDecimal,
    /// Percentage of the amount charged on top of the flat fee (e.g. 1.5 for 1.5%)
    #[serde(default = "zero")]
    pub percentage_fee: BigDecimal,
    /// Smallest accepted payout amount
    pub minimum: BigDecimal,
    /// Largest accepted payout amount
    pub maximum: BigDecimal,
}

impl MethodPolicy {
    /// Flat-fee policy with no percentage component
    pub fn flat(fixed_fee: i64, minimum: i64, maximum: i64) -> Self {
        Self {
            fixed_fee: BigDecimal::from(fixed_fee),
            percentage_fee: zero(),
            minimum: BigDecimal::from(minimum),
            maximum: BigDecimal::from(maximum),
        }
    }

    fn validate(&self, code: &str) -> Result<(), ConfigError> {
        if self.fixed_fee < zero() || self.percentage_fee < zero() {
            return Err(ConfigError::Invalid(format!(
                "Fees for '{}' cannot be negative",
                code
            )));
        }
        if self.minimum > self.maximum {
            return Err(ConfigError::Invalid(format!(
                "Minimum for '{}' ({}) exceeds its maximum ({})",
                code, self.minimum, self.maximum
            )));
        }
        Ok(())
    }
}

fn zero() -> BigDecimal {
    BigDecimal::from(0)
}

/// Fee table, bounds and operating currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayoutPolicyConfig {
    /// Operating currency for every payout
    pub currency: String,
    /// Method whose policy applies to unknown or unconfigured methods
    pub default_method: PayoutMethod,
    /// Policies keyed by method code
    pub methods: HashMap<String, MethodPolicy>,
}

impl Default for PayoutPolicyConfig {
    fn default() -> Self {
        let methods = [
            (PayoutMethod::Gcash, MethodPolicy::flat(15, 100, 50_000)),
            (PayoutMethod::Paymaya, MethodPolicy::flat(15, 100, 50_000)),
            (PayoutMethod::BankTransfer, MethodPolicy::flat(25, 100, 1_000_000)),
            (PayoutMethod::Instapay, MethodPolicy::flat(15, 1, 50_000)),
            (PayoutMethod::Pesonet, MethodPolicy::flat(30, 1, 1_000_000)),
        ]
        .into_iter()
        .map(|(method, policy)| (method.code().to_string(), policy))
        .collect();

        Self {
            currency: "PHP".to_string(),
            default_method: PayoutMethod::BankTransfer,
            methods,
        }
    }
}

impl PayoutPolicyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.currency.trim().is_empty() {
            return Err(ConfigError::Invalid("Currency cannot be empty".to_string()));
        }
        if !self.methods.contains_key(self.default_method.code()) {
            return Err(ConfigError::Invalid(format!(
                "Default method '{}' has no policy",
                self.default_method
            )));
        }
        for (code, policy) in &self.methods {
            policy.validate(code)?;
        }
        Ok(())
    }
}

/// Disbursement provider connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API base URL, without trailing slash
    pub base_url: String,
    /// Secret API key, sent as the Basic auth username
    pub secret_key: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Minimum spacing between provider requests in milliseconds
    pub request_interval_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.paymongo.com/v1".to_string(),
            secret_key: String::new(),
            timeout_secs: 30,
            request_interval_ms: 500,
        }
    }
}

/// Payout state machine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Check bank accounts with the provider before moving funds
    pub verify_bank_accounts: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            verify_bank_accounts: true,
        }
    }
}

/// Reporting and health score settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Share of booking revenue retained by the platform (0.10 = 10%)
    pub commission_rate: BigDecimal,
    /// Revenue growth (percent) that earns a full growth score
    pub growth_threshold_pct: f64,
    /// Score points lost per percent of revenue refunded
    pub risk_scale: f64,
    /// Score points lost per percent of revenue still owed to hosts
    pub liquidity_scale: f64,
    /// Number of hosts in the ranking
    pub top_hosts_limit: usize,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            commission_rate: BigDecimal::new(10.into(), 2),
            growth_threshold_pct: 20.0,
            risk_scale: 5.0,
            liquidity_scale: 1.0,
            top_hosts_limit: 10,
        }
    }
}

impl ReconciliationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.commission_rate < zero() || self.commission_rate > BigDecimal::from(1) {
            return Err(ConfigError::Invalid(format!(
                "Commission rate must be between 0 and 1, got {}",
                self.commission_rate
            )));
        }
        if self.growth_threshold_pct <= 0.0 {
            return Err(ConfigError::Invalid(
                "Growth threshold must be positive".to_string(),
            ));
        }
        if self.risk_scale < 0.0 || self.liquidity_scale < 0.0 {
            return Err(ConfigError::Invalid(
                "Score scales cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub policy: PayoutPolicyConfig,
    pub provider: ProviderConfig,
    pub orchestrator: OrchestratorConfig,
    pub reconciliation: ReconciliationConfig,
}

impl EngineConfig {
    /// Load configuration from file and environment.
    ///
    /// Sources, later overriding earlier:
    /// 1. `payout.yaml` in the current directory (if it exists)
    /// 2. The file at `path` (if provided)
    /// 3. The file named by `PAYOUT_CONFIG` (if set)
    /// 4. Environment variables such as `PAYOUT__PROVIDER__SECRET_KEY`
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use config::{Config, Environment, File, FileFormat};

        let mut builder = Config::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config: EngineConfig = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from an inline YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        use config::{Config, File, FileFormat};

        let config: EngineConfig = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.policy.validate()?;
        self.reconciliation.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.policy.currency, "PHP");
        assert_eq!(config.policy.methods.len(), 5);
        assert_eq!(config.provider.request_interval_ms, 500);
    }

    #[test]
    fn test_yaml_overrides_fee_table() {
        let yaml = r#"
policy:
  currency: PHP
  default_method: bank_transfer
  methods:
    bank_transfer:
      fixed_fee: 20
      percentage_fee: "0.5"
      minimum: 100
      maximum: 500000
reconciliation:
  commission_rate: "0.12"
  top_hosts_limit: 5
"#;
        let config = EngineConfig::from_yaml_str(yaml).unwrap();
        let bank = &config.policy.methods["bank_transfer"];
        assert_eq!(bank.fixed_fee, BigDecimal::from(20));
        assert_eq!(bank.percentage_fee, BigDecimal::from_str("0.5").unwrap());
        assert_eq!(
            config.reconciliation.commission_rate,
            BigDecimal::from_str("0.12").unwrap()
        );
        assert_eq!(config.reconciliation.top_hosts_limit, 5);
        assert!(config.orchestrator.verify_bank_accounts);
    }

    #[test]
    fn test_inverted_bounds_are_rejected() {
        let mut config = EngineConfig::default();
        config
            .policy
            .methods
            .insert("gcash".to_string(), MethodPolicy::flat(15, 60_000, 50_000));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_default_method_must_have_policy() {
        let mut config = PayoutPolicyConfig::default();
        config.methods.remove("bank_transfer");
        assert!(config.validate().is_err());
    }
}
