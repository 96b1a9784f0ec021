use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub hyperliquid: HyperliquidConfig,
    #[serde(default)]
    pub bybit: BybitConfig,
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HyperliquidConfig {
    /// Info endpoint base URL
    #[serde(default = "default_hyperliquid_url")]
    pub base_url: String,
    /// Wallet address whose history is reconciled
    pub user_address: String,
}

fn default_hyperliquid_url() -> String {
    "https://api.hyperliquid.xyz".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct BybitConfig {
    #[serde(default = "default_bybit_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    /// Bybit recommended recv window in milliseconds
    #[serde(default = "default_recv_window")]
    pub recv_window: u64,
}

fn default_bybit_url() -> String {
    "https://api.bybit.com".to_string()
}

fn default_recv_window() -> u64 {
    5000
}

impl Default for BybitConfig {
    fn default() -> Self {
        Self {
            base_url: default_bybit_url(),
            api_key: String::new(),
            api_secret: String::new(),
            recv_window: default_recv_window(),
        }
    }
}

impl BybitConfig {
    /// Override credentials from BYBIT_API_KEY / BYBIT_API_SECRET when set.
    pub fn apply_env_credentials(&mut self) {
        if let Ok(key) = std::env::var("BYBIT_API_KEY") {
            self.api_key = key;
        }
        if let Ok(secret) = std::env::var("BYBIT_API_SECRET") {
            self.api_secret = secret;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Default target coins when the CLI does not pass its own list
    pub coins: Vec<String>,
    #[serde(default)]
    pub notional: NotionalTable,
}

/// Margin assumption per instrument used for percentage returns.
///
/// Explicit configuration rather than a constant baked into the metrics:
/// instruments not present in `overrides` use `default`.
#[derive(Debug, Clone, Deserialize)]
pub struct NotionalTable {
    #[serde(default = "default_notional")]
    pub default: Decimal,
    #[serde(default)]
    pub overrides: HashMap<String, Decimal>,
}

fn default_notional() -> Decimal {
    dec!(20)
}

impl Default for NotionalTable {
    fn default() -> Self {
        Self {
            default: default_notional(),
            overrides: HashMap::new(),
        }
    }
}

impl NotionalTable {
    pub fn notional_for(&self, coin: &str) -> Decimal {
        self.overrides.get(coin).copied().unwrap_or(self.default)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    /// Fixed pause between venue requests in milliseconds
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    /// Max rows requested per Bybit page
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

fn default_page_delay_ms() -> u64 {
    200
}

fn default_page_limit() -> u32 {
    100
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: default_page_delay_ms(),
            page_limit: default_page_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Directory CSV reports are written into
    #[serde(default = "default_out_dir")]
    pub out_dir: String,
}

fn default_out_dir() -> String {
    "reports".to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file and environment overrides
    /// (CARRY_BYBIT__API_KEY, etc.)
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("CARRY")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}
