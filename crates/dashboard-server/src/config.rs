use anyhow::{bail, Context, Result};
use credential_store::CredentialBackend;
use serde::Serialize;
use std::str::FromStr;

/// Upper bound for `DEFAULT_LOOKBACK_DAYS` (about 50 years of daily bars).
pub const MAX_LOOKBACK_DAYS: i64 = 18_250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsSource {
    GNews,
    NewsApi,
}

impl FromStr for NewsSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gnews" => Ok(NewsSource::GNews),
            "newsapi" => Ok(NewsSource::NewsApi),
            other => bail!("unknown NEWS_PROVIDER '{}', expected gnews or newsapi", other),
        }
    }
}

/// Everything the dashboard reads from the environment.
///
/// The feature flags replace what used to be separate app variants: one with
/// a predict page, one with self-registration backed by SQLite.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub bind_addr: String,

    // Providers
    pub yahoo_chart_url: Option<String>,
    pub news_source: NewsSource,
    pub news_api_key: Option<String>,

    // Feature flags
    pub enable_prediction: bool,
    pub enable_registration: bool,
    pub credential_backend: CredentialBackend,
    pub database_url: String,

    // Seed account
    pub admin_username: String,
    pub admin_password: Option<String>,

    // Sessions and login lockout
    pub session_ttl_secs: u64,
    pub auth_max_failures: u32,
    pub auth_failure_window_secs: u64,
    pub auth_lockout_secs: u64,

    // Chart defaults
    pub default_symbol: String,
    pub default_lookback_days: i64,
    pub short_ma_window: usize,
    pub long_ma_window: usize,
    pub rsi_window: usize,
    pub prediction_horizon_days: usize,
    pub prediction_ma_window: usize,
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup so tests don't touch process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let optional = |key: &str| -> Option<String> {
            lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        };

        let config = Self {
            bind_addr: var("BIND_ADDR", "0.0.0.0:3000"),

            yahoo_chart_url: optional("YAHOO_CHART_URL"),
            news_source: var("NEWS_PROVIDER", "gnews").parse()?,
            news_api_key: optional("NEWS_API_KEY"),

            enable_prediction: parse_flag("ENABLE_PREDICTION", &var("ENABLE_PREDICTION", "true"))?,
            enable_registration: parse_flag("ENABLE_REGISTRATION", &var("ENABLE_REGISTRATION", "false"))?,
            credential_backend: var("CREDENTIAL_BACKEND", "memory")
                .parse()
                .map_err(|e| anyhow::anyhow!("CREDENTIAL_BACKEND: {}", e))?,
            database_url: var("DATABASE_URL", "sqlite:stonks.db"),

            admin_username: var("ADMIN_USERNAME", "admin"),
            admin_password: optional("ADMIN_PASSWORD"),

            session_ttl_secs: var("SESSION_TTL_SECS", "86400")
                .parse()
                .context("SESSION_TTL_SECS must be an integer")?,
            auth_max_failures: var("AUTH_MAX_FAILURES", "5")
                .parse()
                .context("AUTH_MAX_FAILURES must be an integer")?,
            auth_failure_window_secs: var("AUTH_FAILURE_WINDOW_SECS", "300")
                .parse()
                .context("AUTH_FAILURE_WINDOW_SECS must be an integer")?,
            auth_lockout_secs: var("AUTH_LOCKOUT_SECS", "900")
                .parse()
                .context("AUTH_LOCKOUT_SECS must be an integer")?,

            default_symbol: var("DEFAULT_SYMBOL", "AAPL").to_uppercase(),
            default_lookback_days: var("DEFAULT_LOOKBACK_DAYS", "365")
                .parse()
                .context("DEFAULT_LOOKBACK_DAYS must be an integer")?,
            short_ma_window: var("SHORT_MA_WINDOW", "50")
                .parse()
                .context("SHORT_MA_WINDOW must be an integer")?,
            long_ma_window: var("LONG_MA_WINDOW", "200")
                .parse()
                .context("LONG_MA_WINDOW must be an integer")?,
            rsi_window: var("RSI_WINDOW", "14")
                .parse()
                .context("RSI_WINDOW must be an integer")?,
            prediction_horizon_days: var("PREDICTION_HORIZON_DAYS", "10")
                .parse()
                .context("PREDICTION_HORIZON_DAYS must be an integer")?,
            prediction_ma_window: var("PREDICTION_MA_WINDOW", "10")
                .parse()
                .context("PREDICTION_MA_WINDOW must be an integer")?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, window) in [
            ("SHORT_MA_WINDOW", self.short_ma_window),
            ("LONG_MA_WINDOW", self.long_ma_window),
            ("RSI_WINDOW", self.rsi_window),
            ("PREDICTION_MA_WINDOW", self.prediction_ma_window),
        ] {
            if window == 0 {
                bail!("{} must be greater than zero", name);
            }
        }
        if self.default_lookback_days <= 0 || self.default_lookback_days > MAX_LOOKBACK_DAYS {
            bail!(
                "DEFAULT_LOOKBACK_DAYS must be between 1 and {}",
                MAX_LOOKBACK_DAYS
            );
        }
        if self.session_ttl_secs == 0 {
            bail!("SESSION_TTL_SECS must be greater than zero");
        }
        if self.auth_max_failures == 0 {
            bail!("AUTH_MAX_FAILURES must be greater than zero");
        }
        if self.default_symbol.is_empty() {
            bail!("DEFAULT_SYMBOL must not be empty");
        }
        if self.admin_password.is_none()
            && !self.enable_registration
            && self.credential_backend == CredentialBackend::Memory
        {
            bail!("no way to log in: set ADMIN_PASSWORD or ENABLE_REGISTRATION=true");
        }
        Ok(())
    }

    /// Log the effective configuration (secrets omitted).
    pub fn log_summary(&self) {
        tracing::info!("Configuration loaded and validated");
        tracing::info!("  Bind address: {}", self.bind_addr);
        tracing::info!(
            "  Market data: yahoo ({})",
            self.yahoo_chart_url.as_deref().unwrap_or("default endpoint")
        );
        tracing::info!(
            "  News: {:?} (key {})",
            self.news_source,
            if self.news_api_key.is_some() { "set" } else { "missing" }
        );
        tracing::info!(
            "  Features: prediction={} registration={} credentials={:?}",
            self.enable_prediction,
            self.enable_registration,
            self.credential_backend
        );
        tracing::info!(
            "  Indicators: SMA {}/{} RSI {} predict {}d over SMA {}",
            self.short_ma_window,
            self.long_ma_window,
            self.rsi_window,
            self.prediction_horizon_days,
            self.prediction_ma_window
        );
        if self.news_api_key.is_none() {
            tracing::warn!("NEWS_API_KEY not set; news requests will fail");
        }
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{} must be a boolean, got '{}'", name, other),
    }
}

/// Test helper: a config from literal key/value pairs on top of a working baseline.
#[cfg(test)]
pub(crate) fn config_from_pairs(pairs: &[(&str, &str)]) -> Result<DashboardConfig> {
    let mut map = std::collections::HashMap::new();
    map.insert("ADMIN_PASSWORD".to_string(), "password".to_string());
    for (k, v) in pairs {
        map.insert(k.to_string(), v.to_string());
    }
    DashboardConfig::from_lookup(|key| map.get(key).cloned())
}
