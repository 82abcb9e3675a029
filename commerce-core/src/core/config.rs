//! Runtime Configuration
//!
//! All knobs come from environment variables with working defaults.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | COMMERCE_DB_PATH | commerce.db | SQLite database file |
//! | COMMERCE_LOG_LEVEL | info | Log level |
//! | COMMERCE_LOG_DIR | (unset) | Directory for daily log files |
//! | RETURN_WINDOW_DAYS | 7 | Post-delivery return eligibility |
//! | SHIPPING_CLAWBACK_RATIO | 0.5 | Partial-return shipping penalty share |
//! | RESTOCKING_FEE_RATIO | 0.05 | Restocking fee share of returned subtotal |
//! | FULL_RETURN_THRESHOLD | 0.95 | Return ratio treated as a full return |
//! | SWEEP_INTERVAL_SECS | 300 | Abandoned-reservation sweep cadence |
//! | SWEEP_MAX_AGE_MINUTES | 30 | Reservation age before it is reclaimed |

use crate::returns::refund::RefundPolicy;
use rust_decimal::prelude::*;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub return_window_days: i64,
    pub shipping_clawback_ratio: f64,
    pub restocking_fee_ratio: f64,
    pub full_return_threshold: f64,
    pub sweep_interval_secs: u64,
    pub sweep_max_age_minutes: i64,
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            db_path: std::env::var("COMMERCE_DB_PATH").unwrap_or_else(|_| "commerce.db".into()),
            log_level: std::env::var("COMMERCE_LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("COMMERCE_LOG_DIR").ok(),
            return_window_days: env_parse("RETURN_WINDOW_DAYS", 7),
            shipping_clawback_ratio: env_parse("SHIPPING_CLAWBACK_RATIO", 0.5),
            restocking_fee_ratio: env_parse("RESTOCKING_FEE_RATIO", 0.05),
            full_return_threshold: env_parse("FULL_RETURN_THRESHOLD", 0.95),
            sweep_interval_secs: env_parse("SWEEP_INTERVAL_SECS", 300),
            sweep_max_age_minutes: env_parse("SWEEP_MAX_AGE_MINUTES", 30),
        }
    }

    /// Refund ratios as decimals; an unparseable ratio falls back to the
    /// stock policy value.
    pub fn refund_policy(&self) -> RefundPolicy {
        let stock = RefundPolicy::default();
        RefundPolicy {
            shipping_clawback_ratio: Decimal::from_f64(self.shipping_clawback_ratio)
                .unwrap_or(stock.shipping_clawback_ratio),
            restocking_fee_ratio: Decimal::from_f64(self.restocking_fee_ratio)
                .unwrap_or(stock.restocking_fee_ratio),
            full_return_threshold: Decimal::from_f64(self.full_return_threshold)
                .unwrap_or(stock.full_return_threshold),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stock_policy() {
        let config = Config::from_env();
        let policy = config.refund_policy();
        assert_eq!(policy.restocking_fee_ratio, Decimal::new(5, 2));
        assert_eq!(config.return_window_days, 7);
    }
}
