use crate::error::{AggregatorError, Result};
use payment_allocator::{AllocatorConfig, DEFAULT_CURRENCY_SCALE};

const MAX_CURRENCY_SCALE: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // Decimal places of the smallest currency unit payouts are rounded to
    pub currency_scale: u32,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            currency_scale: DEFAULT_CURRENCY_SCALE,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();

        let currency_scale = match lookup("AGGREGATOR_CURRENCY_SCALE") {
            Some(raw) => {
                let scale: u32 = raw.trim().parse().map_err(|_| {
                    AggregatorError::Config(format!(
                        "AGGREGATOR_CURRENCY_SCALE must be a whole number, got {raw:?}"
                    ))
                })?;
                if scale > MAX_CURRENCY_SCALE {
                    return Err(AggregatorError::Config(format!(
                        "AGGREGATOR_CURRENCY_SCALE must be at most {MAX_CURRENCY_SCALE}, got {scale}"
                    )));
                }
                scale
            }
            None => defaults.currency_scale,
        };

        let log_level = lookup("AGGREGATOR_LOG_LEVEL")
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.log_level);

        Ok(Config {
            currency_scale,
            log_level,
        })
    }

    pub fn allocator(&self) -> AllocatorConfig {
        AllocatorConfig {
            currency_scale: self.currency_scale,
        }
    }
}
