//! TOML-backed configuration
//!
//! Every section and key is optional; missing values fall back to the
//! defaults the scrapers have always used.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::driver::DriveOptions;
use crate::error::{Result, ScrapeError};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ScrapeConfig {
    pub driver: DriverConfig,
    pub fetch: FetchConfig,
    pub hover: HoverConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DriverConfig {
    pub target: usize,
    pub reveal_threshold: usize,
    pub window: Option<usize>,
    pub reveal_delay_ms: u64,
    pub card_delay_ms: u64,
    pub max_passes: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            target: 50,
            reveal_threshold: 20,
            window: None,
            reveal_delay_ms: 2000,
            card_delay_ms: 0,
            max_passes: 500,
        }
    }
}

impl DriverConfig {
    pub fn drive_options(&self) -> DriveOptions {
        DriveOptions {
            target: self.target,
            reveal_threshold: self.reveal_threshold,
            window: self.window,
            reveal_delay: Duration::from_millis(self.reveal_delay_ms),
            card_delay: Duration::from_millis(self.card_delay_ms),
            max_passes: self.max_passes,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("feed_scraper/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HoverConfig {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 500,
        }
    }
}

impl HoverConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.attempts, Duration::from_millis(self.delay_ms))
    }
}

impl ScrapeConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScrapeError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }
}
