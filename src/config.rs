use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::parse::SiteProfile;
use crate::trigger::{DEFAULT_PREFETCH_THRESHOLD_PERCENT, DEFAULT_THROTTLE_MS};
use crate::window::DEFAULT_WINDOW_CAPACITY;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub window_capacity: usize,
    pub prefetch_threshold_percent: f64,
    pub throttle_ms: u64,
    pub user_agent: String,
    /// Unset means requests may hang forever, which also blocks prefetching.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
    pub site: SiteProfile,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            prefetch_threshold_percent: DEFAULT_PREFETCH_THRESHOLD_PERCENT,
            throttle_ms: DEFAULT_THROTTLE_MS,
            user_agent: "endless-reader/0.1".to_owned(),
            request_timeout_ms: None,
            site: SiteProfile::default(),
        }
    }
}

impl ReaderConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read reader config: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("parse reader config: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.window_capacity < 2 {
            anyhow::bail!(
                "window_capacity must be at least 2 (got {})",
                self.window_capacity
            );
        }
        let threshold = self.prefetch_threshold_percent;
        if !(threshold > 0.0 && threshold <= 100.0) {
            anyhow::bail!("prefetch_threshold_percent must be in (0, 100] (got {threshold})");
        }
        if self.throttle_ms == 0 {
            anyhow::bail!("throttle_ms must be positive");
        }
        if self.user_agent.trim().is_empty() {
            anyhow::bail!("user_agent is empty");
        }
        Ok(())
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
