//! Cache configuration
//!
//! Loaded from a TOML file; every key is optional.
//!
//! ```toml
//! ttl_secs = 600
//! # or, for finer control
//! ttl_ms = 1500
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

/// Idle time before an unused module entry drops itself (30 minutes).
pub const DEFAULT_TTL_SECS: u64 = 30 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a module entry survives without a lookup
    pub ttl_secs: u64,
    /// Same in milliseconds; wins over `ttl_secs` when set
    pub ttl_ms: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
            ttl_ms: None,
        }
    }
}

impl CacheConfig {
    /// Config with the given TTL, kept to millisecond precision.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl_secs: ttl.as_secs(),
            ttl_ms: Some(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)),
        }
    }

    pub fn ttl(&self) -> Duration {
        match self.ttl_ms {
            Some(ms) => Duration::from_millis(ms),
            None => Duration::from_secs(self.ttl_secs),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reads the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
