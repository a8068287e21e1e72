//! Framework configuration

use crate::error::ConfigError;
use buffer_pool::BufferPoolConfig;
use hal::Timeout;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Largest receiver table a one-byte id can address
pub const MAX_RECEIVERS_LIMIT: usize = 256;

/// Framework configuration
///
/// Every field has a default, so a JSON document only lists overrides:
///
/// ```
/// use framework::FrameworkConfig;
///
/// let config = FrameworkConfig::from_json(r#"{"max_receivers": 8, "pool": {"size": 2048}}"#).unwrap();
/// assert_eq!(config.max_receivers, 8);
/// assert_eq!(config.pool.size, 2048);
/// assert!(config.assert_enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Size of the receiver table; valid ids are below this
    pub max_receivers: usize,
    /// Forward failed assertions to the platform handler
    pub assert_enabled: bool,
    /// Permit broadcast from interrupt context
    pub allow_broadcast_from_isr: bool,
    /// Buffer pool sizing
    pub pool: BufferPoolConfig,
    /// Receive timeout in milliseconds for receivers that set none;
    /// `None` waits forever
    pub default_rx_block: Option<u64>,
}

impl FrameworkConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self {
            max_receivers: 16,
            assert_enabled: true,
            allow_broadcast_from_isr: false,
            pool: BufferPoolConfig::default(),
            default_rx_block: None,
        }
    }

    /// Parses and validates a JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Checks limits that the type system does not
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_receivers < 2 || self.max_receivers > MAX_RECEIVERS_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_receivers must be between 2 and {}, got {}",
                MAX_RECEIVERS_LIMIT, self.max_receivers
            )));
        }
        if self.pool.size == 0 {
            return Err(ConfigError::Invalid("pool.size must be non-zero".into()));
        }
        Ok(())
    }

    /// The default receive timeout as a [`Timeout`]
    pub fn default_rx_block(&self) -> Timeout {
        match self.default_rx_block {
            None => Timeout::Forever,
            Some(0) => Timeout::NoWait,
            Some(ms) => Timeout::After(Duration::from_millis(ms)),
        }
    }

    pub fn with_max_receivers(mut self, max_receivers: usize) -> Self {
        self.max_receivers = max_receivers;
        self
    }

    pub fn with_assert_enabled(mut self, enabled: bool) -> Self {
        self.assert_enabled = enabled;
        self
    }

    pub fn with_broadcast_from_isr(mut self, allowed: bool) -> Self {
        self.allow_broadcast_from_isr = allowed;
        self
    }

    pub fn with_pool(mut self, pool: BufferPoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Sets the default receive timeout in milliseconds (`None` = forever)
    pub fn with_default_rx_block(mut self, ms: Option<u64>) -> Self {
        self.default_rx_block = ms;
        self
    }
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self::new()
    }
}
