use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Tuning for stores opened through a [`Stores`](crate::Stores) registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How many times a write is offered to the driver before giving up.
    /// Each rejection is followed by a resync with the driver.
    pub max_send_attempts: usize,
    /// Notify listeners even when a driver model changed nothing locally.
    pub notify_on_noop: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_send_attempts: 8,
            notify_on_noop: false,
        }
    }
}

impl StoreConfig {
    /// Parse a TOML table; missing fields take their defaults.
    pub fn from_toml_str(source: &str) -> StoreResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.max_send_attempts == 0 {
            return Err(StoreError::Config(
                "max_send_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
