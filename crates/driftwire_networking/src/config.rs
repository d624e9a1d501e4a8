//! # Fragment Configuration
//!
//! Runtime knobs for the fragment queue, loadable from TOML:
//!
//! ```toml
//! unreliable_timeout_ms = 500
//! max_reassembled_size = 16384
//! ```
//!
//! The dedup window capacity is a compile-time constant and is not
//! configurable here.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use driftwire_shared::{
    CHUNK_BUFFER_CAPACITY, MAX_FRAGMENT_COUNT, MAX_REASSEMBLED_SIZE,
    UNRELIABLE_FRAGMENT_TIMEOUT_MS,
};

use crate::error::ConfigError;

/// Fragment queue configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FragmentConfig {
    /// How long an incomplete unreliable group is kept, in milliseconds.
    pub unreliable_timeout_ms: u64,
    /// Largest payload a reassembled packet may have, in bytes.
    pub max_reassembled_size: usize,
}

impl FragmentConfig {
    /// Parses and validates a TOML document. Missing fields take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.unreliable_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "unreliable_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        let wire_limit = MAX_FRAGMENT_COUNT * CHUNK_BUFFER_CAPACITY;
        if self.max_reassembled_size == 0 || self.max_reassembled_size > wire_limit {
            return Err(ConfigError::InvalidValue {
                field: "max_reassembled_size",
                reason: format!("must be in 1..={wire_limit}"),
            });
        }
        Ok(())
    }

    /// Timeout for incomplete unreliable groups.
    #[must_use]
    pub const fn unreliable_timeout(&self) -> Duration {
        Duration::from_millis(self.unreliable_timeout_ms)
    }
}

impl Default for FragmentConfig {
    fn default() -> Self {
        Self {
            unreliable_timeout_ms: UNRELIABLE_FRAGMENT_TIMEOUT_MS,
            max_reassembled_size: MAX_REASSEMBLED_SIZE,
        }
    }
}
