//! Configuration for training runs.
//!
//! # Example
//!
//! ```
//! use modelpick_engine::TrainingConfig;
//!
//! let config = TrainingConfig::builder()
//!     .test_size(0.25)
//!     .random_state(7)
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.test_size, 0.25);
//! ```

use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// Default held-out fraction.
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

/// Default seed for the split and for seedable models.
pub const DEFAULT_RANDOM_STATE: i64 = 42;

/// Configuration accepted by the training pipeline.
///
/// Deserialisation fills missing keys with defaults and ignores unknown keys,
/// so a caller can pass a loosely-typed JSON object straight through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fraction of rows held out for testing, in `(0, 1)`.
    pub test_size: f64,

    /// Seed for the shuffle and for models that accept one. Negative
    /// values are accepted and reinterpreted bitwise by [`Self::seed`].
    pub random_state: i64,

    /// Per-model fit budget in seconds. A fit that overruns it is recorded
    /// as a per-model error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fit_seconds: Option<f64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: DEFAULT_TEST_SIZE,
            random_state: DEFAULT_RANDOM_STATE,
            max_fit_seconds: None,
        }
    }
}

impl TrainingConfig {
    /// `random_state` as the generator seed.
    pub fn seed(&self) -> u64 {
        self.random_state as u64
    }

    /// Create a new builder for `TrainingConfig`.
    #[must_use]
    pub fn builder() -> TrainingConfigBuilder {
        TrainingConfigBuilder::default()
    }

    /// Check the invariants enforced by the builder.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] when `test_size` is outside
    /// `(0.0, 1.0)` or `max_fit_seconds` is not positive.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(EngineError::InvalidConfig(
                "test_size must be between 0.0 and 1.0 (exclusive)".to_string(),
            ));
        }
        if let Some(limit) = self.max_fit_seconds
            && !(limit > 0.0)
        {
            return Err(EngineError::InvalidConfig(
                "max_fit_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`TrainingConfig`].
#[derive(Debug, Clone, Default)]
pub struct TrainingConfigBuilder {
    config: TrainingConfig,
}

impl TrainingConfigBuilder {
    /// Set the test size fraction (default: 0.2).
    #[must_use]
    pub fn test_size(mut self, size: f64) -> Self {
        self.config.test_size = size;
        self
    }

    /// Set the random seed (default: 42).
    #[must_use]
    pub fn random_state(mut self, seed: i64) -> Self {
        self.config.random_state = seed;
        self
    }

    /// Set a per-model fit budget in seconds.
    #[must_use]
    pub fn max_fit_seconds(mut self, seconds: f64) -> Self {
        self.config.max_fit_seconds = Some(seconds);
        self
    }

    /// Build the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if a setting is out of range.
    pub fn build(self) -> Result<TrainingConfig, EngineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
