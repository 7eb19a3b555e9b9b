//! Configuration types

use crate::{ConfigError, FieldPolicy};
use serde::{Deserialize, Serialize};

/// Order in which the parts of an emitted code are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentOrder {
    #[default]
    PrefixNumberSuffix,
    NumberPrefixSuffix,
}

/// How prefix, number and suffix are concatenated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CompositionConfig {
    /// Inserted between non-empty parts. Empty by default: templates encode
    /// their own separators.
    pub separator: String,
    pub order: ComponentOrder,
}

impl CompositionConfig {
    /// Join the parts of a code.
    pub fn compose(&self, prefix: &str, number: &str, suffix: &str) -> String {
        let parts = match self.order {
            ComponentOrder::PrefixNumberSuffix => [prefix, number, suffix],
            ComponentOrder::NumberPrefixSuffix => [number, prefix, suffix],
        };
        parts
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(&self.separator)
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumeraConfig {
    /// Lookup retries after losing a provisioning race
    pub provisioning_retry_limit: u32,
    /// Maximum number of fallback hops for one request
    pub max_fallback_depth: u32,
    /// Field categories a prefix template may reference
    pub prefix_field_policy: FieldPolicy,
    pub composition: CompositionConfig,
}

impl Default for NumeraConfig {
    fn default() -> Self {
        Self {
            provisioning_retry_limit: 3,
            max_fallback_depth: 8,
            prefix_field_policy: FieldPolicy::Scalar,
            composition: CompositionConfig::default(),
        }
    }
}

impl NumeraConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: NumeraConfig = toml::from_str(source).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - provisioning_retry_limit > 0
    /// - max_fallback_depth > 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provisioning_retry_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "provisioning_retry_limit".to_string(),
                value: self.provisioning_retry_limit.to_string(),
                reason: "at least one provisioning attempt is required".to_string(),
            });
        }

        if self.max_fallback_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_fallback_depth".to_string(),
                value: self.max_fallback_depth.to_string(),
                reason: "max_fallback_depth must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
