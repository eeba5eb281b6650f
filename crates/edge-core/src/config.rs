//! Rewrite option values.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default TTL for properties written by the page finders (2 hours).
pub const DEFAULT_FINDER_PROPERTIES_CACHE_EXPIRATION_TIME_MS: i64 = 2 * 60 * 60 * 1000;

/// Default refresh interval for finder properties (1 hour).
pub const DEFAULT_FINDER_PROPERTIES_CACHE_REFRESH_TIME_MS: i64 = 60 * 60 * 1000;

/// Default cohort holding DOM-derived page properties.
pub const DEFAULT_CRITICAL_IMAGES_COHORT: &str = "dom";

/// Error type for loading rewrite options.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read options file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse options: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid option '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Options consulted while rewriting a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteOptions {
    /// Maximum age of a finder property before it is ignored.
    pub finder_properties_cache_expiration_time_ms: i64,
    /// Age after which finder properties should be recomputed.
    pub finder_properties_cache_refresh_time_ms: i64,
    /// Cohort in which critical image properties live.
    pub critical_images_cohort: String,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            finder_properties_cache_expiration_time_ms:
                DEFAULT_FINDER_PROPERTIES_CACHE_EXPIRATION_TIME_MS,
            finder_properties_cache_refresh_time_ms: DEFAULT_FINDER_PROPERTIES_CACHE_REFRESH_TIME_MS,
            critical_images_cohort: DEFAULT_CRITICAL_IMAGES_COHORT.to_string(),
        }
    }
}

impl RewriteOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the finder property TTL.
    pub fn with_finder_properties_cache_expiration_time_ms(mut self, ttl_ms: i64) -> Self {
        self.finder_properties_cache_expiration_time_ms = ttl_ms;
        self
    }

    /// Set the critical images cohort name.
    pub fn with_critical_images_cohort(mut self, cohort: impl Into<String>) -> Self {
        self.critical_images_cohort = cohort.into();
        self
    }

    /// TTL applied when reading finder properties.
    pub fn finder_properties_cache_expiration_time_ms(&self) -> i64 {
        self.finder_properties_cache_expiration_time_ms
    }

    /// Parse options from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let options: Self = toml::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Check option invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.finder_properties_cache_expiration_time_ms < 0 {
            return Err(ConfigError::Invalid {
                field: "finder_properties_cache_expiration_time_ms",
                reason: "must not be negative".to_string(),
            });
        }
        if self.finder_properties_cache_refresh_time_ms < 0 {
            return Err(ConfigError::Invalid {
                field: "finder_properties_cache_refresh_time_ms",
                reason: "must not be negative".to_string(),
            });
        }
        if self.critical_images_cohort.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "critical_images_cohort",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RewriteOptions::default();
        assert_eq!(options.finder_properties_cache_expiration_time_ms(), 7_200_000);
        assert_eq!(options.finder_properties_cache_refresh_time_ms, 3_600_000);
        assert_eq!(options.critical_images_cohort, "dom");
    }

    #[test]
    fn test_from_toml_partial() {
        let options =
            RewriteOptions::from_toml_str("finder_properties_cache_expiration_time_ms = 1000\n")
                .unwrap();
        assert_eq!(options.finder_properties_cache_expiration_time_ms, 1000);
        assert_eq!(options.critical_images_cohort, "dom");
    }

    #[test]
    fn test_from_toml_rejects_negative_ttl() {
        let err = RewriteOptions::from_toml_str("finder_properties_cache_expiration_time_ms = -5\n")
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "finder_properties_cache_expiration_time_ms",
                ..
            }
        ));
    }

    #[test]
    fn test_from_toml_rejects_empty_cohort() {
        let err = RewriteOptions::from_toml_str("critical_images_cohort = \"  \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_from_toml_syntax_error() {
        let err = RewriteOptions::from_toml_str("finder_properties_cache_expiration_time_ms = ")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_builder_methods() {
        let options = RewriteOptions::new()
            .with_finder_properties_cache_expiration_time_ms(42)
            .with_critical_images_cohort("beacon_cohort");
        assert_eq!(options.finder_properties_cache_expiration_time_ms(), 42);
        assert_eq!(options.critical_images_cohort, "beacon_cohort");
    }

    #[test]
    fn test_serialization_roundtrip() {
        let options = RewriteOptions::default();
        let json = serde_json::to_string(&options).unwrap();
        let parsed: RewriteOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, options);
    }
}
