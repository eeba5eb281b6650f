//! CLI configuration.

use anyhow::{Context, Result};
use edge_core::RewriteOptions;
use serde::{Deserialize, Serialize};

/// CLI configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Rewrite options applied to simulated requests.
    #[serde(default)]
    pub options: RewriteOptions,
}

impl CliConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        Self::parse(path, &content)
    }

    fn parse(path: &str, content: &str) -> Result<Self> {
        let config: Self = if path.ends_with(".json") {
            serde_json::from_str(content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))?
        } else {
            toml::from_str(content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))?
        };

        config
            .options
            .validate()
            .with_context(|| format!("Invalid options in {}", path))?;
        Ok(config)
    }
}

/// Generate a default edge.toml config file.
pub fn generate_default_config() -> String {
    let defaults = RewriteOptions::default();
    format!(
        r#"# Edge critical images configuration

[options]
finder_properties_cache_expiration_time_ms = {ttl}
finder_properties_cache_refresh_time_ms = {refresh}
critical_images_cohort = "{cohort}"
"#,
        ttl = defaults.finder_properties_cache_expiration_time_ms,
        refresh = defaults.finder_properties_cache_refresh_time_ms,
        cohort = defaults.critical_images_cohort,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = CliConfig::parse("edge.toml", &generate_default_config()).unwrap();
        assert_eq!(config.options, RewriteOptions::default());
    }

    #[test]
    fn test_missing_options_table_uses_defaults() {
        let config = CliConfig::parse("edge.toml", "").unwrap();
        assert_eq!(config.options, RewriteOptions::default());
    }

    #[test]
    fn test_json_config() {
        let config = CliConfig::parse(
            "edge.json",
            r#"{"options": {"finder_properties_cache_expiration_time_ms": 5}}"#,
        )
        .unwrap();
        assert_eq!(config.options.finder_properties_cache_expiration_time_ms, 5);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let result = CliConfig::parse(
            "edge.toml",
            "[options]\nfinder_properties_cache_expiration_time_ms = -1\n",
        );
        assert!(result.is_err());
    }
}
