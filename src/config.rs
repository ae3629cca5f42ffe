//! Configuration management for datakit
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (datakit.toml)
//! - Environment variables (DATAKIT__*)
//!
//! ## Example config file (datakit.toml):
//! ```toml
//! [registry]
//! consistent = false
//! cache = true
//!
//! [schema]
//! html = "strip"
//!
//! [schema.password]
//! min_length = 12
//! special = 2
//!
//! [output]
//! format = "compact"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{HtmlMode, PasswordPolicy};

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KitConfig {
    /// Registry settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Defaults for schemas built from definitions
    #[serde(default)]
    pub schema: SchemaConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Reject every mutation
    #[serde(default)]
    pub consistent: bool,

    /// Memoize path lookups
    #[serde(default = "default_true")]
    pub cache: bool,
}

/// Schema defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// HTML handling for strings that don't choose one
    #[serde(default)]
    pub html: HtmlMode,

    /// Policy behind `strongPassword`
    #[serde(default)]
    pub password: PasswordPolicy,
}

/// Output configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

impl OutputFormat {
    pub fn render(&self, value: &Value) -> serde_json::Result<String> {
        match self {
            OutputFormat::Pretty => serde_json::to_string_pretty(value),
            OutputFormat::Compact => serde_json::to_string(value),
        }
    }
}

fn default_true() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            consistent: false,
            cache: true,
        }
    }
}

impl KitConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["datakit.toml", ".datakit.toml", "config/datakit.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "datakit", "datakit") {
            let xdg_config = config_dir.config_dir().join("datakit.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (DATAKIT__REGISTRY__CONSISTENT=true)
        builder = builder.add_source(
            Environment::with_prefix("DATAKIT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = KitConfig::default();
        assert!(!config.registry.consistent);
        assert!(config.registry.cache);
        assert_eq!(config.schema.html, HtmlMode::Raw);
        assert_eq!(config.schema.password.min_length, 8);
    }

    #[test]
    fn test_serialize_config() {
        let config = KitConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[registry]"));
        assert!(toml_str.contains("[output]"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[registry]\nconsistent = true\n\n[schema]\nhtml = \"sanitize\"\n\n[schema.password]\nmin_length = 12\n\n[output]\nformat = \"compact\"\n",
        )
        .unwrap();

        let config = KitConfig::load_from(path.to_str()).unwrap();
        assert!(config.registry.consistent);
        assert!(config.registry.cache);
        assert_eq!(config.schema.html, HtmlMode::Sanitize);
        assert_eq!(config.schema.password.min_length, 12);
        assert_eq!(config.schema.password.uppercase, 1);
        assert_eq!(config.output.format, OutputFormat::Compact);
    }

    #[test]
    fn test_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = KitConfig::default();
        config.output.format = OutputFormat::Compact;
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = KitConfig::load_from(path.to_str()).unwrap();
        assert_eq!(loaded.output.format, OutputFormat::Compact);
    }

    #[test]
    fn test_output_render() {
        let value = json!({"a": [1, 2]});
        assert_eq!(OutputFormat::Compact.render(&value).unwrap(), r#"{"a":[1,2]}"#);
        assert!(OutputFormat::Pretty.render(&value).unwrap().contains('\n'));
    }
}
