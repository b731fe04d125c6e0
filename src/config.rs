use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File name searched for by [`BridgeConfig::discover`]
pub const CONFIG_FILE: &str = ".hostbridge.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub marshal: MarshalConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarshalConfig {
    /// Struct tag whose name part becomes the host property name
    #[serde(default = "default_tag_key")]
    pub tag_key: String,

    /// Bulk copy `[]uint8` through a `Uint8Array` in both directions
    #[serde(default = "default_true")]
    pub byte_fast_path: bool,
}

impl Default for MarshalConfig {
    fn default() -> Self {
        Self {
            tag_key: default_tag_key(),
            byte_fast_path: true,
        }
    }
}

fn default_true() -> bool { true }
fn default_tag_key() -> String { "json".to_string() }

impl BridgeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Find and load `.hostbridge.toml` from the current directory or its
    /// parents, falling back to defaults
    pub fn discover() -> Self {
        let mut current = std::env::current_dir().ok();

        while let Some(dir) = current {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                match Self::load(&config_path) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!(
                        event = "config_invalid",
                        path = %config_path.display(),
                        error = %e,
                        "Ignoring invalid bridge config"
                    ),
                }
            }
            current = dir.parent().map(|p| p.to_path_buf());
        }

        Self::default()
    }

    /// Defaults overridden by `HOSTBRIDGE_TAG_KEY` and `HOSTBRIDGE_BYTE_FAST_PATH`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(tag_key) = std::env::var("HOSTBRIDGE_TAG_KEY") {
            if !tag_key.is_empty() {
                config.marshal.tag_key = tag_key;
            }
        }

        if let Ok(val) = std::env::var("HOSTBRIDGE_BYTE_FAST_PATH") {
            config.marshal.byte_fast_path = parse_flag(&val);
        }

        config
    }

    /// Generate default configuration file content
    pub fn generate_default() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate config"))
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;

        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn parse_flag(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.marshal.tag_key, "json");
        assert!(config.marshal.byte_fast_path);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[marshal]
tag_key = "host"
byte_fast_path = false
"#;

        let config = BridgeConfig::parse(toml).unwrap();
        assert_eq!(config.marshal.tag_key, "host");
        assert!(!config.marshal.byte_fast_path);
    }

    #[test]
    fn test_parse_partial_config_keeps_defaults() {
        let config = BridgeConfig::parse("[marshal]\nbyte_fast_path = false\n").unwrap();
        assert_eq!(config.marshal.tag_key, "json");
        assert!(!config.marshal.byte_fast_path);

        assert_eq!(BridgeConfig::parse("").unwrap(), BridgeConfig::default());
    }

    #[test]
    fn test_parse_invalid_config() {
        let err = BridgeConfig::parse("[marshal]\nbyte_fast_path = \"sometimes\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_generate_default_parses_back() {
        let generated = BridgeConfig::generate_default();
        assert!(generated.contains("tag_key"));
        assert_eq!(BridgeConfig::parse(&generated).unwrap(), BridgeConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let mut config = BridgeConfig::default();
        config.marshal.tag_key = "yaml".to_string();
        config.save(&path).unwrap();

        assert_eq!(BridgeConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = BridgeConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("off"));
    }
}
