use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Per-badge settings, read once at activation. Matches the attribute set a
/// host settings surface supplies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BadgeConfig {
    pub use_dark_mode: bool,
    pub use_custom_url: bool,
    /// Percent-encoded; may be empty, in which case the current location is
    /// measured even when `use_custom_url` is set.
    pub custom_url_to_check: String,
    pub show_link_to_web_carbon: bool,
}

/// On-disk configuration for the binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub badge: BadgeConfig,
    /// Override for the measurement API base, mainly for self-hosted proxies.
    pub api_base: Option<String>,
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("carbonbadge").join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Load from the given path, or the default location. A missing file is
    /// not an error; a present-but-broken one is.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load(&path),
                _ => Ok(Self::default()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_config_defaults() {
        let config = BadgeConfig::default();
        assert!(!config.use_dark_mode);
        assert!(!config.use_custom_url);
        assert!(config.custom_url_to_check.is_empty());
        assert!(!config.show_link_to_web_carbon);
    }

    #[test]
    fn test_app_config_parses_partial_toml() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [badge]
            use_dark_mode = true
            custom_url_to_check = "https%3A%2F%2Fexample.com"
            "#,
        )
        .unwrap();
        assert!(parsed.badge.use_dark_mode);
        assert!(!parsed.badge.use_custom_url);
        assert_eq!(parsed.badge.custom_url_to_check, "https%3A%2F%2Fexample.com");
        assert!(parsed.api_base.is_none());
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppConfig::load(&dir.path().join("nope.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_with_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_base = \"http://localhost:9900\"").unwrap();
        let config = AppConfig::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.api_base.as_deref(), Some("http://localhost:9900"));
    }
}
