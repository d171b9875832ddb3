use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable holding the image-generation API key unless the
/// config names a different one.
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

// ---------------------------------------------------------------------------
// DeckConfig
// ---------------------------------------------------------------------------

/// Application configuration stored at `~/.deck/config.json`.
///
/// The API key is **never** stored here. Only the name of the environment
/// variable that holds it is, and the variable is read when an image is
/// requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    // Image generation
    pub api_key_env: String,
    pub openai_base_url: String,
    pub image_model: String,
    /// Per-request HTTP timeout. `None` leaves the client default in place.
    pub request_timeout_secs: Option<u64>,

    // General
    pub log_level: String,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            api_key_env: DEFAULT_API_KEY_ENV.into(),
            openai_base_url: "https://api.openai.com/v1".into(),
            image_model: "dall-e-3".into(),
            request_timeout_secs: None,
            log_level: "info".into(),
        }
    }
}

impl DeckConfig {
    /// Returns the base config directory: `~/.deck/`
    pub fn base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".deck"))
    }

    /// Returns the config file path: `~/.deck/config.json`
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.json"))
    }

    /// Returns the logs directory: `~/.deck/logs/`
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("logs"))
    }

    /// Ensures the base and logs directories exist.
    pub fn ensure_dirs() -> Result<()> {
        for dir in [Self::base_dir()?, Self::logs_dir()?] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            }
        }
        Ok(())
    }

    /// Loads config from disk, or creates the default if missing.
    pub fn load() -> Result<Self> {
        Self::ensure_dirs()?;
        let path = Self::config_path()?;
        Self::load_from_path(&path)
    }

    /// Load config from a specific file path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Self = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to_path(path)?;
            info!("Created default config at {}", path.display());
            Ok(config)
        }
    }

    /// Save config to a specific file path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Log filter directive: `RUST_LOG` wins, this is the fallback.
    pub fn log_filter(&self) -> String {
        format!(
            "{level},deck_app={level},deck_ai={level},deck_docs={level},deck_core={level}",
            level = self.log_level
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DeckConfig::default();
        assert_eq!(config.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.image_model, "dall-e-3");
        assert!(config.request_timeout_secs.is_none());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_load_creates_default_when_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");

        let config = DeckConfig::load_from_path(&path).unwrap();
        assert_eq!(config, DeckConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"image_model": "dall-e-2", "request_timeout_secs": 30}"#).unwrap();

        let config = DeckConfig::load_from_path(&path).unwrap();
        assert_eq!(config.image_model, "dall-e-2");
        assert_eq!(config.request_timeout_secs, Some(30));
        assert_eq!(config.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_save_and_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        let config = DeckConfig {
            api_key_env: "DECK_IMAGE_KEY".into(),
            log_level: "debug".into(),
            ..Default::default()
        };
        config.save_to_path(&path).unwrap();

        let loaded = DeckConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(DeckConfig::load_from_path(&path).is_err());
    }

    #[test]
    fn test_log_filter_uses_level() {
        let config = DeckConfig {
            log_level: "warn".into(),
            ..Default::default()
        };
        let filter = config.log_filter();
        assert!(filter.starts_with("warn,"));
        assert!(filter.contains("deck_ai=warn"));
        assert!(filter.contains("deck_app=warn"));
        assert!(!filter.contains("debug"));
    }
}
