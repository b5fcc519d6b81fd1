use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub output: OutputConfig,

    #[serde(skip)]
    pub config_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub key: Option<String>,
    /// Image model identifier; there is deliberately no fallback
    #[serde(default)]
    pub image_model: Option<String>,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub app_key: Option<String>,
    #[serde(default)]
    pub app_secret: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_staging_dir")]
    pub staging_dir: String,
    #[serde(default = "default_logs_dir")]
    pub logs_dir: String,
    #[serde(default = "default_alerts_dir")]
    pub alerts_dir: String,
}

/// Dropbox credentials, present only when all three are set
#[derive(Debug, Clone)]
pub struct StorageCredentials {
    pub app_key: String,
    pub app_secret: String,
    pub refresh_token: String,
}

// Default value functions
fn default_text_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_static_dir() -> String {
    "frontend".to_string()
}

fn default_staging_dir() -> String {
    "temp_outputs".to_string()
}

fn default_logs_dir() -> String {
    "logs".to_string()
}

fn default_alerts_dir() -> String {
    "alerts".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: None,
            image_model: None,
            text_model: default_text_model(),
            base_url: default_base_url(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            staging_dir: default_staging_dir(),
            logs_dir: default_logs_dir(),
            alerts_dir: default_alerts_dir(),
        }
    }
}

impl Config {
    /// Get the config file path (`CREATIVE_FORGE_CONFIG` wins over the platform dir)
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("CREATIVE_FORGE_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        let proj_dirs = ProjectDirs::from("com", "creativeforge", "creative-forge")
            .context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Load config from file (if any), then apply environment overrides
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path()?, |name| std::env::var(name).ok())
    }

    /// Like `load`, but an unreadable file or a bad override falls back to
    /// defaults, so `forge config` can still inspect and repair the setup.
    pub fn load_lenient() -> Result<Self> {
        Ok(Self::load_lenient_from(
            Self::config_path()?,
            |name| std::env::var(name).ok(),
        ))
    }

    fn load_from(config_path: PathBuf, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::read_file(&config_path)?;
        config.config_path = config_path;
        config.apply_env(var)?;
        Ok(config)
    }

    fn load_lenient_from(config_path: PathBuf, var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::read_file(&config_path).unwrap_or_else(|e| {
            tracing::warn!("{:#}; starting from defaults", e);
            Config::default()
        });
        config.config_path = config_path;
        if let Err(e) = config.apply_env(var) {
            tracing::warn!("{:#}; override ignored", e);
        }
        config
    }

    fn read_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)
            .context("Failed to read config file")?;
        toml::from_str::<Config>(&content).context("Failed to parse config file")
    }

    /// Environment variables take precedence over the file
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(key) = var("GOOGLE_API_KEY").or_else(|| var("GEMINI_API_KEY")) {
            self.api.key = Some(key);
        }
        if let Some(model) = var("GEMINI_IMG_MODEL") {
            self.api.image_model = Some(model);
        }
        if let Some(model) = var("GEMINI_TEXT_MODEL") {
            self.api.text_model = model;
        }
        if let Some(url) = var("GEMINI_BASE_URL") {
            self.api.base_url = url;
        }
        if let Some(key) = var("DROPBOX_APP_KEY") {
            self.storage.app_key = Some(key);
        }
        if let Some(secret) = var("DROPBOX_APP_SECRET") {
            self.storage.app_secret = Some(secret);
        }
        if let Some(token) = var("DROPBOX_REFRESH_TOKEN") {
            self.storage.refresh_token = Some(token);
        }
        if let Some(addr) = var("BIND_ADDR") {
            self.server.bind_addr = addr.parse().context("Invalid BIND_ADDR")?;
        }
        Ok(())
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(&self.config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api.key.as_deref().filter(|k| !k.is_empty())
    }

    pub fn image_model(&self) -> Option<&str> {
        self.api.image_model.as_deref().filter(|m| !m.is_empty())
    }

    pub fn storage_credentials(&self) -> Option<StorageCredentials> {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        Some(StorageCredentials {
            app_key: non_empty(&self.storage.app_key)?,
            app_secret: non_empty(&self.storage.app_secret)?,
            refresh_token: non_empty(&self.storage.refresh_token)?,
        })
    }

    /// Set a config value by key path (e.g., "api.key", "output.logs_dir")
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "api.key" => self.api.key = Some(value.to_string()),
            "api.image_model" => self.api.image_model = Some(value.to_string()),
            "api.text_model" => self.api.text_model = value.to_string(),
            "api.base_url" => self.api.base_url = value.to_string(),
            "storage.app_key" => self.storage.app_key = Some(value.to_string()),
            "storage.app_secret" => self.storage.app_secret = Some(value.to_string()),
            "storage.refresh_token" => self.storage.refresh_token = Some(value.to_string()),
            "server.bind_addr" => {
                self.server.bind_addr = value.parse()
                    .context("Invalid socket address (expected e.g. 0.0.0.0:8000)")?;
            }
            "server.static_dir" => self.server.static_dir = value.to_string(),
            "output.staging_dir" => self.output.staging_dir = value.to_string(),
            "output.logs_dir" => self.output.logs_dir = value.to_string(),
            "output.alerts_dir" => self.output.alerts_dir = value.to_string(),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    /// Get a config value by key path; secrets are masked
    pub fn get(&self, key: &str) -> Option<String> {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "****".to_string());
        match key {
            "api.key" => mask(&self.api.key),
            "api.image_model" => self.api.image_model.clone(),
            "api.text_model" => Some(self.api.text_model.clone()),
            "api.base_url" => Some(self.api.base_url.clone()),
            "storage.app_key" => self.storage.app_key.clone(),
            "storage.app_secret" => mask(&self.storage.app_secret),
            "storage.refresh_token" => mask(&self.storage.refresh_token),
            "server.bind_addr" => Some(self.server.bind_addr.to_string()),
            "server.static_dir" => Some(self.server.static_dir.clone()),
            "output.staging_dir" => Some(self.output.staging_dir.clone()),
            "output.logs_dir" => Some(self.output.logs_dir.clone()),
            "output.alerts_dir" => Some(self.output.alerts_dir.clone()),
            _ => None,
        }
    }

    /// Get all config keys
    pub fn keys() -> &'static [&'static str] {
        &[
            "api.key",
            "api.image_model",
            "api.text_model",
            "api.base_url",
            "storage.app_key",
            "storage.app_secret",
            "storage.refresh_token",
            "server.bind_addr",
            "server.static_dir",
            "output.staging_dir",
            "output.logs_dir",
            "output.alerts_dir",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn broken_setup_still_loads_leniently() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[api\nkey = ").unwrap();
        let vars = [("BIND_ADDR", "not-an-address"), ("GEMINI_IMG_MODEL", "img")];

        assert!(Config::load_from(path.clone(), env(&vars)).is_err());

        let config = Config::load_lenient_from(path.clone(), env(&vars));
        assert_eq!(config.config_path, path);
        assert_eq!(config.image_model(), Some("img"));
        assert_eq!(config.server.bind_addr, ServerConfig::default().bind_addr);
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path().join("absent.toml"), env(&[])).unwrap();
        assert!(config.api_key().is_none());
    }

    #[test]
    fn defaults_leave_image_model_unset() {
        let config = Config::default();
        assert!(config.image_model().is_none());
        assert_eq!(config.api.text_model, "gemini-2.5-flash-lite");
        assert_eq!(config.output.staging_dir, "temp_outputs");
        assert!(config.storage_credentials().is_none());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config: Config = toml::from_str(
            r#"
            [api]
            key = "from-file"
            text_model = "file-text"
            "#,
        )
        .unwrap();
        config
            .apply_env(env(&[
                ("GOOGLE_API_KEY", "from-env"),
                ("GEMINI_IMG_MODEL", "gemini-2.5-flash-image"),
                ("DROPBOX_APP_KEY", "k"),
                ("DROPBOX_APP_SECRET", "s"),
                ("DROPBOX_REFRESH_TOKEN", "r"),
            ]))
            .unwrap();

        assert_eq!(config.api_key(), Some("from-env"));
        assert_eq!(config.image_model(), Some("gemini-2.5-flash-image"));
        assert_eq!(config.api.text_model, "file-text");
        let creds = config.storage_credentials().unwrap();
        assert_eq!(creds.refresh_token, "r");
    }

    #[test]
    fn partial_storage_credentials_count_as_missing() {
        let mut config = Config::default();
        config
            .apply_env(env(&[("DROPBOX_APP_KEY", "k"), ("DROPBOX_APP_SECRET", "s")]))
            .unwrap();
        assert!(config.storage_credentials().is_none());
    }

    #[test]
    fn secrets_are_masked() {
        let mut config = Config::default();
        config.set("api.key", "secret").unwrap();
        config.set("storage.refresh_token", "token").unwrap();
        assert_eq!(config.get("api.key").as_deref(), Some("****"));
        assert_eq!(config.get("storage.refresh_token").as_deref(), Some("****"));
        assert!(config.set("nope", "x").is_err());
        assert!(config.set("server.bind_addr", "not-an-addr").is_err());
    }
}
