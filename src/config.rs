//! Configuration loading and management.
//!
//! Loads configuration from embedded config.toml with environment variable overrides.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Embedded configuration file content.
const CONFIG_TOML: &str = include_str!("../config.toml");

/// Marker left in config.toml until a real client id is filled in.
const CLIENT_ID_PLACEHOLDER: &str = "ENTER_YOUR";

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub auth: AuthConfig,
    pub api: ApiConfig,
    pub sample: SampleConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub client_id: String,
    pub authority_url: String,
    /// Resource the access token is issued for.
    pub resource: String,
    #[serde(default)]
    pub auto_open: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub version: String,
    pub sdk_version: String,
}

/// Parameters of the send-mail sample run.
#[derive(Debug, Clone, Deserialize)]
pub struct SampleConfig {
    pub template_path: PathBuf,
    /// Local file name (without extension) for the downloaded photo.
    pub photo_name: String,
    pub subject: String,
    #[serde(default)]
    pub upload_folder: String,
}

impl SampleConfig {
    /// Destination folder for the upload, `None` for the drive root.
    pub fn upload_folder(&self) -> Option<&str> {
        let folder = self.upload_folder.trim_matches('/');
        (!folder.is_empty()).then_some(folder)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    /// Load configuration from embedded config.toml with environment variable overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::from_toml(CONFIG_TOML)?;
        config.apply_env_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration document without applying overrides or validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config.toml")
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(client_id) = lookup("GRAPH_CLIENT_ID") {
            self.auth.client_id = client_id;
        }

        if let Some(authority) = lookup("GRAPH_AUTHORITY_URL") {
            self.auth.authority_url = authority;
        }

        if let Some(version) = lookup("GRAPH_API_VERSION") {
            self.api.version = version;
        }

        if let Some(auto_open) = lookup("GRAPH_AUTO_OPEN") {
            self.auth.auto_open = matches!(
                auto_open.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        if let Some(log_level) = lookup("RUST_LOG") {
            self.logging.level = log_level;
        }
    }

    /// Validate that required configuration is present.
    pub fn validate(&self) -> Result<()> {
        let client_id = self.auth.client_id.trim();
        if client_id.is_empty() || client_id.contains(CLIENT_ID_PLACEHOLDER) {
            anyhow::bail!(
                "config.toml does not contain a valid client_id. Set GRAPH_CLIENT_ID \
                 or update config.toml"
            );
        }

        if self.auth.authority_url.trim().is_empty() {
            anyhow::bail!("auth.authority_url must not be empty");
        }

        Ok(())
    }

    /// Device authorization endpoint (Azure AD v1).
    pub fn device_code_url(&self) -> String {
        format!(
            "{}/oauth2/devicecode?api-version=1.0",
            self.auth.authority_url.trim_end_matches('/')
        )
    }

    /// Token endpoint (Azure AD v1).
    pub fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.auth.authority_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        let mut config = Config::from_toml(CONFIG_TOML).unwrap();
        config.auth.client_id = "11111111-2222-3333-4444-555555555555".into();
        config
    }

    #[test]
    fn test_config_parsing() {
        // The embedded file still carries the placeholder client id, so only
        // parsing is checked here.
        let result = Config::from_toml(CONFIG_TOML);
        assert!(result.is_ok(), "Config parsing failed: {:?}", result.err());
    }

    #[test]
    fn test_placeholder_client_id_rejected() {
        let config = Config::from_toml(CONFIG_TOML).unwrap();
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.auth.client_id = "  ".into();
        assert!(config.validate().is_err());

        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::from_toml(CONFIG_TOML).unwrap();
        config.apply_env_overrides(|key| match key {
            "GRAPH_CLIENT_ID" => Some("client-from-env".into()),
            "GRAPH_API_VERSION" => Some("v1.0".into()),
            "GRAPH_AUTO_OPEN" => Some("true".into()),
            _ => None,
        });

        assert_eq!(config.auth.client_id, "client-from-env");
        assert_eq!(config.api.version, "v1.0");
        assert!(config.auth.auto_open);
        assert_eq!(config.auth.authority_url, "https://login.microsoftonline.com/common");
    }

    #[test]
    fn test_urls() {
        let mut config = test_config();
        config.auth.authority_url = "https://login.microsoftonline.com/contoso/".into();

        assert_eq!(
            config.device_code_url(),
            "https://login.microsoftonline.com/contoso/oauth2/devicecode?api-version=1.0"
        );
        assert_eq!(
            config.token_url(),
            "https://login.microsoftonline.com/contoso/oauth2/token"
        );
    }

    #[test]
    fn test_upload_folder() {
        let mut config = test_config();
        assert_eq!(config.sample.upload_folder(), None);

        config.sample.upload_folder = "/photos/2024/".into();
        assert_eq!(config.sample.upload_folder(), Some("photos/2024"));
    }
}
