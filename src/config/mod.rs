//! Configuration management for spotop

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Spot console access token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Spot console account ID (sent as a query parameter when present)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    /// User preferences
    #[serde(default)]
    pub preferences: Preferences,
}

/// User preferences
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    /// Default output format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Default region when --region is not given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".spotop").join("config.yaml"))
    }

    /// Resolve a custom path override to a config file path
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Self::default_path(),
        }
    }

    /// Load configuration from an optional custom path
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        let path = Self::resolve_path(path)?;
        if !path.exists() {
            return Err(ConfigError::NotFound.into());
        }

        let contents = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Load configuration, falling back to defaults when no file exists.
    ///
    /// Commands that work unauthenticated (plain `spotop advice`) use this so
    /// a missing config file is not an error.
    pub fn load_or_default(path: Option<&str>) -> Self {
        Self::load_at(path).unwrap_or_default()
    }

    /// Save configuration to an optional custom path
    pub fn save_at(&self, path: Option<&str>) -> Result<()> {
        let path = Self::resolve_path(path)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(&path, contents)?;

        // Token lives in this file, keep it private
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// Access token with the `SPOTOP_TOKEN` environment override applied
    pub fn resolved_token(&self) -> Option<String> {
        std::env::var("SPOTOP_TOKEN").ok().or_else(|| self.token.clone())
    }

    /// Account ID with the `SPOTOP_ACCOUNT_ID` environment override applied
    pub fn resolved_account_id(&self) -> Option<String> {
        std::env::var("SPOTOP_ACCOUNT_ID")
            .ok()
            .or_else(|| self.account_id.clone())
    }
}
