use crate::error::{ErrorContext, UploaderError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PRIMARY_BASE_URL: &str = "https://api.heroesprofile.com/api";
pub const DEFAULT_SECONDARY_BASE_URL: &str = "https://hotsapi.net/api/v1";

pub const ENV_PRIMARY_URL: &str = "REPLAY_UPLOADER_PRIMARY_URL";
pub const ENV_SECONDARY_URL: &str = "REPLAY_UPLOADER_SECONDARY_URL";
pub const ENV_FORWARD_TO_MIRROR: &str = "REPLAY_UPLOADER_FORWARD_TO_MIRROR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploaderConfig {
    #[serde(rename = "primaryBaseUrl", default = "default_primary_base_url")]
    pub primary_base_url: String,
    #[serde(rename = "secondaryBaseUrl", default = "default_secondary_base_url")]
    pub secondary_base_url: String,
    /// Ask the secondary service to forward the replay on to its own mirror
    #[serde(rename = "forwardToSecondaryMirror", default)]
    pub forward_to_secondary_mirror: bool,
}

fn default_primary_base_url() -> String {
    DEFAULT_PRIMARY_BASE_URL.to_string()
}

fn default_secondary_base_url() -> String {
    DEFAULT_SECONDARY_BASE_URL.to_string()
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            primary_base_url: default_primary_base_url(),
            secondary_base_url: default_secondary_base_url(),
            forward_to_secondary_mirror: false,
        }
    }
}

impl UploaderConfig {
    pub fn new(primary_base_url: &str, secondary_base_url: &str) -> Self {
        Self {
            primary_base_url: primary_base_url.to_string(),
            secondary_base_url: secondary_base_url.to_string(),
            forward_to_secondary_mirror: false,
        }
    }

    pub fn with_forwarding(mut self, forward: bool) -> Self {
        self.forward_to_secondary_mirror = forward;
        self
    }

    /// Primary base URL without a trailing slash
    pub fn primary_base(&self) -> &str {
        self.primary_base_url.trim_end_matches('/')
    }

    /// Secondary base URL without a trailing slash
    pub fn secondary_base(&self) -> &str {
        self.secondary_base_url.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<(), UploaderError> {
        for (name, value) in [
            ("primaryBaseUrl", self.primary_base()),
            ("secondaryBaseUrl", self.secondary_base()),
        ] {
            let parsed = url::Url::parse(value)
                .map_err(|e| UploaderError::Config(format!("Invalid {} '{}': {}", name, value, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(UploaderError::Config(format!(
                    "Invalid {} '{}': expected http or https",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_PRIMARY_URL).filter(|v| !v.trim().is_empty()) {
            self.primary_base_url = url.trim().to_string();
        }
        if let Some(url) = lookup(ENV_SECONDARY_URL).filter(|v| !v.trim().is_empty()) {
            self.secondary_base_url = url.trim().to_string();
        }
        if let Some(flag) = lookup(ENV_FORWARD_TO_MIRROR) {
            match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.forward_to_secondary_mirror = true,
                "0" | "false" | "no" | "off" => self.forward_to_secondary_mirror = false,
                _ => {}
            }
        }
        self
    }

    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }
}

pub fn get_config_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(home_dir) = dirs::home_dir() {
        Ok(home_dir.join(".replay-uploader"))
    } else {
        Err("Could not find home directory".into())
    }
}

pub fn get_config_file_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    Ok(get_config_dir()?.join("config.json"))
}

pub fn get_logs_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    Ok(get_config_dir()?.join("logs"))
}

fn ensure_private_dir(dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;

        // Set permissions to 700 (read/write/execute for owner only) on Unix systems
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = fs::metadata(dir)?;
            let mut permissions = metadata.permissions();
            permissions.set_mode(0o700);
            fs::set_permissions(dir, permissions)?;
        }
    }
    Ok(())
}

pub fn ensure_config_dir() -> Result<(), Box<dyn std::error::Error>> {
    ensure_private_dir(&get_config_dir()?)
}

pub fn ensure_logs_dir() -> Result<(), Box<dyn std::error::Error>> {
    ensure_private_dir(&get_logs_dir()?)
}

/// Load the stored configuration with environment overrides applied
pub fn load_config() -> Result<UploaderConfig, UploaderError> {
    ensure_config_dir().context("Failed to create config directory")?;
    let config_file = get_config_file_path().context("Failed to locate config file")?;
    Ok(load_config_from(&config_file)?.apply_env_overrides())
}

/// Load configuration from a specific file, falling back to defaults when it does not exist
pub fn load_config_from(config_file: &Path) -> Result<UploaderConfig, UploaderError> {
    if !config_file.exists() {
        return Ok(UploaderConfig::default());
    }

    let content = fs::read_to_string(config_file)
        .context(&format!("Failed to read {}", config_file.display()))?;
    let config: UploaderConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

pub fn save_config(config: &UploaderConfig) -> Result<(), UploaderError> {
    ensure_config_dir().context("Failed to create config directory")?;
    let config_file = get_config_file_path().context("Failed to locate config file")?;
    save_config_to(config, &config_file)
}

pub fn save_config_to(config: &UploaderConfig, config_file: &Path) -> Result<(), UploaderError> {
    config.validate()?;
    let content = serde_json::to_string_pretty(config)?;

    fs::write(config_file, content)?;

    // Set permissions to 600 (read/write for owner only) on Unix systems
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = fs::metadata(config_file)?;
        let mut permissions = metadata.permissions();
        permissions.set_mode(0o600);
        fs::set_permissions(config_file, permissions)?;
    }

    Ok(())
}
