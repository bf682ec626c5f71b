use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// The structure of our configuration file (config.toml)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Scratch directories for downloads are created under this root.
    pub downloads_root: PathBuf,
    /// Name or path of the yt-dlp executable.
    pub ytdlp_program: PathBuf,
    /// Maximum tracing level: error, warn, info, debug or trace.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            downloads_root: PathBuf::from("downloads"),
            ytdlp_program: PathBuf::from("yt-dlp"),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn tracing_level(&self) -> Result<tracing::Level> {
        self.log_level
            .parse()
            .map_err(|_| anyhow!("Invalid log_level '{}' in config", self.log_level))
    }
}

/// Returns the cross-platform project directories used for config and PID files.
pub fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "Deku", "Deku-Media")
        .ok_or_else(|| anyhow!("Could not find a valid home directory to store config"))
}

/// Returns the cross-platform path to the configuration file, creating the directory if needed.
async fn get_config_path() -> Result<PathBuf> {
    let project_dirs = project_dirs()?;
    let config_dir = project_dirs.config_dir();
    fs::create_dir_all(config_dir).await?;
    Ok(config_dir.join("config.toml"))
}

/// Loads the configuration from the file, or creates a default one if it doesn't exist.
pub async fn load_config() -> Result<Config> {
    let config_path = get_config_path().await?;
    load_config_from(&config_path).await
}

/// Same as [`load_config`] for an explicit file path.
pub async fn load_config_from(config_path: &Path) -> Result<Config> {
    if !config_path.exists() {
        tracing::info!(
            "No config file found. Creating a default one at: {}",
            config_path.display()
        );
        let default_config = Config::default();
        save_config_to(&default_config, config_path).await?;
        return Ok(default_config);
    }

    let config_content = fs::read_to_string(config_path).await?;
    let config: Config = toml::from_str(&config_content)
        .map_err(|e| anyhow!("Failed to parse config file at {}: {}", config_path.display(), e))?;
    config.tracing_level()?;

    Ok(config)
}

/// Saves the provided configuration object to the file.
pub async fn save_config_to(config: &Config, config_path: &Path) -> Result<()> {
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let toml_string = toml::to_string_pretty(config)?;
    fs::write(config_path, toml_string).await?;
    Ok(())
}
