//! Dockhand configuration
//!
//! Runtime settings for the build-and-publish pipeline. Credentials are never
//! part of the configuration; they travel with each request.

pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Env var pointing directly at a config file
pub const CONFIG_PATH_ENV: &str = "DOCKHAND_CONFIG_PATH";
/// Env override for the container engine program
pub const DOCKER_ENV: &str = "DOCKHAND_DOCKER";
/// Env override for the git program
pub const GIT_ENV: &str = "DOCKHAND_GIT";

const CANDIDATES: [&str; 2] = ["dockhand.yml", ".dockhand.yml"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    /// Parent directory of per-run working copies (OS temp dir when unset)
    pub scratch_root: Option<PathBuf>,

    /// Program used to fetch repositories
    pub git: String,

    /// Program used to build, log in, tag and push
    pub docker: String,

    /// Build descriptor expected at the repository root
    pub descriptor: String,

    /// Capacity of the bounded channel between output readers and the log
    pub channel_capacity: usize,

    /// Trailing log lines kept in a build error
    pub error_tail_lines: usize,

    /// Remove the run's local image tags once the run ends
    pub remove_local_images: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scratch_root: None,
            git: "git".to_string(),
            docker: "docker".to_string(),
            descriptor: "Dockerfile".to_string(),
            channel_capacity: 256,
            error_tail_lines: 20,
            remove_local_images: true,
        }
    }
}

impl Settings {
    /// Discovers and loads the settings, falling back to defaults.
    ///
    /// Env overrides are applied after the file is read.
    pub fn load() -> Result<Self> {
        let settings = match find_config_file()? {
            Some(path) => {
                tracing::debug!("Loading settings from {}", path.display());
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        settings.with_env_overrides().validated()
    }

    /// Loads settings from an explicit path; a missing file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::from_file(path)?.with_env_overrides().validated()
    }

    fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(docker) = std::env::var(DOCKER_ENV)
            && !docker.trim().is_empty()
        {
            self.docker = docker;
        }
        if let Ok(git) = std::env::var(GIT_ENV)
            && !git.trim().is_empty()
        {
            self.git = git;
        }
        self
    }

    fn validated(self) -> Result<Self> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "channel-capacity must be at least 1".to_string(),
            ));
        }
        if self.descriptor.trim().is_empty() || self.descriptor.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "descriptor must be a file name at the repository root, got '{}'",
                self.descriptor
            )));
        }
        if self.git.trim().is_empty() || self.docker.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "git and docker programs must not be empty".to_string(),
            ));
        }
        Ok(self)
    }

    /// Directory under which working copies are created.
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

/// Looks for a config file.
///
/// Search order:
/// 1. `DOCKHAND_CONFIG_PATH`
/// 2. Current directory: `dockhand.yml`, `.dockhand.yml`
/// 3. `~/.config/dockhand/config.yml`
pub fn find_config_file() -> Result<Option<PathBuf>> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        tracing::warn!(
            "{} points at {} which does not exist; ignoring",
            CONFIG_PATH_ENV,
            path.display()
        );
    }

    let current_dir = std::env::current_dir()?;
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("dockhand").join("config.yml");
        if global_config.exists() {
            return Ok(Some(global_config));
        }
    }

    Ok(None)
}
