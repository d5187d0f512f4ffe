//! Arenalang project configuration.
//!
//! Handles parsing and management of `arenalang.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config file not found: {0}")]
    NotFound(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration structure matching `arenalang.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArenalangConfig {
    #[serde(default)]
    pub package: PackageConfig,

    /// Default byte capacity for a program's top-level `alloc` block when
    /// the host does not size it explicitly.
    #[serde(default)]
    pub vm: VmConfig,
}

impl ArenalangConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: ArenalangConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from the current directory or its parents.
    pub fn load_from_cwd() -> ConfigResult<Self> {
        let cwd = std::env::current_dir().map_err(ConfigError::Io)?;
        Self::find_and_load(&cwd)
    }

    /// Search upward from `start_dir` for `arenalang.toml`. Falls back to
    /// the default configuration if the filesystem root is reached
    /// without finding one -- a missing config file is not an error.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join("arenalang.toml");
            if config_path.exists() {
                return Self::load(&config_path);
            }
            if !dir.pop() {
                return Ok(Self::default());
            }
        }
    }

    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Package metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    #[serde(default = "default_package_name")]
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub description: String,
}

fn default_package_name() -> String {
    "arenalang-project".to_string()
}

fn default_version() -> String {
    "0.1.0".to_string()
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self { name: default_package_name(), version: default_version(), description: String::new() }
    }
}

/// Interpreter-level resource limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmConfig {
    /// Byte capacity handed to a top-level `alloc` block with no explicit
    /// size (e.g. when a host embeds a program fragment directly).
    #[serde(default = "default_arena_capacity")]
    pub default_arena_capacity: usize,

    /// Upper bound on instructions a single `Run` call may execute before
    /// it is treated as runaway and cancelled by the host.
    #[serde(default = "default_max_instructions")]
    pub max_instructions: usize,
}

fn default_arena_capacity() -> usize {
    4096
}

fn default_max_instructions() -> usize {
    1_000_000
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            default_arena_capacity: default_arena_capacity(),
            max_instructions: default_max_instructions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_limits() {
        let config = ArenalangConfig::default();
        assert_eq!(config.vm.default_arena_capacity, 4096);
        assert_eq!(config.vm.max_instructions, 1_000_000);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let toml_str = r#"
[package]
name = "demo"

[vm]
default_arena_capacity = 64
"#;
        let config: ArenalangConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.package.name, "demo");
        assert_eq!(config.vm.default_arena_capacity, 64);
        assert_eq!(config.vm.max_instructions, 1_000_000);
    }

    #[test]
    fn missing_config_file_falls_back_to_default() {
        let config = ArenalangConfig::find_and_load(Path::new("/")).unwrap();
        assert_eq!(config.package.name, "arenalang-project");
    }
}
