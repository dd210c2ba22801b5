//! Service configuration: default algorithm, `List` page size, rotation
//! retry bound. Loaded from a TOML file under the platform config directory
//! (override with `TRANSIT_CORE_CONFIG`), with atomic write-then-rename
//! persistence and an explicit schema version for forward compatibility.

use std::env;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use dirs::config_dir;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::model::Algorithm;

const CONFIG_ENV: &str = "TRANSIT_CORE_CONFIG";
const APP_DIR: &str = "transit-core";
const CONFIG_FILE_NAME: &str = "config.toml";
const CURRENT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug)]
pub enum ConfigError {
    ConfigDirUnavailable,
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
    UnsupportedSchemaVersion(u32),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ConfigDirUnavailable => {
                write!(f, "unable to determine configuration directory")
            }
            ConfigError::Io(err) => write!(f, "filesystem error: {err}"),
            ConfigError::Parse(err) => write!(f, "failed to parse config: {err}"),
            ConfigError::Serialize(err) => write!(f, "failed to serialize config: {err}"),
            ConfigError::UnsupportedSchemaVersion(version) => {
                write!(f, "config schema version '{version}' is not supported")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            ConfigError::Serialize(err) => Some(err),
            _ => None,
        }
    }
}

fn serde_algorithm_default() -> Algorithm {
    Algorithm::Aes256Gcm
}

/// Service defaults. `default_algorithm` is used by the demo CLI when a
/// caller does not name one explicitly; `list_page_size` bounds `List` calls
/// that don't pin an explicit limit; `rotate_max_attempts` is the
/// orchestrator's `Rotate` version-conflict retry bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitConfig {
    #[serde(default)]
    schema_version: Option<u32>,

    #[serde(default = "serde_algorithm_default")]
    pub default_algorithm: Algorithm,

    #[serde(default = "default_list_page_size")]
    pub list_page_size: u64,

    #[serde(default = "default_rotate_max_attempts")]
    pub rotate_max_attempts: u32,
}

fn default_list_page_size() -> u64 {
    50
}

fn default_rotate_max_attempts() -> u32 {
    3
}

impl Default for TransitConfig {
    fn default() -> Self {
        Self {
            schema_version: Some(CURRENT_SCHEMA_VERSION),
            default_algorithm: serde_algorithm_default(),
            list_page_size: default_list_page_size(),
            rotate_max_attempts: default_rotate_max_attempts(),
        }
    }
}

impl TransitConfig {
    fn schema_version(&self) -> u32 {
        self.schema_version.unwrap_or(0)
    }
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }

    let mut dir = config_dir().ok_or(ConfigError::ConfigDirUnavailable)?;
    dir.push(APP_DIR);
    fs::create_dir_all(&dir).map_err(ConfigError::Io)?;
    dir.push(CONFIG_FILE_NAME);
    Ok(dir)
}

pub fn load_config(path: &Path) -> Result<TransitConfig, ConfigError> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            let config: TransitConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
            if config.schema_version() > CURRENT_SCHEMA_VERSION {
                return Err(ConfigError::UnsupportedSchemaVersion(
                    config.schema_version(),
                ));
            }
            Ok(config)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(TransitConfig::default()),
        Err(err) => Err(ConfigError::Io(err)),
    }
}

/// Resolve the platform config path and load it. No silent fallback to an
/// in-memory default on an error other than a missing file (`load_config`
/// itself already treats "file does not exist" as "use defaults").
pub fn load_service_config() -> Result<TransitConfig, ConfigError> {
    let path = config_path()?;
    load_config(&path)
}

pub fn persist_config(path: &Path, config: &TransitConfig) -> Result<(), ConfigError> {
    let parent = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    if !parent.exists() {
        fs::create_dir_all(&parent).map_err(ConfigError::Io)?;
    }

    let toml = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    let mut temp = NamedTempFile::new_in(&parent).map_err(ConfigError::Io)?;
    temp.write_all(toml.as_bytes()).map_err(ConfigError::Io)?;
    temp.flush().map_err(ConfigError::Io)?;
    temp.persist(path)
        .map_err(|err| ConfigError::Io(err.error))?;
    Ok(())
}
