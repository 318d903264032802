// Configuration loading
// A small TOML file in the platform config directory; missing or
// malformed files fall back to defaults

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

const QUALIFIER: &str = "edu";
const ORGANIZATION: &str = "SoftwareCenter";
const APPLICATION: &str = "softcenter";
const CONFIG_FILE_NAME: &str = "softcenter.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Root directory for records, storage buckets and settings
    pub data_dir: Option<PathBuf>,
}

pub fn config_file_path() -> Option<PathBuf> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

pub fn default_data_dir() -> Option<PathBuf> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
        .map(|dirs| dirs.data_local_dir().to_path_buf())
}

pub fn load_config(path: &Path) -> Option<Config> {
    let contents = fs::read_to_string(path).ok()?;
    match toml::from_str::<Config>(&contents) {
        Ok(config) => Some(config),
        Err(err) => {
            tracing::warn!("ignoring malformed config file {}: {err}", path.display());
            None
        }
    }
}

pub fn save_config(path: &Path, config: &Config) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let toml = toml::to_string_pretty(config).map_err(|err| {
        io::Error::new(ErrorKind::Other, format!("toml serialization error: {err}"))
    })?;

    fs::write(path, toml)
}

/// Resolve the effective data directory: a command-line override wins,
/// then the config file, then the platform data directory
pub fn resolve_data_dir(cli_override: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = cli_override {
        return dir;
    }

    if let Some(path) = config_file_path()
        && let Some(config) = load_config(&path)
        && let Some(dir) = config.data_dir
    {
        return dir;
    }

    default_data_dir().unwrap_or_else(|| PathBuf::from(".softcenter"))
}
