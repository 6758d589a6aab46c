use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::BoardConfig;

pub const DEFAULT_CONFIG_FILE: &str = "taskboard.toml";
pub const ACCESS_TOKEN_ENV: &str = "TASKBOARD_ACCESS_TOKEN";

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Read the board config.
///
/// With an explicit path the file must exist. Without one, `taskboard.toml`
/// in the working directory is used if present, otherwise the defaults.
pub fn read_config(explicit: Option<&Path>) -> Result<BoardConfig, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !path.exists() {
                return Ok(BoardConfig::default());
            }
            path
        }
    };
    let text = fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        source: e,
    })?;
    parse_config(&text).map_err(|e| ConfigError::ParseError { path, source: e })
}

/// Parse config text, normalizing paging counts.
pub fn parse_config(text: &str) -> Result<BoardConfig, toml::de::Error> {
    let mut config: BoardConfig = toml::from_str(text)?;
    config.paging = config.paging.normalized();
    Ok(config)
}

/// Let the environment supply the access token, so it need not live in
/// the config file.
pub fn apply_env_overrides(config: &mut BoardConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(token) = lookup(ACCESS_TOKEN_ENV).filter(|t| !t.is_empty()) {
        config.store.access_token = Some(token);
    }
}
