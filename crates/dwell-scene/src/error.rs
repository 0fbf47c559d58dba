use std::fmt;

use dwell_core::ConfigError;

#[derive(Debug)]
pub enum SceneError {
    Io(std::io::Error),
    Parse(String),
    InvalidData(String),
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::Io(e) => write!(f, "I/O error: {e}"),
            SceneError::Parse(msg) => write!(f, "parse error: {msg}"),
            SceneError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
        }
    }
}

impl std::error::Error for SceneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SceneError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SceneError {
    fn from(e: std::io::Error) -> Self {
        SceneError::Io(e)
    }
}

impl From<toml::de::Error> for SceneError {
    fn from(e: toml::de::Error) -> Self {
        SceneError::Parse(format!("TOML: {e}"))
    }
}

impl From<serde_json::Error> for SceneError {
    fn from(e: serde_json::Error) -> Self {
        SceneError::Parse(format!("JSON: {e}"))
    }
}

impl From<ConfigError> for SceneError {
    fn from(e: ConfigError) -> Self {
        SceneError::InvalidData(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SceneError>;
