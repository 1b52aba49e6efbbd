use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sheets request failed{}: {message}", status_suffix(.status))]
    Transport {
        status: Option<StatusCode>,
        message: String,
    },
    #[error("sheet returned no rows for range {range}")]
    EmptyResult { range: String },
}

impl StoreError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Transport { status, .. } => *status,
            Self::EmptyResult { .. } => None,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport {
            status: value.status(),
            message: value.to_string(),
        }
    }
}

fn status_suffix(status: &Option<StatusCode>) -> String {
    match status {
        Some(code) => format!(" (status {})", code.as_u16()),
        None => String::new(),
    }
}

/// The single failure surface handed to callers of `search_student`.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search failed")]
    Failed {
        #[source]
        source: StoreError,
    },
}

impl From<StoreError> for SearchError {
    fn from(source: StoreError) -> Self {
        Self::Failed { source }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ImageError {
    #[error("payload is not a base64 data uri")]
    NotDataUri,
    #[error("invalid base64 payload: {0}")]
    Base64(String),
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
