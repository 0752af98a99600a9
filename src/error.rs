//! Error types for the spotop CLI

use thiserror::Error;

/// Result type alias for spotop operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Interactive prompt error: {0}")]
    Dialoguer(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Other(String),
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::Dialoguer(err.to_string())
    }
}

/// Transport-level errors from remote feeds and the Spot console API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not signed in to the Spot console. Run `spotop init` to store an access token.")]
    Unauthorized,

    #[error("Unexpected status {status} from {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network("Failed to connect".to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Dataset-level errors from the aggregation pipeline
#[derive(Debug, Error)]
pub enum DataError {
    #[error("{source_name} data unavailable: {detail}")]
    SourceUnavailable {
        source_name: &'static str,
        detail: String,
    },

    #[error("Malformed {source_name} data: {detail}")]
    MalformedData {
        source_name: &'static str,
        detail: String,
    },

    #[error("No spot advisory data for region {0}")]
    UnknownRegion(String),

    #[error("Invalid instance type pattern {pattern:?}: {detail}")]
    InvalidPattern { pattern: String, detail: String },

    #[error("Spot console access token required for market scores. Run `spotop init` to sign in.")]
    Unauthenticated,

    #[error("Operation cancelled")]
    Cancelled,
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found. Run `spotop init` to set up.")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Cache storage errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Could not determine cache directory")]
    NoHome,

    #[error("Cache I/O error: {0}")]
    Io(String),
}
