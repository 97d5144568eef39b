use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON serialization error for {context}: {source}")]
    Serialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid API base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("tracking number not found: {tracking_number}")]
    NotFound { tracking_number: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("carrier rejected request ({code}): {message}")]
    Carrier { code: String, message: String },

    #[error("no package named \"{0}\"")]
    UnknownPackage(String),

    #[error("package store error at {path}: {source}")]
    Store {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    View(#[from] ViewError),

    #[error("could not open {url}: {reason}")]
    Navigation { url: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("element {id} did not appear within {waited_ms}ms")]
    Timeout { id: String, waited_ms: u64 },

    #[error("wait for element {id} was cancelled")]
    Cancelled { id: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
