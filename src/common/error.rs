//! Error types for dynamokv

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === Availability Errors ===
    #[error("Node unavailable: {0} is crashed")]
    NodeUnavailable(String),

    // === Versioning Errors ===
    #[error("Stale write for key {key}: an existing version dominates the supplied context")]
    StaleWrite { key: String },

    // === Network Errors ===
    #[error("Peer {peer} unreachable: {reason}")]
    PeerUnreachable { peer: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(String),

    // === Request Errors ===
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Does this error only concern a single peer (skip it, queue for gossip)?
    pub fn is_peer_failure(&self) -> bool {
        matches!(
            self,
            Error::PeerUnreachable { .. } | Error::NodeUnavailable(_) | Error::Http(_)
        )
    }

    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Error::NodeUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::StaleWrite { .. } => StatusCode::CONFLICT,
            Error::PeerUnreachable { .. } | Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::InvalidRequest(_) | Error::Serialization(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let peer = e
            .url()
            .map(|u| u.authority().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        if e.is_connect() || e.is_timeout() {
            Error::PeerUnreachable {
                peer,
                reason: e.to_string(),
            }
        } else {
            Error::Http(e.to_string())
        }
    }
}
