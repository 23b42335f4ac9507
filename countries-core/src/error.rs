use std::fmt;

use thiserror::Error;

/// Failure returned by the remote providers.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Transport(String),

    /// The provider answered but does not know the lookup key
    /// (a country code or a city name).
    #[error("{what} not recognized: {key}")]
    NotRecognized { what: &'static str, key: String },

    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("{service} request failed with status {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("failed to parse {service} response: {source}")]
    Decode {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Config(String),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Transport(_) => FailureKind::Transport,
            FetchError::NotRecognized { .. } => FailureKind::NotRecognized,
            FetchError::Unauthorized(_) => FailureKind::Unauthorized,
            FetchError::Status { .. } => FailureKind::Provider,
            FetchError::Decode { .. } => FailureKind::Decode,
            FetchError::Config(_) => FailureKind::Config,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        let msg = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            format!("connection failed: {err}")
        } else {
            format!("request failed: {err}")
        };
        FetchError::Transport(msg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Transport,
    NotRecognized,
    Unauthorized,
    Provider,
    Decode,
    Config,
}

/// Error as stored in a resource slice: a kind for the views to branch on
/// and the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceError {
    pub kind: FailureKind,
    pub message: String,
}

impl SliceError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Wrap a provider failure. Unrecognized keys keep the provider's own
    /// wording, everything else is prefixed with `context`.
    pub fn from_fetch(context: &str, err: &FetchError) -> Self {
        let message = match err {
            FetchError::NotRecognized { .. } => err.to_string(),
            _ => format!("{context}: {err}"),
        };
        Self::new(err.kind(), message)
    }

    pub fn is_not_recognized(&self) -> bool {
        self.kind == FailureKind::NotRecognized
    }
}

impl fmt::Display for SliceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
