use thiserror::Error;

/// Top-level error type for the `dknbridge-api` crate.
///
/// Covers every failure mode across the cloud API surfaces:
/// authentication, transport, REST endpoints, and the event stream.
/// `dknbridge-core` maps these into consumer-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Sign-in failed (wrong credentials, account locked, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A call was made before `login()` established a session token.
    #[error("Not signed in -- call login() first")]
    NotSignedIn,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Cloud API ───────────────────────────────────────────────────
    /// Non-success response from the cloud API.
    #[error("Cloud API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Event stream ────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("Event stream connection failed: {0}")]
    EventStreamConnect(String),

    /// WebSocket closed unexpectedly.
    #[error("Event stream closed: {reason}")]
    EventStreamClosed { reason: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates auth has expired
    /// and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::NotSignedIn)
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::EventStreamConnect(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => false,
        }
    }
}
