// ── Core error types ──
//
// Consumer-facing errors from dknbridge-core. These are NOT API-specific --
// consumers never see HTTP status codes or JSON parse failures directly.
// The `From<dknbridge_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to the DKN cloud: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Bridge is not connected")]
    BridgeDisconnected,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Unit not found: {identifier}")]
    UnitNotFound { identifier: String },

    // ── Operation errors ─────────────────────────────────────────────
    /// Generic update-failure signal surfaced to the host's entity
    /// update machinery: a missing temperature argument, a setpoint
    /// request in a mode without a setpoint, or a rejected setter call.
    #[error("State update failed: {message}")]
    UpdateFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("Cloud API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<dknbridge_api::Error> for CoreError {
    fn from(err: dknbridge_api::Error) -> Self {
        match err {
            dknbridge_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            dknbridge_api::Error::NotSignedIn => CoreError::BridgeDisconnected,
            dknbridge_api::Error::Transport(ref e) => {
                if e.is_timeout() || e.is_connect() {
                    CoreError::ConnectionFailed {
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            dknbridge_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            dknbridge_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            dknbridge_api::Error::EventStreamConnect(reason)
            | dknbridge_api::Error::EventStreamClosed { reason } => {
                CoreError::ConnectionFailed { reason }
            }
            dknbridge_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
