// ── Runtime connection configuration ──
//
// These types describe *how* to reach one DKN cloud account. They carry
// credential data and connection tuning, but never touch disk. The
// consumer (or `dknbridge-config`) constructs a `BridgeConfig` and
// hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Production endpoint of the DKN cloud service.
pub const DEFAULT_BASE_URL: &str = "https://dkn.airzonecloud.com";

/// Configuration for bridging a single cloud account.
///
/// Built by consumers, passed to `Bridge` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Cloud base URL. Overridable for test servers.
    pub base_url: Url,
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: SecretString,
    /// Request timeout.
    pub timeout: Duration,
    /// Enable the pushed event stream.
    pub events_enabled: bool,
    /// Polling interval used when the event stream is disabled.
    pub poll_interval: Duration,
}

impl BridgeConfig {
    /// Config against the production cloud with default tuning.
    pub fn new(email: impl Into<String>, password: SecretString) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: DEFAULT_BASE_URL.parse()?,
            email: email.into(),
            password,
            timeout: Duration::from_secs(30),
            events_enabled: true,
            poll_interval: Duration::from_secs(30),
        })
    }
}
