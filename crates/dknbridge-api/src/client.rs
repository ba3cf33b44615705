// DKN Cloud HTTP client
//
// Wraps `reqwest::Client` with cloud-specific URL construction and token
// auth. The sign-in endpoint returns an authentication token; every
// subsequent request carries it as the `user_email`/`user_token` query
// pair. Setter calls go through the cloud's machine-event endpoint and
// are applied asynchronously on the vendor side -- confirmation arrives
// later through the event stream.

use std::sync::RwLock;
use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{ApiDevice, InstallationRelationsResponse, SignInResponse};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// An authenticated session. Created by `login()`, dropped by `logout()`.
struct Session {
    email: String,
    token: SecretString,
}

/// Raw HTTP client for the DKN cloud service.
///
/// Holds the session token behind an `RwLock` so one client can be shared
/// read-only across every entity adapter of an account, as the bridge does.
pub struct DknClient {
    http: reqwest::Client,
    base_url: Url,
    session: RwLock<Option<Session>>,
}

impl DknClient {
    /// Create a new client against the given cloud base URL
    /// (e.g. `https://dkn.airzonecloud.com`).
    pub fn new(base_url: Url, timeout: Option<Duration>) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .user_agent(concat!("dknbridge/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url,
            session: RwLock::new(None),
        })
    }

    /// Create a client with a pre-built `reqwest::Client` (tests).
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            session: RwLock::new(None),
        }
    }

    /// The cloud base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether a session token is currently held.
    pub fn is_signed_in(&self) -> bool {
        self.session.read().expect("session lock poisoned").is_some()
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Authenticate with the cloud using account email/password.
    ///
    /// `POST /users/sign_in` -- on success the returned token is stored
    /// and attached to all subsequent requests.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<(), Error> {
        let url = self.base_url.join("users/sign_in")?;
        debug!("signing in at {}", url);

        let body = json!({
            "email": email,
            "password": password.expose_secret(),
        });

        let resp = self.http.post(url).json(&body).send().await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("sign-in rejected (HTTP {status}): {body}"),
            });
        }

        let signin: SignInResponse = parse_json(resp).await?;
        *self.session.write().expect("session lock poisoned") = Some(Session {
            email: signin.user.email,
            token: SecretString::from(signin.user.authentication_token),
        });

        debug!("sign-in successful");
        Ok(())
    }

    /// End the current session. Best-effort: the token is dropped locally
    /// even if the cloud call fails.
    ///
    /// `DELETE /users/sign_out`
    pub async fn logout(&self) -> Result<(), Error> {
        let url = self.authed_url("users/sign_out")?;
        debug!("signing out");

        let result = self.http.delete(url).send().await;
        *self.session.write().expect("session lock poisoned") = None;
        result?;

        debug!("sign-out complete");
        Ok(())
    }

    // ── Devices ──────────────────────────────────────────────────────

    /// List every HVAC unit across all installations of the account.
    ///
    /// `GET /installation_relations`
    pub async fn list_devices(&self) -> Result<Vec<ApiDevice>, Error> {
        let url = self.authed_url("installation_relations")?;
        debug!("listing devices");

        let relations: InstallationRelationsResponse = self.get(url).await?;
        Ok(relations
            .installation_relations
            .into_iter()
            .flat_map(|rel| rel.installation.devices)
            .collect())
    }

    /// Set one field on a unit through the machine-event endpoint.
    ///
    /// `PUT /events` with `{"event": {"cgi": "modmaquina", ...}}`.
    /// The cloud acknowledges the request; the actual state change is
    /// confirmed later through the event stream.
    pub async fn set_device_value(
        &self,
        device_id: &str,
        option: &str,
        value: &serde_json::Value,
    ) -> Result<(), Error> {
        let url = self.authed_url("events")?;
        debug!(device_id, option, %value, "sending machine event");

        let body = json!({
            "event": {
                "cgi": "modmaquina",
                "device_id": device_id,
                "option": option,
                "value": value,
            }
        });

        let resp = self.http.put(url).json(&body).send().await?;
        check_status(resp).await?;
        Ok(())
    }

    // ── Event stream ─────────────────────────────────────────────────

    /// Build the authenticated websocket URL for the device event stream.
    pub fn events_url(&self) -> Result<Url, Error> {
        let mut url = self.authed_url("devices/ws")?;
        let scheme = if url.scheme() == "http" { "ws" } else { "wss" };
        url.set_scheme(scheme)
            .map_err(|()| Error::EventStreamConnect("unsupported URL scheme".into()))?;
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Build a URL with the session auth query pair attached.
    fn authed_url(&self, path: &str) -> Result<Url, Error> {
        let mut url = self.base_url.join(path)?;
        let guard = self.session.read().expect("session lock poisoned");
        let session = guard.as_ref().ok_or(Error::NotSignedIn)?;
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("user_email", &session.email)
            .append_pair("user_token", session.token.expose_secret());
        Ok(url)
    }

    /// Send a GET request and deserialize the JSON body.
    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        let resp = self.http.get(url).send().await?;
        parse_json(resp).await
    }
}

/// Map the status-only error cases shared by every endpoint.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();

    if status == StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication {
            message: "session expired or invalid credentials".into(),
        });
    }

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Api {
            status: status.as_u16(),
            message: body[..body.len().min(200)].to_owned(),
        });
    }

    Ok(resp)
}

/// Check status, then deserialize the body with a bounded preview on failure.
async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let resp = check_status(resp).await?;
    let body = resp.text().await?;

    serde_json::from_str(&body).map_err(|e| {
        let preview = &body[..body.len().min(200)];
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.clone(),
        }
    })
}
