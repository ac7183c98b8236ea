//! Azure AD device-code flow (v1 endpoint).

use std::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer};
use tokio::time::Instant;
use tracing::{debug, error, info};
use zeroize::Zeroizing;

use crate::config::Config;
use crate::error::AuthError;

/// HTTP request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// HTTP connection timeout.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Grant type for exchanging a device code on the v1 token endpoint.
const DEVICE_CODE_GRANT: &str = "device_code";
/// Poll interval used when the provider does not send one.
const DEFAULT_INTERVAL_SECS: u64 = 5;
/// Added to the interval on a `slow_down` answer.
const SLOW_DOWN_STEP_SECS: u64 = 5;

/// Code and instructions the user needs to finish sign-in in a browser.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCodeChallenge {
    pub user_code: String,
    pub device_code: String,
    #[serde(alias = "verification_uri")]
    pub verification_url: String,
    #[serde(deserialize_with = "seconds")]
    pub expires_in: u64,
    #[serde(default = "default_interval", deserialize_with = "seconds")]
    pub interval: u64,
    #[serde(default)]
    pub message: String,
}

impl DeviceCodeChallenge {
    /// Message to show when the browser is not launched for the user.
    pub fn instructions(&self) -> String {
        if self.message.is_empty() {
            format!(
                "To sign in, use a web browser to open the page {} and enter the code {} to authenticate.",
                self.verification_url, self.user_code
            )
        } else {
            self.message.clone()
        }
    }
}

fn default_interval() -> u64 {
    DEFAULT_INTERVAL_SECS
}

/// Azure AD v1 sends durations as strings ("900"); v2 sends numbers.
fn seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Token response from Azure AD.
#[derive(Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token_type: String,
    #[serde(default, deserialize_with = "optional_seconds")]
    pub expires_in: Option<u64>,
}

impl TokenResponse {
    /// Take the access token out of the response.
    pub fn take_access_token(&mut self) -> Option<Zeroizing<String>> {
        self.access_token
            .take()
            .filter(|t| !t.is_empty())
            .map(Zeroizing::new)
    }
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

fn optional_seconds<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "seconds")] u64);

    Option::<Wrapper>::deserialize(deserializer).map(|w| w.map(|Wrapper(n)| n))
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Outcome of a single token poll.
#[derive(Debug)]
pub enum PollOutcome {
    Pending,
    SlowDown,
    Authorized(TokenResponse),
}

/// Classify an error answer from the token endpoint.
fn classify_poll_error(error: &str, description: Option<&str>) -> Result<PollOutcome, AuthError> {
    match error {
        "authorization_pending" => Ok(PollOutcome::Pending),
        "slow_down" => Ok(PollOutcome::SlowDown),
        "code_expired" | "expired_token" => Err(AuthError::CodeExpired),
        "access_denied" | "authorization_declined" => Err(AuthError::AccessDenied),
        other => Err(AuthError::TokenExchangeFailed(
            description.map_or_else(|| other.to_string(), |d| format!("{}: {}", other, d)),
        )),
    }
}

/// Device-code client for Azure AD.
pub struct DeviceFlowClient {
    client_id: String,
    resource: String,
    device_code_url: String,
    token_url: String,
    http_client: reqwest::Client,
}

impl DeviceFlowClient {
    /// Create a new device flow client from configuration.
    pub fn new(config: &Config) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| AuthError::DeviceCodeFailed(e.to_string()))?;

        Ok(Self {
            client_id: config.auth.client_id.clone(),
            resource: config.auth.resource.clone(),
            device_code_url: config.device_code_url(),
            token_url: config.token_url(),
            http_client,
        })
    }

    /// Ask the identity provider for a user code.
    pub async fn request_device_code(&self) -> Result<DeviceCodeChallenge, AuthError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("resource", self.resource.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.device_code_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::DeviceCodeFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!("Device code request failed: HTTP {} - {}", status, error_body);
            return Err(AuthError::DeviceCodeFailed(format!("HTTP {}", status.as_u16())));
        }

        let challenge: DeviceCodeChallenge = response
            .json()
            .await
            .map_err(|e| AuthError::DeviceCodeFailed(e.to_string()))?;

        debug!(
            "Device code issued, expires in {}s, poll interval {}s",
            challenge.expires_in, challenge.interval
        );
        Ok(challenge)
    }

    /// Poll the token endpoint once.
    pub async fn poll_once(&self, challenge: &DeviceCodeChallenge) -> Result<PollOutcome, AuthError> {
        let params = [
            ("grant_type", DEVICE_CODE_GRANT),
            ("client_id", self.client_id.as_str()),
            ("resource", self.resource.as_str()),
            ("code", challenge.device_code.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;

        if status.is_success() {
            let token: TokenResponse = serde_json::from_str(&body)
                .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;
            return Ok(PollOutcome::Authorized(token));
        }

        match serde_json::from_str::<TokenErrorResponse>(&body) {
            Ok(err) => classify_poll_error(&err.error, err.error_description.as_deref()),
            Err(_) => {
                error!("Token request failed: HTTP {} - {}", status, body);
                Err(AuthError::TokenExchangeFailed(format!("HTTP {}", status.as_u16())))
            }
        }
    }

    /// Poll until the user completes sign-in or the code expires.
    pub async fn poll_for_token(
        &self,
        challenge: &DeviceCodeChallenge,
    ) -> Result<TokenResponse, AuthError> {
        poll_until_authorized(challenge.expires_in, challenge.interval, || {
            self.poll_once(challenge)
        })
        .await
    }
}

/// Drive `poll` every `interval` seconds until it authorizes or `expires_in`
/// seconds have passed. `slow_down` widens the interval for the rest of the loop.
async fn poll_until_authorized<F, Fut>(
    expires_in: u64,
    interval: u64,
    mut poll: F,
) -> Result<TokenResponse, AuthError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollOutcome, AuthError>>,
{
    // No deadline when the provider's lifetime does not fit an Instant.
    let deadline = Instant::now().checked_add(Duration::from_secs(expires_in));
    let mut interval = interval.max(1);

    loop {
        tokio::time::sleep(Duration::from_secs(interval)).await;

        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(AuthError::CodeExpired);
        }

        match poll().await? {
            PollOutcome::Pending => continue,
            PollOutcome::SlowDown => {
                interval = interval.saturating_add(SLOW_DOWN_STEP_SECS);
                debug!("Provider asked to slow down, polling every {}s", interval);
            }
            PollOutcome::Authorized(token) => {
                info!("Device code sign-in completed");
                return Ok(token);
            }
        }
    }
}

/// `secs` as a chrono delta, saturating instead of panicking on huge values.
pub fn seconds_delta(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

/// Expiry instant for a token issued now.
pub fn token_expiry(expires_in: Option<u64>) -> DateTime<Utc> {
    // One hour is the Azure AD default lifetime.
    Utc::now()
        .checked_add_signed(seconds_delta(expires_in.unwrap_or(3600)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Format duration as human-readable string (e.g., "45 min", "1 hour").
pub fn format_duration(duration: chrono::Duration) -> String {
    let total_minutes = duration.num_minutes();

    if total_minutes < 1 {
        "< 1 min".to_string()
    } else if total_minutes < 60 {
        format!("{} min", total_minutes)
    } else {
        let hours = total_minutes / 60;
        let mins = total_minutes % 60;
        if mins == 0 {
            format!("{} hour{}", hours, if hours == 1 { "" } else { "s" })
        } else {
            format!("{}h {}m", hours, mins)
        }
    }
}
