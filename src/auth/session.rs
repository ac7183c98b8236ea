//! Authenticated Graph session built from a device-code sign-in.

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::{info, warn};

use super::clipboard::copy_to_clipboard;
use super::device_flow::{
    format_duration, seconds_delta, token_expiry, DeviceCodeChallenge, DeviceFlowClient,
};
use crate::config::Config;
use crate::error::{ApiError, AuthError};
use crate::graph::transport::{GraphRequest, GraphResponse, GraphTransport, RequestBody};

/// HTTP request timeout for Graph calls (uploads included).
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);
/// HTTP connection timeout.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const SDK_VERSION_HEADER: &str = "sdkversion";
const CLIENT_SKU_HEADER: &str = "x-client-sku";

/// HTTP client carrying the bearer token and identifying headers.
///
/// Read-only once built.
pub struct Session {
    http_client: reqwest::Client,
    expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        access_token: &str,
        sdk_version: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .default_headers(default_headers(access_token, sdk_version)?)
            .build()
            .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;

        Ok(Self {
            http_client,
            expires_at,
        })
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

fn default_headers(access_token: &str, sdk_version: &str) -> Result<HeaderMap, AuthError> {
    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", access_token))
        .map_err(|_| AuthError::InvalidHeader("Authorization".into()))?;
    bearer.set_sensitive(true);

    let sdk = HeaderValue::from_str(sdk_version)
        .map_err(|_| AuthError::InvalidHeader(SDK_VERSION_HEADER.into()))?;

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(HeaderName::from_static(SDK_VERSION_HEADER), sdk.clone());
    headers.insert(HeaderName::from_static(CLIENT_SKU_HEADER), sdk);
    Ok(headers)
}

#[async_trait]
impl GraphTransport for Session {
    async fn send(&self, request: GraphRequest) -> Result<GraphResponse, ApiError> {
        if self.is_expired() {
            return Err(ApiError::TokenExpired);
        }

        let mut builder = self.http_client.request(request.method, &request.url);
        if let Some(content_type) = &request.content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Bytes(data) => builder.body(data),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::GraphRequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::GraphRequestFailed(e.to_string()))?;

        Ok(GraphResponse {
            status,
            content_type,
            body: body.to_vec(),
        })
    }
}

/// Sign in with the device-code flow and build a [`Session`].
///
/// Blocks (asynchronously) until the user finishes in the browser or the code
/// expires. Progress goes to `out`.
pub async fn acquire_session<W: Write>(
    config: &Config,
    auto_open: bool,
    out: &mut W,
) -> Result<Session, AuthError> {
    let flow = DeviceFlowClient::new(config)?;
    let challenge = flow.request_device_code().await?;

    let launched = auto_open
        && launch_verification(&challenge, copy_to_clipboard, |url: &str| open::that(url));
    announce_challenge(&challenge, launched, out);

    let mut token = flow.poll_for_token(&challenge).await?;
    let access_token = token.take_access_token().ok_or(AuthError::NoAccessToken)?;
    let expires_at = token_expiry(token.expires_in);

    let session = Session::new(&access_token, &config.api.sdk_version, expires_at)?;
    info!(
        "Session ready, token valid for {}",
        format_duration(expires_at - Utc::now())
    );
    Ok(session)
}

/// Show the user code. `launched` means the code is on the clipboard and the
/// browser is on its way; otherwise the provider's own message is printed.
fn announce_challenge<W: Write>(challenge: &DeviceCodeChallenge, launched: bool, out: &mut W) {
    let text = if launched {
        format!(
            "The code {} has been copied to your clipboard, and your web browser is opening {}. \
             Paste the code to sign in.",
            challenge.user_code, challenge.verification_url
        )
    } else {
        challenge.instructions()
    };

    let expires = format_duration(seconds_delta(challenge.expires_in));
    if let Err(e) = writeln!(out, "{}\n(The code expires in {}.)", text, expires) {
        warn!("Failed to write sign-in instructions: {}", e);
    }
}

/// Copy the user code and open the verification page. Each step runs even if
/// the other fails; returns true only when both succeeded.
fn launch_verification<C, O>(challenge: &DeviceCodeChallenge, copy: C, open_browser: O) -> bool
where
    C: FnOnce(&str) -> Result<(), String>,
    O: FnOnce(&str) -> std::io::Result<()>,
{
    let copied = match copy(&challenge.user_code) {
        Ok(()) => true,
        Err(e) => {
            warn!("Could not copy user code to clipboard: {}", e);
            false
        }
    };
    let opened = match open_browser(&challenge.verification_url) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to open browser: {}", e);
            false
        }
    };
    copied && opened
}
