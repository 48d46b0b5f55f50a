//! Login and session refresh
//!
//! Both calls POST JSON to an auth endpoint and receive the common response
//! envelope with a token pair in `result`. They go straight to the
//! transport: neither carries a bearer token, and a 401 from either one is a
//! plain failure, never a reason to renew.

use fridge_transport::{ApiRequest, ApiResponse, Envelope, Transport};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{LOGIN_PATH, REFRESH_PATH};
use crate::credentials::UserInfo;
use crate::error::{Error, Result};

/// Access/refresh pair issued by the refresh endpoint.
#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenPair([REDACTED])")
    }
}

/// Result of a successful login.
#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub user: Option<UserInfo>,
}

impl std::fmt::Debug for LoginResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResult")
            .field("tokens", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

/// Exchange a refresh token for a new token pair.
///
/// A single attempt: the caller decides what a failure means. 401/403 mean
/// the refresh token itself is no longer accepted.
pub async fn refresh_session(transport: &dyn Transport, refresh: &str) -> Result<TokenPair> {
    let request = ApiRequest::post(
        REFRESH_PATH,
        serde_json::json!({ "refreshToken": refresh }),
    );
    let response = transport.send(request).await?;
    let pair: TokenPair = decode(response, "token refresh")?;
    debug!("session refresh succeeded");
    Ok(pair)
}

/// Exchange email and password for a token pair and the user's profile.
pub async fn login(transport: &dyn Transport, email: &str, password: &str) -> Result<LoginResult> {
    let request = ApiRequest::post(
        LOGIN_PATH,
        serde_json::json!({ "email": email, "password": password }),
    );
    let response = transport.send(request).await?;
    decode(response, "login")
}

/// Map status and envelope to a typed result.
fn decode<T: DeserializeOwned>(response: ApiResponse, what: &str) -> Result<T> {
    let status = response.status;
    if !status.is_success() {
        let body = response.text();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Error::InvalidCredentials(format!(
                "{what} rejected ({status}): {body}"
            )));
        }
        return Err(Error::TokenExchange(format!(
            "{what} returned {status}: {body}"
        )));
    }

    let envelope: Envelope<T> = response
        .envelope()
        .map_err(|e| Error::TokenExchange(format!("invalid {what} response: {e}")))?;
    envelope
        .into_result()
        .map_err(|e| Error::TokenExchange(format!("{what} failed: {e}")))
}
