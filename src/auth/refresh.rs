//! OAuth refresh-token exchange.
//!
//! Only invoked when a stored credential is expired and carries a refresh
//! token. A failed exchange means "must re-authenticate" — callers never
//! retry it. Codex has no HTTP refresh; its CLI owns that flow.

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::credentials::Credential;
use super::store::OAuthClient;
use crate::core::provider::ProviderId;
use crate::error::{QpaceError, Result};

/// Claude token endpoint.
pub const CLAUDE_TOKEN_ENDPOINT: &str = "https://platform.claude.com/v1/oauth/token";

/// Public installed-app client id the claude CLI registers with.
pub const CLAUDE_OAUTH_CLIENT_ID: &str = "9d1c250a-e61b-44d9-88ed-5944d1962f5e";

/// Google token endpoint.
pub const GEMINI_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Token endpoint response; fields the providers do not all send are
/// optional and defaulted.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<f64>,
}

/// Exchanges refresh tokens for fresh access tokens.
#[derive(Debug, Clone)]
pub struct TokenRefresher {
    http: Client,
}

impl TokenRefresher {
    #[must_use]
    pub const fn new(http: Client) -> Self {
        Self { http }
    }

    /// Refresh a Claude credential.
    ///
    /// # Errors
    ///
    /// Returns [`QpaceError::RefreshFailed`] on any HTTP failure or a
    /// response without an access token.
    pub async fn refresh_claude(&self, refresh_token: &str, token_url: &str) -> Result<Credential> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", CLAUDE_OAUTH_CLIENT_ID),
        ];
        self.exchange(ProviderId::Claude, token_url, &params, refresh_token)
            .await
    }

    /// Refresh a Gemini credential using the scraped OAuth client pair.
    ///
    /// # Errors
    ///
    /// Returns [`QpaceError::RefreshFailed`] on any HTTP failure or a
    /// response without an access token.
    pub async fn refresh_gemini(
        &self,
        refresh_token: &str,
        client: &OAuthClient,
        token_url: &str,
    ) -> Result<Credential> {
        let params = [
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        self.exchange(ProviderId::Gemini, token_url, &params, refresh_token)
            .await
    }

    async fn exchange(
        &self,
        provider: ProviderId,
        token_url: &str,
        params: &[(&str, &str)],
        fallback_refresh: &str,
    ) -> Result<Credential> {
        let failed = || QpaceError::RefreshFailed { provider };

        let response = self
            .http
            .post(token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!(provider = %provider, error = %e, "token refresh transport error");
                failed()
            })?;

        if !response.status().is_success() {
            tracing::debug!(provider = %provider, status = %response.status(),
                "token endpoint rejected refresh");
            return Err(failed());
        }

        let body: TokenResponse = response.json().await.map_err(|_| failed())?;
        credential_from_response(body, fallback_refresh, Utc::now()).ok_or_else(failed)
    }
}

/// Build the refreshed credential: rotated refresh token when the endpoint
/// sends one, the original otherwise; expiry computed from `expires_in`.
fn credential_from_response(
    response: TokenResponse,
    fallback_refresh: &str,
    now: DateTime<Utc>,
) -> Option<Credential> {
    let access_token = response.access_token.filter(|t| !t.is_empty())?;

    let refresh_token = response
        .refresh_token
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| fallback_refresh.to_string());

    #[allow(clippy::cast_possible_truncation)]
    let expires_at = response
        .expires_in
        .map(|secs| now + Duration::seconds(secs as i64));

    Some(Credential {
        access_token,
        refresh_token: Some(refresh_token),
        expires_at,
    })
}
