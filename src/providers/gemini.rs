//! Gemini (Google) provider.
//!
//! Reads the gemini CLI's OAuth credential, refreshes it through the Google
//! token endpoint when expired (the OAuth client id/secret come from the
//! installed CLI package, see `auth::store`), and posts to the internal
//! quota endpoint. The response is a list of per-model quota buckets that
//! get folded into a Pro window and a Flash window.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::UsageFetcher;
use crate::auth::refresh::GEMINI_TOKEN_ENDPOINT;
use crate::auth::{CredentialStore, TokenRefresher};
use crate::core::http::{DEFAULT_TIMEOUT, map_request_error};
use crate::core::models::{UsageData, UsageWindow};
use crate::core::provider::ProviderId;
use crate::error::{QpaceError, Result};

/// Quota endpoint.
pub const QUOTA_ENDPOINT: &str =
    "https://cloudcode-pa.googleapis.com/v1internal:retrieveUserQuota";

/// Buckets describe daily quotas.
const DAY_MINUTES: i32 = 1440;

const PROVIDER: ProviderId = ProviderId::Gemini;

// =============================================================================
// Client
// =============================================================================

pub struct GeminiClient {
    http: reqwest::Client,
    store: CredentialStore,
    quota_url: String,
    token_url: String,
}

impl GeminiClient {
    /// Client against the production endpoints.
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_endpoints(
            http,
            CredentialStore::new(),
            QUOTA_ENDPOINT,
            GEMINI_TOKEN_ENDPOINT,
        )
    }

    /// Client with explicit store and endpoints (tests).
    #[must_use]
    pub fn with_endpoints(
        http: reqwest::Client,
        store: CredentialStore,
        quota_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            store,
            quota_url: quota_url.into(),
            token_url: token_url.into(),
        }
    }

    async fn try_fetch(&self) -> Result<UsageData> {
        let credential = self
            .store
            .load(PROVIDER)
            .await
            .ok_or(QpaceError::CredentialsMissing { provider: PROVIDER })?;

        let mut access_token = credential.access_token.clone();

        if credential.is_expired(Utc::now()) && credential.can_refresh() {
            // Refresh needs the OAuth client pair from the installed CLI;
            // without it the credential is effectively unrefreshable.
            let oauth_client = self
                .store
                .gemini_oauth_client()
                .await
                .ok_or(QpaceError::TokenExpired { provider: PROVIDER })?;

            let refresh_token = credential.refresh_token.as_deref().unwrap_or_default();
            let refreshed = TokenRefresher::new(self.http.clone())
                .refresh_gemini(refresh_token, &oauth_client, &self.token_url)
                .await
                .map_err(|_| QpaceError::TokenExpired { provider: PROVIDER })?;
            access_token = refreshed.access_token;
        }

        let response = self
            .http
            .post(&self.quota_url)
            .bearer_auth(&access_token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| map_request_error(&e, DEFAULT_TIMEOUT))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(QpaceError::Unauthorized { provider: PROVIDER });
        }
        if !status.is_success() {
            return Err(QpaceError::Network(format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| QpaceError::Network(e.to_string()))?;
        Ok(parse_quota(&body))
    }
}

#[async_trait]
impl UsageFetcher for GeminiClient {
    fn provider_id(&self) -> ProviderId {
        PROVIDER
    }

    async fn fetch_usage(&self) -> UsageData {
        match self.try_fetch().await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(provider = %PROVIDER, error = %e, "fetch failed");
                UsageData::from_error(PROVIDER, e.user_message())
            }
        }
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse the quota response body. Pure; malformed JSON becomes a parse
/// error, a body without a `buckets` array an invalid-response error.
///
/// Multiple buckets can describe the same model (and multiple models map to
/// the same window): the lowest remaining fraction wins per model first,
/// then the highest resulting used-percent wins per window.
#[must_use]
pub fn parse_quota(raw: &str) -> UsageData {
    let Ok(json) = serde_json::from_str::<Value>(raw) else {
        return UsageData::from_error(PROVIDER, "Failed to parse response");
    };

    let Some(buckets) = json.get("buckets").and_then(Value::as_array) else {
        return UsageData::from_error(PROVIDER, "Invalid quota response");
    };

    // Worst-case remaining fraction per model (case-insensitive model ids).
    let mut model_quotas: BTreeMap<String, (f64, Option<DateTime<Utc>>)> = BTreeMap::new();

    for bucket in buckets {
        let Some(model_id) = bucket.get("modelId").and_then(Value::as_str) else {
            continue;
        };
        let Some(remaining) = bucket.get("remainingFraction").and_then(Value::as_f64) else {
            continue;
        };

        let reset_at = bucket
            .get("resetTime")
            .and_then(Value::as_str)
            .and_then(parse_timestamp);

        let key = model_id.to_lowercase();
        let is_worse = model_quotas
            .get(&key)
            .is_none_or(|(existing, _)| remaining < *existing);
        if is_worse {
            model_quotas.insert(key, (remaining, reset_at));
        }
    }

    let mut pro_window: Option<UsageWindow> = None;
    let mut flash_window: Option<UsageWindow> = None;

    for (model_id, (remaining, reset_at)) in model_quotas {
        #[allow(clippy::cast_possible_truncation)]
        let used = ((1.0 - remaining) * 100.0).round() as i32;
        let window = UsageWindow {
            used,
            limit: 100,
            window_minutes: DAY_MINUTES,
            reset_at,
            reset_in: None,
        };

        let slot = if model_id.contains("pro") {
            &mut pro_window
        } else if model_id.contains("flash") {
            &mut flash_window
        } else {
            continue;
        };

        if slot.as_ref().is_none_or(|current| used > current.used) {
            *slot = Some(window);
        }
    }

    UsageData {
        session: pro_window,
        weekly: flash_window,
        ..UsageData::new(PROVIDER)
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

// =============================================================================
// Tests
// =============================================================================
