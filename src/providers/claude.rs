//! Claude (Anthropic) provider.
//!
//! Reads the OAuth credential the claude CLI leaves in `~/.claude`,
//! proactively refreshes it when expired, and calls the OAuth usage
//! endpoint. The response carries a 5-hour session window, a 7-day window,
//! and a model-tier 7-day window.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::UsageFetcher;
use crate::auth::refresh::CLAUDE_TOKEN_ENDPOINT;
use crate::auth::{CredentialStore, TokenRefresher};
use crate::core::http::{DEFAULT_TIMEOUT, map_request_error};
use crate::core::models::{UsageData, UsageWindow};
use crate::core::provider::ProviderId;
use crate::error::{QpaceError, Result};

/// Usage endpoint.
pub const USAGE_ENDPOINT: &str = "https://api.anthropic.com/api/oauth/usage";

/// Beta gate for the OAuth usage API.
const BETA_HEADER: &str = "oauth-2025-04-20";

const FIVE_HOUR_MINUTES: i32 = 300;
const SEVEN_DAY_MINUTES: i32 = 10_080;

const PROVIDER: ProviderId = ProviderId::Claude;

// =============================================================================
// Client
// =============================================================================

pub struct ClaudeClient {
    http: reqwest::Client,
    store: CredentialStore,
    usage_url: String,
    token_url: String,
}

impl ClaudeClient {
    /// Client against the production endpoints.
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_endpoints(
            http,
            CredentialStore::new(),
            USAGE_ENDPOINT,
            CLAUDE_TOKEN_ENDPOINT,
        )
    }

    /// Client with explicit store and endpoints (tests).
    #[must_use]
    pub fn with_endpoints(
        http: reqwest::Client,
        store: CredentialStore,
        usage_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            store,
            usage_url: usage_url.into(),
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
            let refresh_token = credential.refresh_token.as_deref().unwrap_or_default();
            let refreshed = TokenRefresher::new(self.http.clone())
                .refresh_claude(refresh_token, &self.token_url)
                .await
                .map_err(|_| QpaceError::TokenExpired { provider: PROVIDER })?;
            // Used for this call only; the credential file stays untouched.
            access_token = refreshed.access_token;
        }

        let response = self
            .http
            .get(&self.usage_url)
            .bearer_auth(&access_token)
            .header("anthropic-beta", BETA_HEADER)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| map_request_error(&e, DEFAULT_TIMEOUT))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            // We refresh proactively above, so a 401 here means the grant
            // itself is gone; no point retrying.
            return Err(QpaceError::Unauthorized { provider: PROVIDER });
        }
        if !status.is_success() {
            return Err(QpaceError::Network(format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| QpaceError::Network(e.to_string()))?;
        Ok(parse_usage(&body))
    }
}

#[async_trait]
impl UsageFetcher for ClaudeClient {
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

/// Parse the usage response body. Pure; malformed JSON becomes an error
/// snapshot and missing windows are simply absent.
#[must_use]
pub fn parse_usage(raw: &str) -> UsageData {
    let Ok(json) = serde_json::from_str::<Value>(raw) else {
        return UsageData::from_error(PROVIDER, "Failed to parse response");
    };

    let session = json
        .get("five_hour")
        .and_then(|w| parse_window(w, FIVE_HOUR_MINUTES));
    let weekly = json
        .get("seven_day")
        .and_then(|w| parse_window(w, SEVEN_DAY_MINUTES));
    // The model-tier window shows up under one of two names; sonnet wins
    // when both are present.
    let tertiary = json
        .get("seven_day_sonnet")
        .or_else(|| json.get("seven_day_opus"))
        .and_then(|w| parse_window(w, SEVEN_DAY_MINUTES));

    UsageData {
        session,
        weekly,
        tertiary,
        ..UsageData::new(PROVIDER)
    }
}

/// One named window: `utilization` is a 0..1 fraction, `resets_at` ISO-8601.
fn parse_window(value: &Value, window_minutes: i32) -> Option<UsageWindow> {
    let utilization = value.get("utilization")?.as_f64()?;

    let reset_at = value
        .get("resets_at")
        .and_then(Value::as_str)
        .and_then(parse_timestamp);

    #[allow(clippy::cast_possible_truncation)]
    let used = (utilization * 100.0).round() as i32;

    Some(UsageWindow {
        used,
        limit: 100,
        window_minutes,
        reset_at,
        reset_in: None,
    })
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "five_hour": {
            "utilization": 0.35,
            "resets_at": "2026-03-03T18:00:00Z"
        },
        "seven_day": {
            "utilization": 0.62,
            "resets_at": "2026-03-09T01:00:00Z"
        },
        "seven_day_sonnet": {
            "utilization": 0.12,
            "resets_at": "2026-03-09T01:00:00Z"
        }
    }"#;

    #[test]
    fn parses_all_three_windows() {
        let data = parse_usage(FIXTURE);
        assert!(!data.has_error());

        let session = data.session.expect("session");
        assert_eq!(session.used, 35);
        assert_eq!(session.window_minutes, 300);
        assert_eq!(
            session.reset_at.unwrap().to_rfc3339(),
            "2026-03-03T18:00:00+00:00"
        );

        let weekly = data.weekly.expect("weekly");
        assert_eq!(weekly.used, 62);
        assert_eq!(weekly.window_minutes, 10_080);

        let tertiary = data.tertiary.expect("tertiary");
        assert_eq!(tertiary.used, 12);
    }

    #[test]
    fn sonnet_wins_over_opus() {
        let raw = r#"{
            "seven_day_sonnet": {"utilization": 0.40},
            "seven_day_opus": {"utilization": 0.90}
        }"#;
        let data = parse_usage(raw);
        assert_eq!(data.tertiary.expect("tertiary").used, 40);
    }

    #[test]
    fn opus_used_when_sonnet_absent() {
        let raw = r#"{"seven_day_opus": {"utilization": 0.90}}"#;
        let data = parse_usage(raw);
        assert_eq!(data.tertiary.expect("tertiary").used, 90);
    }

    #[test]
    fn utilization_is_rounded() {
        let raw = r#"{"five_hour": {"utilization": 0.456}}"#;
        let data = parse_usage(raw);
        assert_eq!(data.session.expect("session").used, 46);
    }

    #[test]
    fn missing_windows_stay_absent() {
        let data = parse_usage("{}");
        assert!(!data.has_error());
        assert!(data.session.is_none());
        assert!(data.weekly.is_none());
        assert!(data.tertiary.is_none());
    }

    #[test]
    fn window_without_utilization_is_skipped() {
        let raw = r#"{"five_hour": {"resets_at": "2026-03-03T18:00:00Z"}}"#;
        let data = parse_usage(raw);
        assert!(data.session.is_none());
    }

    #[test]
    fn invalid_reset_timestamp_is_dropped() {
        let raw = r#"{"five_hour": {"utilization": 0.2, "resets_at": "soon"}}"#;
        let data = parse_usage(raw);
        let session = data.session.expect("session");
        assert_eq!(session.used, 20);
        assert!(session.reset_at.is_none());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        for raw in ["", "not json", "{\"five_hour\":"] {
            let data = parse_usage(raw);
            assert_eq!(data.error.as_deref(), Some("Failed to parse response"));
        }
    }
}
