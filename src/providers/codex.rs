//! Codex (OpenAI) provider.
//!
//! Codex credentials carry no recorded expiry and there is no public token
//! endpoint to refresh them, so there is no proactive refresh here. When the
//! usage endpoint rejects the token, the fetcher runs the codex CLI with a
//! no-op argument — the CLI refreshes its own credentials as a side effect —
//! then reloads the file and retries the fetch exactly once.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::UsageFetcher;
use crate::auth::CredentialStore;
use crate::core::cli_runner::{CLI_TIMEOUT, run_command};
use crate::core::http::{DEFAULT_TIMEOUT, map_request_error};
use crate::core::models::{UsageData, UsageWindow};
use crate::core::provider::ProviderId;
use crate::error::{QpaceError, Result};

/// Usage endpoint.
pub const USAGE_ENDPOINT: &str = "https://chatgpt.com/backend-api/wham/usage";

const PROVIDER: ProviderId = ProviderId::Codex;

// =============================================================================
// Client
// =============================================================================

pub struct CodexClient {
    http: reqwest::Client,
    store: CredentialStore,
    usage_url: String,
    /// Binary invoked to trigger the CLI's internal token refresh.
    cli_bin: String,
}

impl CodexClient {
    /// Client against the production endpoint.
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_endpoints(http, CredentialStore::new(), USAGE_ENDPOINT, "codex")
    }

    /// Client with explicit store, endpoint, and recovery binary (tests).
    #[must_use]
    pub fn with_endpoints(
        http: reqwest::Client,
        store: CredentialStore,
        usage_url: impl Into<String>,
        cli_bin: impl Into<String>,
    ) -> Self {
        Self {
            http,
            store,
            usage_url: usage_url.into(),
            cli_bin: cli_bin.into(),
        }
    }

    async fn try_fetch(&self) -> Result<UsageData> {
        let credential = self
            .store
            .load(PROVIDER)
            .await
            .ok_or(QpaceError::CredentialsMissing { provider: PROVIDER })?;

        match self.request(&credential.access_token).await {
            // Retry-once recovery: trigger the CLI's refresh, reload the
            // rotated credential from disk, attempt again, then give up.
            Err(QpaceError::Unauthorized { .. }) => {
                if self.try_cli_refresh().await {
                    if let Some(reloaded) = self.store.load(PROVIDER).await {
                        return self.request(&reloaded.access_token).await;
                    }
                }
                Err(QpaceError::Unauthorized { provider: PROVIDER })
            }
            other => other,
        }
    }

    async fn request(&self, access_token: &str) -> Result<UsageData> {
        let response = self
            .http
            .get(&self.usage_url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| map_request_error(&e, DEFAULT_TIMEOUT))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
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

    /// Run the CLI with a trivial argument so it refreshes its stored
    /// tokens. Exit code 0 means the refresh likely happened.
    async fn try_cli_refresh(&self) -> bool {
        if which::which(&self.cli_bin).is_err() {
            tracing::debug!(bin = %self.cli_bin, "codex CLI not installed, skipping re-auth");
            return false;
        }

        match run_command(&self.cli_bin, &["--version"], CLI_TIMEOUT).await {
            Ok(output) => output.success(),
            Err(e) => {
                tracing::debug!(error = %e, "codex CLI refresh attempt failed");
                false
            }
        }
    }
}

#[async_trait]
impl UsageFetcher for CodexClient {
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

    let rate_limit = json.get("rate_limit");
    let session = rate_limit
        .and_then(|rl| rl.get("primary_window"))
        .and_then(parse_window);
    let weekly = rate_limit
        .and_then(|rl| rl.get("secondary_window"))
        .and_then(parse_window);

    UsageData {
        session,
        weekly,
        ..UsageData::new(PROVIDER)
    }
}

/// One window snapshot: `used_percent` already 0..100, `reset_at` epoch
/// seconds, `limit_window_seconds` converted to minutes (0 when absent).
fn parse_window(value: &Value) -> Option<UsageWindow> {
    let used_percent = value.get("used_percent")?.as_f64()?;

    let reset_at = value
        .get("reset_at")
        .and_then(Value::as_i64)
        .and_then(epoch_seconds);

    #[allow(clippy::cast_possible_truncation)]
    let window_minutes = value
        .get("limit_window_seconds")
        .and_then(Value::as_i64)
        .map_or(0, |secs| (secs / 60) as i32);

    #[allow(clippy::cast_possible_truncation)]
    let used = used_percent.round() as i32;

    Some(UsageWindow {
        used,
        limit: 100,
        window_minutes,
        reset_at,
        reset_in: None,
    })
}

fn epoch_seconds(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "plan_type": "plus",
        "rate_limit": {
            "primary_window": {
                "used_percent": 45,
                "reset_at": 1772524800,
                "limit_window_seconds": 18000
            },
            "secondary_window": {
                "used_percent": 30,
                "reset_at": 1772784000,
                "limit_window_seconds": 604800
            }
        }
    }"#;

    #[test]
    fn parses_both_windows() {
        let data = parse_usage(FIXTURE);
        assert!(!data.has_error());

        let session = data.session.expect("session");
        assert_eq!(session.used, 45);
        assert_eq!(session.window_minutes, 300);
        assert_eq!(session.reset_at.unwrap().timestamp(), 1_772_524_800);

        let weekly = data.weekly.expect("weekly");
        assert_eq!(weekly.used, 30);
        assert_eq!(weekly.window_minutes, 10_080);
        assert!(data.tertiary.is_none());
    }

    #[test]
    fn missing_rate_limit_yields_empty_snapshot() {
        let data = parse_usage(r#"{"plan_type": "plus"}"#);
        assert!(!data.has_error());
        assert!(data.session.is_none());
        assert!(data.weekly.is_none());
    }

    #[test]
    fn window_without_used_percent_is_skipped() {
        let raw = r#"{"rate_limit": {"primary_window": {"reset_at": 1772524800}}}"#;
        let data = parse_usage(raw);
        assert!(data.session.is_none());
    }

    #[test]
    fn window_length_defaults_to_unknown() {
        let raw = r#"{"rate_limit": {"primary_window": {"used_percent": 10}}}"#;
        let data = parse_usage(raw);
        let session = data.session.expect("session");
        assert_eq!(session.window_minutes, 0);
        assert!(session.reset_at.is_none());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        for raw in ["", "<!DOCTYPE html>", "{\"rate_limit\""] {
            let data = parse_usage(raw);
            assert_eq!(data.error.as_deref(), Some("Failed to parse response"));
        }
    }
}
