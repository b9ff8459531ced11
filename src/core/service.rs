//! Usage orchestration.
//!
//! Fans out to all enabled providers, isolates per-provider failures, and
//! assembles the canonical result list. Fetches run concurrently because
//! providers share no mutable state; each one is wrapped in its own bounded
//! timeout. One failing provider never prevents the others' results.

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use tokio::time::timeout;

use crate::core::http::build_client;
use crate::core::models::{UsageData, UsageWindow};
use crate::core::provider::ProviderId;
use crate::error::{QpaceError, Result};
use crate::providers::{FetcherRegistry, default_registry};
use crate::storage::settings::AppSettings;

// =============================================================================
// Usage Service
// =============================================================================

pub struct UsageService {
    settings: AppSettings,
    fetchers: FetcherRegistry,
}

impl UsageService {
    /// Service with the real provider fetchers.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed.
    pub fn new(settings: AppSettings) -> Result<Self> {
        let http = build_client(std::time::Duration::from_secs(
            settings.http_timeout_seconds,
        ))?;
        let fetchers = default_registry(&http);
        Ok(Self { settings, fetchers })
    }

    /// Service with an explicit fetcher registry (tests).
    #[must_use]
    pub const fn with_fetchers(settings: AppSettings, fetchers: FetcherRegistry) -> Self {
        Self { settings, fetchers }
    }

    /// Fetch usage for a single provider named by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`QpaceError::InvalidProvider`] for ids outside the allowed
    /// set — the one fail-fast path. Fetch failures are carried inside the
    /// returned `UsageData`.
    pub async fn get_usage(&self, provider: &str) -> Result<UsageData> {
        let id = ProviderId::parse(provider)?;
        Ok(self.fetch_one(id).await)
    }

    /// Fetch usage for every enabled provider, in configured display order.
    pub async fn get_all_usage(&self) -> Vec<UsageData> {
        let enabled = self.settings.enabled_providers();
        tracing::debug!(count = enabled.len(), "polling providers");
        join_all(enabled.into_iter().map(|id| self.fetch_one(id))).await
    }

    async fn fetch_one(&self, id: ProviderId) -> UsageData {
        if self.settings.developer_mode_enabled {
            return sample_usage(id, Utc::now());
        }

        let Some(fetcher) = self.fetchers.get(&id) else {
            // Unreachable with the default registry; kept so a partial test
            // registry degrades the same way a provider failure does.
            return UsageData::from_error(id, format!("Unknown provider: {id}"));
        };

        let limit = id.default_timeout();
        match timeout(limit, fetcher.fetch_usage()).await {
            Ok(data) => data,
            Err(_) => {
                tracing::warn!(provider = %id, seconds = limit.as_secs(), "fetch timed out");
                UsageData::from_error(id, QpaceError::Timeout(limit.as_secs()).user_message())
            }
        }
    }
}

// =============================================================================
// Sample Mode
// =============================================================================

/// Deterministic synthetic usage for offline development. Values are stable
/// per provider so the rendering keeps the same shape between refreshes.
#[must_use]
pub fn sample_usage(id: ProviderId, now: DateTime<Utc>) -> UsageData {
    let (session_used, weekly_used, session_hours, weekly_days) = match id {
        ProviderId::Claude => (35, 40, 6, 2),
        ProviderId::Codex => (45, 30, 8, 3),
        ProviderId::Gemini => (25, 20, 4, 1),
    };

    let session = UsageWindow {
        used: session_used,
        limit: 100,
        window_minutes: 180,
        reset_at: Some(now + Duration::hours(session_hours)),
        reset_in: None,
    };

    let weekly = UsageWindow {
        used: weekly_used,
        limit: 100,
        window_minutes: 10_080,
        reset_at: Some(now + Duration::days(weekly_days)),
        reset_in: None,
    };

    let tertiary = (id == ProviderId::Claude).then(|| UsageWindow {
        used: 60,
        limit: 100,
        window_minutes: 10_080,
        reset_at: Some(now + Duration::days(4)),
        reset_in: None,
    });

    UsageData {
        session: Some(session),
        weekly: Some(weekly),
        tertiary,
        ..UsageData::new(id)
    }
}

// =============================================================================
// Tests
// =============================================================================
