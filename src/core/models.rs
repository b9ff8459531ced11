//! Canonical usage data model.
//!
//! Every provider's response is normalized into [`UsageData`] /
//! [`UsageWindow`]; nothing provider-specific crosses this boundary.
//! Instances are created fresh on every poll and never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::budget;
use super::provider::ProviderId;
use crate::util::time::format_reset_in;

// =============================================================================
// Usage Window
// =============================================================================

/// A quota window (session, weekly, etc.).
///
/// # Fields
/// - `used`: consumed share of the window, normalized to 0..100.
/// - `limit`: always 100 in practice; kept explicit so `percent()` can guard.
/// - `window_minutes`: cycle length in minutes, 0 when unknown.
/// - `reset_at`: when the window resets, if the provider reported it.
/// - `reset_in`: provider-supplied reset description, used when `reset_at`
///   is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageWindow {
    pub used: i32,

    pub limit: i32,

    pub window_minutes: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_in: Option<String>,
}

impl UsageWindow {
    /// Create a window with the given used share and an unknown cycle length.
    #[must_use]
    pub const fn new(used: i32) -> Self {
        Self {
            used,
            limit: 100,
            window_minutes: 0,
            reset_at: None,
            reset_in: None,
        }
    }

    /// Used percentage, guarded against a zero limit.
    #[must_use]
    pub fn percent(&self) -> f64 {
        if self.limit > 0 {
            f64::from(self.used) / f64::from(self.limit) * 100.0
        } else {
            0.0
        }
    }

    /// Percentage remaining in this window.
    #[must_use]
    pub fn remaining_percent(&self) -> f64 {
        (100.0 - self.percent()).max(0.0)
    }

    /// Time left until the window resets, negative if already past.
    #[must_use]
    pub fn time_until_reset(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.reset_at.map(|at| at.signed_duration_since(now))
    }

    /// Short reset countdown for display ("2d 3h", "45m", "now").
    ///
    /// Falls back to the provider-supplied `reset_in` text, then to empty.
    #[must_use]
    pub fn reset_in_text(&self, now: DateTime<Utc>) -> String {
        self.reset_at.map_or_else(
            || self.reset_in.clone().unwrap_or_default(),
            |at| format_reset_in(at, now),
        )
    }

    /// Fair-pace budget for the current work day; see [`budget::daily_budget`].
    #[must_use]
    pub fn daily_budget(&self, start_hour: u32, now: DateTime<Utc>) -> Option<f64> {
        let reset_at = self.reset_at?;
        budget::daily_budget(
            self.percent(),
            self.window_minutes,
            reset_at.naive_utc(),
            start_hour,
            now.naive_utc(),
        )
    }

    /// Daily budget formatted for display, e.g. `(14.3%)`; empty when there
    /// is no meaningful budget.
    #[must_use]
    pub fn daily_budget_text(&self, start_hour: u32, now: DateTime<Utc>) -> String {
        self.daily_budget(start_hour, now)
            .map_or_else(String::new, |b| format!("({b:.1}%)"))
    }
}

// =============================================================================
// Usage Data
// =============================================================================

/// Complete usage snapshot for one provider, or the error that replaced it.
///
/// Exactly one of {populated windows, error} is meaningful per fetch; both
/// may be absent only when the provider reported nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageData {
    pub provider: ProviderId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<UsageWindow>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly: Option<UsageWindow>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tertiary: Option<UsageWindow>,

    pub fetched_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UsageData {
    /// Create an empty snapshot for a provider, stamped now.
    #[must_use]
    pub fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            plan: None,
            session: None,
            weekly: None,
            tertiary: None,
            fetched_at: Utc::now(),
            error: None,
        }
    }

    /// Create a failed snapshot carrying only an error message.
    #[must_use]
    pub fn from_error(provider: ProviderId, message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::new(provider)
        }
    }

    /// Whether this fetch failed.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }

    /// Labeled windows in display order, skipping absent ones.
    #[must_use]
    pub fn windows(&self) -> Vec<(&'static str, &UsageWindow)> {
        let mut out = Vec::new();
        if let Some(w) = &self.session {
            out.push((self.provider.session_label(), w));
        }
        if let Some(w) = &self.weekly {
            out.push((self.provider.weekly_label(), w));
        }
        if let Some(w) = &self.tertiary {
            out.push((self.provider.tertiary_label(), w));
        }
        out
    }
}
