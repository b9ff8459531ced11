//! Credential snapshot type.

use chrono::{DateTime, Utc};

/// A provider credential as read from disk or returned by a token refresh.
///
/// Owned exclusively by the fetch attempt that loaded it; this crate never
/// writes credentials back (the files belong to the provider CLIs that
/// created them).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// A credential with no refresh token and no expiry (API keys).
    #[must_use]
    pub const fn new(access_token: String) -> Self {
        Self {
            access_token,
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Whether the credential has expired. Credentials without a recorded
    /// expiry never expire from this crate's point of view.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Whether an expired credential can be refreshed over HTTP.
    #[must_use]
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}
