//! Provider identifiers and per-provider metadata.
//!
//! The set of supported providers is closed: every entry point validates
//! incoming ids against it and anything else fails fast.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{QpaceError, Result};

// =============================================================================
// Provider Id
// =============================================================================

/// Supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Claude,
    Codex,
    Gemini,
}

impl ProviderId {
    /// All providers in default display order.
    pub const ALL: &'static [Self] = &[Self::Claude, Self::Codex, Self::Gemini];

    /// CLI name for this provider, also the canonical lowercase id.
    #[must_use]
    pub const fn cli_name(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Codex => "codex",
            Self::Gemini => "gemini",
        }
    }

    /// Display name for human output.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Claude => "Claude",
            Self::Codex => "Codex",
            Self::Gemini => "Gemini",
        }
    }

    /// Validate and normalize a provider id.
    ///
    /// Accepts any casing and surrounding whitespace; anything outside the
    /// allowed set is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`QpaceError::InvalidProvider`] for ids outside the allowed set.
    pub fn parse(input: &str) -> Result<Self> {
        let normalized = input.trim().to_lowercase();
        Self::ALL
            .iter()
            .find(|p| p.cli_name() == normalized)
            .copied()
            .ok_or_else(|| QpaceError::InvalidProvider(input.to_string()))
    }

    /// Whether `input` names a supported provider.
    #[must_use]
    pub fn is_valid(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    /// Bounded timeout for this provider's fetch operation.
    #[must_use]
    pub const fn default_timeout(self) -> Duration {
        match self {
            // Gemini may need a refresh plus a quota call plus the secret scrape
            Self::Gemini => Duration::from_secs(15),
            Self::Claude | Self::Codex => Duration::from_secs(10),
        }
    }

    /// Label for the session (primary) window.
    #[must_use]
    pub const fn session_label(self) -> &'static str {
        match self {
            Self::Gemini => "Pro",
            Self::Claude | Self::Codex => "Session",
        }
    }

    /// Label for the weekly (secondary) window.
    #[must_use]
    pub const fn weekly_label(self) -> &'static str {
        match self {
            Self::Gemini => "Flash",
            Self::Claude | Self::Codex => "Weekly",
        }
    }

    /// Label for the tertiary window.
    #[must_use]
    pub const fn tertiary_label(self) -> &'static str {
        match self {
            Self::Claude => "Sonnet",
            Self::Codex | Self::Gemini => "Additional",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cli_name())
    }
}

impl std::str::FromStr for ProviderId {
    type Err = QpaceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_canonical_ids() {
        assert_eq!(ProviderId::parse("claude").unwrap(), ProviderId::Claude);
        assert_eq!(ProviderId::parse("codex").unwrap(), ProviderId::Codex);
        assert_eq!(ProviderId::parse("gemini").unwrap(), ProviderId::Gemini);
    }

    #[test]
    fn parse_is_case_insensitive_and_trims() {
        assert_eq!(ProviderId::parse("CLAUDE").unwrap(), ProviderId::Claude);
        assert_eq!(ProviderId::parse("  Gemini ").unwrap(), ProviderId::Gemini);
        assert_eq!(ProviderId::parse("\tcodex\n").unwrap(), ProviderId::Codex);
    }

    #[test]
    fn parse_rejects_unknown_ids() {
        for bad in ["", "  ", "cursor", "claud", "claude2", "all"] {
            assert!(
                matches!(ProviderId::parse(bad), Err(QpaceError::InvalidProvider(_))),
                "expected rejection for {bad:?}"
            );
        }
    }

    #[test]
    fn is_valid_matches_parse() {
        assert!(ProviderId::is_valid("Codex"));
        assert!(!ProviderId::is_valid("unknown"));
    }

    #[test]
    fn display_uses_cli_name() {
        assert_eq!(ProviderId::Claude.to_string(), "claude");
    }

    #[test]
    fn window_labels() {
        assert_eq!(ProviderId::Claude.session_label(), "Session");
        assert_eq!(ProviderId::Claude.tertiary_label(), "Sonnet");
        assert_eq!(ProviderId::Gemini.session_label(), "Pro");
        assert_eq!(ProviderId::Gemini.weekly_label(), "Flash");
        assert_eq!(ProviderId::Codex.weekly_label(), "Weekly");
    }

    #[test]
    fn default_timeout_values() {
        assert_eq!(ProviderId::Claude.default_timeout().as_secs(), 10);
        assert_eq!(ProviderId::Codex.default_timeout().as_secs(), 10);
        assert_eq!(ProviderId::Gemini.default_timeout().as_secs(), 15);
    }
}
