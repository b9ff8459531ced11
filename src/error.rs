//! Error types for qpace.
//!
//! Uses `thiserror` for structured error types. Errors raised while fetching
//! a provider are converted into the human-readable string carried on that
//! provider's `UsageData.error` via [`QpaceError::user_message`]; they are
//! never propagated past the fetch boundary. The one fail-fast exception is
//! [`QpaceError::InvalidProvider`], which is a precondition violation raised
//! before any fetch starts.

use thiserror::Error;

use crate::core::provider::ProviderId;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Credential and token issues (missing, expired, rejected).
    Authentication,
    /// Connection, timeout, or transport issues.
    Network,
    /// Provider responses we could not make sense of.
    Provider,
    /// Invalid input or settings.
    Configuration,
    /// Bugs, I/O faults, and everything unclassified.
    Internal,
}

impl ErrorCategory {
    /// Human-readable description of the category.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Authentication => "Authentication error",
            Self::Network => "Network error",
            Self::Provider => "Provider error",
            Self::Configuration => "Configuration error",
            Self::Internal => "Internal error",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success (including polls where individual providers failed).
    Success = 0,
    /// Unexpected failure.
    GeneralError = 1,
    /// Invalid input (unknown provider id, malformed settings).
    UsageError = 3,
    /// Timeout.
    Timeout = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as Self
    }
}

// =============================================================================
// Error Type
// =============================================================================

/// Main error type for qpace operations.
#[derive(Error, Debug)]
pub enum QpaceError {
    /// Provider id outside the allowed set. Fail-fast precondition violation.
    #[error("invalid provider: '{0}'")]
    InvalidProvider(String),

    /// No credential file (or no usable credential in it) for the provider.
    #[error("credentials not found for {provider}")]
    CredentialsMissing { provider: ProviderId },

    /// Credential expired and could not be refreshed.
    #[error("token expired for {provider}")]
    TokenExpired { provider: ProviderId },

    /// The token endpoint rejected the refresh attempt.
    #[error("token refresh failed for {provider}")]
    RefreshFailed { provider: ProviderId },

    /// The usage endpoint rejected our token (after refresh, where applicable).
    #[error("unauthorized for {provider}")]
    Unauthorized { provider: ProviderId },

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// Request exceeded its bounded timeout.
    #[error("request timeout after {0} seconds")]
    Timeout(u64),

    /// Provider response body could not be parsed.
    #[error("failed to parse response: {0}")]
    ParseResponse(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl QpaceError {
    /// Returns the error category for classification and logging.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::CredentialsMissing { .. }
            | Self::TokenExpired { .. }
            | Self::RefreshFailed { .. }
            | Self::Unauthorized { .. } => ErrorCategory::Authentication,

            Self::Network(_) | Self::Timeout(_) => ErrorCategory::Network,

            Self::ParseResponse(_) => ErrorCategory::Provider,

            Self::InvalidProvider(_) => ErrorCategory::Configuration,

            Self::Io(_) | Self::Json(_) | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Map to a process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidProvider(_) => ExitCode::UsageError,
            Self::Timeout(_) => ExitCode::Timeout,
            _ => ExitCode::GeneralError,
        }
    }

    /// The message shown in place of usage bars when a fetch fails.
    ///
    /// Auth errors name the provider CLI to run so the fix is copy-paste
    /// ready; everything else gets a short diagnostic.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::CredentialsMissing { provider } => format!(
                "Credentials not found. Run `{}` to authenticate.",
                provider.cli_name()
            ),
            Self::TokenExpired { provider } | Self::RefreshFailed { provider } => format!(
                "Token expired. Run `{}` to re-authenticate.",
                provider.cli_name()
            ),
            Self::Unauthorized { provider } => format!(
                "Unauthorized. Run `{}` to re-authenticate.",
                provider.cli_name()
            ),
            Self::Network(msg) => format!("Network error: {msg}"),
            Self::Timeout(_) => "Request timed out".to_string(),
            Self::ParseResponse(_) => "Failed to parse response".to_string(),
            other => format!("Error: {other}"),
        }
    }
}

/// Result type alias for qpace operations.
pub type Result<T> = std::result::Result<T, QpaceError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_have_authentication_category() {
        let errors = [
            QpaceError::CredentialsMissing {
                provider: ProviderId::Claude,
            },
            QpaceError::TokenExpired {
                provider: ProviderId::Gemini,
            },
            QpaceError::RefreshFailed {
                provider: ProviderId::Gemini,
            },
            QpaceError::Unauthorized {
                provider: ProviderId::Codex,
            },
        ];
        for err in errors {
            assert_eq!(err.category(), ErrorCategory::Authentication);
        }
    }

    #[test]
    fn network_errors_have_network_category() {
        assert_eq!(
            QpaceError::Network("reset".to_string()).category(),
            ErrorCategory::Network
        );
        assert_eq!(QpaceError::Timeout(10).category(), ErrorCategory::Network);
    }

    #[test]
    fn user_message_names_the_provider_cli() {
        let err = QpaceError::CredentialsMissing {
            provider: ProviderId::Claude,
        };
        assert_eq!(
            err.user_message(),
            "Credentials not found. Run `claude` to authenticate."
        );

        let err = QpaceError::Unauthorized {
            provider: ProviderId::Codex,
        };
        assert_eq!(
            err.user_message(),
            "Unauthorized. Run `codex` to re-authenticate."
        );
    }

    #[test]
    fn refresh_failure_reads_as_token_expired() {
        let expired = QpaceError::TokenExpired {
            provider: ProviderId::Gemini,
        };
        let refused = QpaceError::RefreshFailed {
            provider: ProviderId::Gemini,
        };
        assert_eq!(expired.user_message(), refused.user_message());
    }

    #[test]
    fn timeout_and_parse_messages_are_stable() {
        assert_eq!(QpaceError::Timeout(30).user_message(), "Request timed out");
        assert_eq!(
            QpaceError::ParseResponse("eof".to_string()).user_message(),
            "Failed to parse response"
        );
    }

    #[test]
    fn exit_codes() {
        assert_eq!(
            QpaceError::InvalidProvider("x".to_string()).exit_code(),
            ExitCode::UsageError
        );
        assert_eq!(QpaceError::Timeout(5).exit_code(), ExitCode::Timeout);
        assert_eq!(
            QpaceError::Network("down".to_string()).exit_code(),
            ExitCode::GeneralError
        );
        assert_eq!(i32::from(ExitCode::Success), 0);
    }
}
