//! Per-provider credential file loading.
//!
//! Each provider CLI stores its tokens at a fixed home-relative path with
//! its own JSON schema. Files are treated as an external read-only data
//! source: nothing is cached across poll cycles (a stale in-process copy
//! would miss tokens rotated by the owning CLI), and a missing, malformed,
//! or incomplete file uniformly loads as "no credential" rather than an
//! error — the fetch layer turns that into "please authenticate".

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;

use super::credentials::Credential;
use crate::core::provider::ProviderId;

/// OAuth client id/secret pair scraped from an installed CLI package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
}

static OAUTH_CLIENT_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"OAUTH_CLIENT_ID\s*=\s*['"]([^'"]+)['"]"#).expect("static pattern")
});
static OAUTH_CLIENT_SECRET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"OAUTH_CLIENT_SECRET\s*=\s*['"]([^'"]+)['"]"#).expect("static pattern")
});

/// Install suffix of the gemini CLI module that carries the OAuth client pair.
const GEMINI_OAUTH_SUFFIX: &str =
    "lib/node_modules/@google/gemini-cli-core/dist/src/code_assist/oauth2.js";

/// Env var overriding the codex base directory.
const CODEX_HOME_ENV: &str = "CODEX_HOME";

// =============================================================================
// File schemas
// =============================================================================

/// `~/.claude/.credentials.json`
#[derive(Debug, Deserialize)]
struct ClaudeCredentialFile {
    #[serde(rename = "claudeAiOauth")]
    claude_ai_oauth: Option<ClaudeOauthSection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClaudeOauthSection {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Epoch milliseconds.
    #[serde(default)]
    expires_at: Option<f64>,
}

/// `$CODEX_HOME/auth.json` or `~/.codex/auth.json`
#[derive(Debug, Deserialize)]
struct CodexAuthFile {
    #[serde(rename = "OPENAI_API_KEY", default)]
    openai_api_key: Option<String>,
    #[serde(default)]
    tokens: Option<CodexTokens>,
}

#[derive(Debug, Deserialize)]
struct CodexTokens {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// `~/.gemini/oauth_creds.json`
#[derive(Debug, Deserialize)]
struct GeminiCredentialFile {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Epoch milliseconds.
    #[serde(default)]
    expiry_date: Option<f64>,
}

// =============================================================================
// Credential Store
// =============================================================================

/// Locates and parses provider credential files.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    home: PathBuf,
    /// Candidate paths for the gemini OAuth client scrape; derived from the
    /// platform when empty.
    gemini_oauth_paths: Vec<PathBuf>,
}

impl CredentialStore {
    /// Store rooted at the user's home directory.
    #[must_use]
    pub fn new() -> Self {
        let home = directories::BaseDirs::new()
            .map_or_else(|| PathBuf::from("."), |d| d.home_dir().to_path_buf());
        Self::with_home(home)
    }

    /// Store rooted at an explicit home directory (tests).
    #[must_use]
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            gemini_oauth_paths: Vec::new(),
        }
    }

    /// Override the gemini OAuth scrape candidates (tests).
    #[must_use]
    pub fn with_gemini_oauth_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.gemini_oauth_paths = paths;
        self
    }

    /// Load the credential for a provider.
    ///
    /// Returns `None` for a missing file, malformed JSON, or a file without
    /// a usable access token — no partial credential is ever returned.
    pub async fn load(&self, provider: ProviderId) -> Option<Credential> {
        let path = self.credentials_path(provider);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(provider = %provider, path = %path.display(), error = %e,
                    "credential file not readable");
                return None;
            }
        };

        match provider {
            ProviderId::Claude => parse_claude(&raw),
            ProviderId::Codex => parse_codex(&raw),
            ProviderId::Gemini => parse_gemini(&raw),
        }
    }

    /// Where a provider's credential file lives.
    #[must_use]
    pub fn credentials_path(&self, provider: ProviderId) -> PathBuf {
        match provider {
            ProviderId::Claude => self.home.join(".claude").join(".credentials.json"),
            ProviderId::Codex => self.codex_dir().join("auth.json"),
            ProviderId::Gemini => self.home.join(".gemini").join("oauth_creds.json"),
        }
    }

    /// Codex base directory, honoring the `CODEX_HOME` override.
    fn codex_dir(&self) -> PathBuf {
        std::env::var(CODEX_HOME_ENV)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map_or_else(|| self.home.join(".codex"), PathBuf::from)
    }

    /// Scrape the gemini OAuth client id/secret from the installed CLI
    /// package sources. First candidate with both values wins; absence is a
    /// normal "cannot refresh" outcome, not an error.
    pub async fn gemini_oauth_client(&self) -> Option<OAuthClient> {
        for path in self.gemini_oauth_candidates() {
            let Ok(content) = tokio::fs::read_to_string(&path).await else {
                continue;
            };
            if let Some(client) = extract_oauth_client(&content) {
                tracing::debug!(path = %path.display(), "found gemini OAuth client pair");
                return Some(client);
            }
        }
        None
    }

    fn gemini_oauth_candidates(&self) -> Vec<PathBuf> {
        if !self.gemini_oauth_paths.is_empty() {
            return self.gemini_oauth_paths.clone();
        }

        let mut candidates = Vec::new();

        // nvm installs, newest node versions first
        let nvm_node = self.home.join(".nvm").join("versions").join("node");
        if let Ok(entries) = std::fs::read_dir(&nvm_node) {
            let mut versions: Vec<PathBuf> = entries
                .filter_map(std::result::Result::ok)
                .map(|e| e.path())
                .collect();
            versions.sort();
            versions.reverse();
            for version in versions {
                candidates.push(version.join(GEMINI_OAUTH_SUFFIX));
            }
        }

        candidates.push(Path::new("/usr/local").join(GEMINI_OAUTH_SUFFIX));
        candidates.push(Path::new("/usr").join(GEMINI_OAUTH_SUFFIX));
        candidates
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Parsing
// =============================================================================

fn parse_claude(raw: &str) -> Option<Credential> {
    let file: ClaudeCredentialFile = serde_json::from_str(raw).ok()?;
    let oauth = file.claude_ai_oauth?;
    let access_token = nonempty(oauth.access_token)?;

    Some(Credential {
        access_token,
        refresh_token: oauth.refresh_token,
        expires_at: oauth.expires_at.and_then(from_epoch_millis),
    })
}

fn parse_codex(raw: &str) -> Option<Credential> {
    let file: CodexAuthFile = serde_json::from_str(raw).ok()?;

    // Flat API key: never expires, nothing to refresh.
    if let Some(key) = nonempty(file.openai_api_key) {
        return Some(Credential::new(key));
    }

    // OAuth token pair: no expiry is recorded, refresh belongs to the codex
    // CLI itself (see the unauthorized fallback in the codex fetcher).
    let tokens = file.tokens?;
    let access_token = nonempty(tokens.access_token)?;
    Some(Credential {
        access_token,
        refresh_token: tokens.refresh_token,
        expires_at: None,
    })
}

fn parse_gemini(raw: &str) -> Option<Credential> {
    let file: GeminiCredentialFile = serde_json::from_str(raw).ok()?;
    let access_token = nonempty(file.access_token)?;

    Some(Credential {
        access_token,
        refresh_token: file.refresh_token,
        expires_at: file.expiry_date.and_then(from_epoch_millis),
    })
}

fn extract_oauth_client(content: &str) -> Option<OAuthClient> {
    let client_id = OAUTH_CLIENT_ID_RE.captures(content)?.get(1)?.as_str();
    let client_secret = OAUTH_CLIENT_SECRET_RE.captures(content)?.get(1)?.as_str();
    Some(OAuthClient {
        client_id: client_id.to_string(),
        client_secret: client_secret.to_string(),
    })
}

fn nonempty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[allow(clippy::cast_possible_truncation)]
fn from_epoch_millis(ms: f64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms as i64)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claude_file_parses_nested_oauth() {
        let raw = r#"{
            "claudeAiOauth": {
                "accessToken": " sk-ant-oat-123 ",
                "refreshToken": "sk-ant-ort-456",
                "expiresAt": 1767225600000
            }
        }"#;
        let cred = parse_claude(raw).expect("credential");
        assert_eq!(cred.access_token, "sk-ant-oat-123");
        assert_eq!(cred.refresh_token.as_deref(), Some("sk-ant-ort-456"));
        assert_eq!(
            cred.expires_at.unwrap().timestamp_millis(),
            1_767_225_600_000
        );
    }

    #[test]
    fn claude_file_without_oauth_section_is_none() {
        assert!(parse_claude(r#"{"numStartups": 3}"#).is_none());
        assert!(parse_claude(r#"{"claudeAiOauth": {"accessToken": ""}}"#).is_none());
    }

    #[test]
    fn codex_flat_api_key_never_expires() {
        let raw = r#"{"OPENAI_API_KEY": "sk-proj-abc"}"#;
        let cred = parse_codex(raw).expect("credential");
        assert_eq!(cred.access_token, "sk-proj-abc");
        assert!(cred.refresh_token.is_none());
        assert!(cred.expires_at.is_none());
    }

    #[test]
    fn codex_token_pair_has_no_recorded_expiry() {
        let raw = r#"{
            "tokens": {
                "access_token": "eyJhb.codex",
                "refresh_token": "rt-codex"
            }
        }"#;
        let cred = parse_codex(raw).expect("credential");
        assert_eq!(cred.access_token, "eyJhb.codex");
        assert_eq!(cred.refresh_token.as_deref(), Some("rt-codex"));
        assert!(cred.expires_at.is_none());
        assert!(!cred.is_expired(Utc::now()));
    }

    #[test]
    fn codex_api_key_wins_over_tokens() {
        let raw = r#"{
            "OPENAI_API_KEY": "sk-key",
            "tokens": {"access_token": "tok"}
        }"#;
        let cred = parse_codex(raw).expect("credential");
        assert_eq!(cred.access_token, "sk-key");
    }

    #[test]
    fn gemini_file_parses_flat_fields() {
        let raw = r#"{
            "access_token": "ya29.google",
            "refresh_token": "1//refresh",
            "expiry_date": 1767225600000
        }"#;
        let cred = parse_gemini(raw).expect("credential");
        assert_eq!(cred.access_token, "ya29.google");
        assert_eq!(cred.refresh_token.as_deref(), Some("1//refresh"));
        assert!(cred.expires_at.is_some());
    }

    #[test]
    fn malformed_json_is_none_for_every_provider() {
        for raw in ["", "not json", "[]", "{\"tokens\": 5}"] {
            assert!(parse_claude(raw).is_none(), "claude accepted {raw:?}");
            assert!(parse_codex(raw).is_none(), "codex accepted {raw:?}");
            assert!(parse_gemini(raw).is_none(), "gemini accepted {raw:?}");
        }
    }

    #[test]
    fn oauth_client_extraction() {
        let src = r#"
            const OAUTH_CLIENT_ID = '681255809395-abc.apps.googleusercontent.com';
            const OAUTH_CLIENT_SECRET = "GOCSPX-secret";
        "#;
        let client = extract_oauth_client(src).expect("client pair");
        assert_eq!(
            client.client_id,
            "681255809395-abc.apps.googleusercontent.com"
        );
        assert_eq!(client.client_secret, "GOCSPX-secret");
    }

    #[test]
    fn oauth_client_requires_both_values() {
        assert!(extract_oauth_client("const OAUTH_CLIENT_ID = 'only-id';").is_none());
        assert!(extract_oauth_client("nothing here").is_none());
    }

    #[test]
    fn credentials_paths_are_home_relative() {
        let store = CredentialStore::with_home("/home/dev");
        assert_eq!(
            store.credentials_path(ProviderId::Claude),
            PathBuf::from("/home/dev/.claude/.credentials.json")
        );
        assert_eq!(
            store.credentials_path(ProviderId::Gemini),
            PathBuf::from("/home/dev/.gemini/oauth_creds.json")
        );
    }
}
