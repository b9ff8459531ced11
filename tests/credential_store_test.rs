//! Credential store tests against real files in temporary home directories.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Utc;
use qpace::auth::CredentialStore;
use qpace::core::provider::ProviderId;
use tempfile::TempDir;

/// Serializes tests that read or write `CODEX_HOME`, which is process-global.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn write(home: &TempDir, rel: &str, contents: &str) -> PathBuf {
    let path = home.path().join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, contents).unwrap();
    path
}

// =============================================================================
// Claude
// =============================================================================

#[tokio::test]
async fn claude_credential_loads_from_home() {
    let home = TempDir::new().unwrap();
    write(
        &home,
        ".claude/.credentials.json",
        r#"{
            "claudeAiOauth": {
                "accessToken": "sk-ant-oat-abc",
                "refreshToken": "sk-ant-ort-def",
                "expiresAt": 4102444800000
            }
        }"#,
    );

    let store = CredentialStore::with_home(home.path());
    let cred = store.load(ProviderId::Claude).await.expect("credential");
    assert_eq!(cred.access_token, "sk-ant-oat-abc");
    assert!(cred.can_refresh());
    assert!(!cred.is_expired(Utc::now()));
}

#[tokio::test]
async fn claude_expired_timestamp_is_detected() {
    let home = TempDir::new().unwrap();
    write(
        &home,
        ".claude/.credentials.json",
        r#"{
            "claudeAiOauth": {
                "accessToken": "sk-ant-oat-abc",
                "refreshToken": "sk-ant-ort-def",
                "expiresAt": 946684800000
            }
        }"#,
    );

    let store = CredentialStore::with_home(home.path());
    let cred = store.load(ProviderId::Claude).await.expect("credential");
    assert!(cred.is_expired(Utc::now()));
}

// =============================================================================
// Codex
// =============================================================================

#[tokio::test]
async fn codex_api_key_form_loads_and_never_expires() {
    let _guard = ENV_LOCK.lock().unwrap();
    let home = TempDir::new().unwrap();
    write(&home, ".codex/auth.json", r#"{"OPENAI_API_KEY": "sk-key"}"#);

    let store = CredentialStore::with_home(home.path());
    let cred = store.load(ProviderId::Codex).await.expect("credential");
    assert_eq!(cred.access_token, "sk-key");
    assert!(!cred.can_refresh());
    assert!(!cred.is_expired(Utc::now()));
}

#[tokio::test]
async fn codex_token_pair_form_loads_without_expiry() {
    let _guard = ENV_LOCK.lock().unwrap();
    let home = TempDir::new().unwrap();
    write(
        &home,
        ".codex/auth.json",
        r#"{"tokens": {"access_token": "at-1", "refresh_token": "rt-1"}}"#,
    );

    let store = CredentialStore::with_home(home.path());
    let cred = store.load(ProviderId::Codex).await.expect("credential");
    assert_eq!(cred.access_token, "at-1");
    assert_eq!(cred.refresh_token.as_deref(), Some("rt-1"));
    assert!(cred.expires_at.is_none());
}

#[test]
#[allow(unsafe_code)]
fn codex_home_env_var_overrides_base_directory() {
    let _guard = ENV_LOCK.lock().unwrap();

    let override_dir = TempDir::new().unwrap();
    std::fs::write(
        override_dir.path().join("auth.json"),
        r#"{"OPENAI_API_KEY": "sk-from-override"}"#,
    )
    .unwrap();
    let empty_home = TempDir::new().unwrap();

    let prior = std::env::var("CODEX_HOME").ok();
    unsafe {
        std::env::set_var("CODEX_HOME", override_dir.path());
    }

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let cred = runtime.block_on(async {
        let store = CredentialStore::with_home(empty_home.path());
        store.load(ProviderId::Codex).await
    });

    unsafe {
        match prior {
            Some(v) => std::env::set_var("CODEX_HOME", v),
            None => std::env::remove_var("CODEX_HOME"),
        }
    }

    let cred = cred.expect("credential from override dir");
    assert_eq!(cred.access_token, "sk-from-override");
}

// =============================================================================
// Gemini
// =============================================================================

#[tokio::test]
async fn gemini_credential_loads_from_home() {
    let home = TempDir::new().unwrap();
    write(
        &home,
        ".gemini/oauth_creds.json",
        r#"{
            "access_token": "ya29.token",
            "refresh_token": "1//refresh",
            "expiry_date": 4102444800000
        }"#,
    );

    let store = CredentialStore::with_home(home.path());
    let cred = store.load(ProviderId::Gemini).await.expect("credential");
    assert_eq!(cred.access_token, "ya29.token");
    assert_eq!(cred.refresh_token.as_deref(), Some("1//refresh"));
}

#[tokio::test]
async fn gemini_oauth_client_scraped_from_first_matching_candidate() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("not-installed/oauth2.js");
    let incomplete = write(&home, "partial/oauth2.js", "const OAUTH_CLIENT_ID = 'only';");
    let full = write(
        &home,
        "install/oauth2.js",
        r#"
            const OAUTH_CLIENT_ID = '12345-abc.apps.googleusercontent.com';
            const OAUTH_CLIENT_SECRET = 'GOCSPX-topsecret';
        "#,
    );

    let store = CredentialStore::with_home(home.path())
        .with_gemini_oauth_paths(vec![missing, incomplete, full]);

    let client = store.gemini_oauth_client().await.expect("client pair");
    assert_eq!(client.client_id, "12345-abc.apps.googleusercontent.com");
    assert_eq!(client.client_secret, "GOCSPX-topsecret");
}

#[tokio::test]
async fn gemini_oauth_client_absent_when_nothing_matches() {
    let home = TempDir::new().unwrap();
    let store = CredentialStore::with_home(home.path())
        .with_gemini_oauth_paths(vec![home.path().join("nope.js")]);
    assert!(store.gemini_oauth_client().await.is_none());
}

// =============================================================================
// Shared failure behavior
// =============================================================================

#[tokio::test]
async fn missing_files_load_as_none_for_every_provider() {
    let _guard = ENV_LOCK.lock().unwrap();
    let home = TempDir::new().unwrap();
    let store = CredentialStore::with_home(home.path());

    for provider in ProviderId::ALL {
        assert!(
            store.load(*provider).await.is_none(),
            "expected None for {provider}"
        );
    }
}

#[tokio::test]
async fn malformed_files_load_as_none_not_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    let home = TempDir::new().unwrap();
    write(&home, ".claude/.credentials.json", "{ broken");
    write(&home, ".codex/auth.json", "[]");
    write(&home, ".gemini/oauth_creds.json", r#"{"access_token": ""}"#);

    let store = CredentialStore::with_home(home.path());
    for provider in ProviderId::ALL {
        assert!(
            store.load(*provider).await.is_none(),
            "expected None for {provider}"
        );
    }
}
