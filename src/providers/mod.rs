//! Provider fetch implementations.
//!
//! Each provider implements [`UsageFetcher`]: load credentials, refresh when
//! possible, call the usage endpoint, and normalize the response. A fetcher
//! always resolves to a [`UsageData`] — failures are carried in its `error`
//! field, never raised past this boundary.

pub mod claude;
pub mod codex;
pub mod gemini;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

pub use claude::ClaudeClient;
pub use codex::CodexClient;
pub use gemini::GeminiClient;

use crate::core::models::UsageData;
use crate::core::provider::ProviderId;

/// The capability shared by all providers.
#[async_trait]
pub trait UsageFetcher: Send + Sync {
    /// Which provider this fetcher serves.
    fn provider_id(&self) -> ProviderId;

    /// Fetch the current usage snapshot. Infallible by contract: every
    /// failure path returns a `UsageData` with `error` set.
    async fn fetch_usage(&self) -> UsageData;
}

/// Mapping from provider id to its fetcher, resolved once at startup.
pub type FetcherRegistry = HashMap<ProviderId, Arc<dyn UsageFetcher>>;

/// Registry with the real fetchers, all sharing one HTTP client.
#[must_use]
pub fn default_registry(http: &Client) -> FetcherRegistry {
    let mut registry: FetcherRegistry = HashMap::new();
    registry.insert(
        ProviderId::Claude,
        Arc::new(ClaudeClient::new(http.clone())),
    );
    registry.insert(ProviderId::Codex, Arc::new(CodexClient::new(http.clone())));
    registry.insert(
        ProviderId::Gemini,
        Arc::new(GeminiClient::new(http.clone())),
    );
    registry
}
