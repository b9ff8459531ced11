//! Core domain: provider identities, the canonical usage model, the budget
//! calculation, and the orchestration service.

pub mod budget;
pub mod cli_runner;
pub mod http;
pub mod logging;
pub mod models;
pub mod provider;
pub mod service;

pub use models::{UsageData, UsageWindow};
pub use provider::ProviderId;
pub use service::UsageService;
