//! Command-line interface.

use chrono::Utc;
use clap::Parser;

use crate::core::UsageService;
use crate::error::Result;
use crate::render;
use crate::storage::settings::AppSettings;

/// Quota pace tracker for AI coding assistants.
///
/// Polls usage for the configured providers once and prints how much quota
/// is left plus the fair-pace budget for today.
#[derive(Debug, Parser)]
#[command(name = "qpace", version, about)]
pub struct Args {
    /// Poll only these providers (claude, codex, gemini); repeatable.
    /// Defaults to the enabled providers from settings.
    #[arg(short, long = "provider", value_name = "ID")]
    pub providers: Vec<String>,

    /// Emit the canonical usage list as JSON instead of the table.
    #[arg(long)]
    pub json: bool,

    /// Use deterministic sample data; no network or credential access.
    #[arg(long)]
    pub sample: bool,

    /// Override the HTTP timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Verbose logging to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Run a single poll and print the result.
///
/// # Errors
///
/// Returns an error for invalid provider ids (before any fetch starts) or
/// if output serialization fails. Per-provider fetch failures are part of
/// the rendered result, not errors.
pub async fn run(args: Args) -> Result<()> {
    let mut settings = AppSettings::load();
    if args.sample {
        settings.developer_mode_enabled = true;
    }
    if let Some(timeout) = args.timeout {
        settings.http_timeout_seconds = timeout.max(1);
    }
    let work_day_start_hour = settings.work_day_start_hour;

    let service = UsageService::new(settings)?;

    let results = if args.providers.is_empty() {
        service.get_all_usage().await
    } else {
        let mut out = Vec::with_capacity(args.providers.len());
        for provider in &args.providers {
            out.push(service.get_usage(provider).await?);
        }
        out
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print!(
            "{}",
            render::render_usage(&results, work_day_start_hour, Utc::now())
        );
    }

    Ok(())
}
