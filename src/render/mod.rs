//! Single-shot terminal rendering.
//!
//! Turns the canonical usage list into a plain table: one block per
//! provider with a colored bar, used percent, reset countdown, and the
//! daily-budget figure. A failing provider shows its error text in place of
//! the bars. Output is built as a string so it can be asserted on directly.

use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::core::models::{UsageData, UsageWindow};

/// Width of the usage bar in characters.
const BAR_WIDTH: usize = 20;

/// Render the usage list as a human-readable table.
#[must_use]
pub fn render_usage(results: &[UsageData], work_day_start_hour: u32, now: DateTime<Utc>) -> String {
    let mut out = String::new();

    for data in results {
        out.push_str(&format!("{}\n", data.provider.display_name().bold()));

        if let Some(error) = data.error.as_deref().filter(|e| !e.is_empty()) {
            out.push_str(&format!("  {}\n\n", error.red()));
            continue;
        }

        let windows = data.windows();
        if windows.is_empty() {
            out.push_str("  no usage reported\n\n");
            continue;
        }

        for (label, window) in windows {
            out.push_str(&render_window(label, window, work_day_start_hour, now));
        }
        out.push('\n');
    }

    out
}

fn render_window(
    label: &str,
    window: &UsageWindow,
    work_day_start_hour: u32,
    now: DateTime<Utc>,
) -> String {
    let percent = window.percent();
    let bar = usage_bar(percent);

    let reset = window.reset_in_text(now);
    let reset_text = if reset.is_empty() {
        String::new()
    } else {
        format!("  resets {reset}")
    };

    let budget = window.daily_budget_text(work_day_start_hour, now);
    let budget_text = if budget.is_empty() {
        String::new()
    } else {
        format!("  today {budget}")
    };

    format!("  {label:<8} {bar} {percent:>3.0}%{reset_text}{budget_text}\n")
}

/// A fixed-width bar colored by how close the window is to exhaustion.
fn usage_bar(percent: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);

    let fill = "█".repeat(filled);
    let rest = "░".repeat(BAR_WIDTH - filled);

    let colored_fill = if percent >= 80.0 {
        fill.red()
    } else if percent >= 50.0 {
        fill.yellow()
    } else {
        fill.green()
    };

    format!("{colored_fill}{rest}")
}
