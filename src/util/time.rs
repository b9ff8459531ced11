//! Time formatting utilities.

use chrono::{DateTime, Utc};

/// Compact countdown to a reset time: "2d 3h", "3h 5m", "45m", "now".
#[must_use]
pub fn format_reset_in(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let left = target.signed_duration_since(now);

    if left.num_seconds() <= 0 {
        return "now".to_string();
    }

    let days = left.num_days();
    let hours = left.num_hours();
    let minutes = left.num_minutes();

    if days >= 1 {
        format!("{days}d {}h", hours - days * 24)
    } else if hours >= 1 {
        format!("{hours}h {}m", minutes - hours * 60)
    } else {
        format!("{minutes}m")
    }
}
