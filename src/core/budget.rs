//! Day-anchored fair-pace budget calculation.
//!
//! Quota windows reset infrequently (hours to days). The budget spreads the
//! remaining quota across the cycle's work days so usage paces evenly
//! instead of being exhausted early: day 1 of an N-day cycle allows roughly
//! `100/N`, the final day allows exactly whatever is left, and being ahead
//! of pace yields 0, never a negative number.
//!
//! A "work day" runs from the configured start hour to the same hour on the
//! next calendar date, so late-night usage counts against the evening's day.

use chrono::{Duration, NaiveDateTime, NaiveTime};

/// Default work-day start hour (01:00).
pub const DEFAULT_START_HOUR: u32 = 1;

/// Start of the work day containing `t`.
///
/// If `t` is before the same-date boundary, the day began at `start_hour`
/// on the previous calendar date.
#[must_use]
pub fn day_start(t: NaiveDateTime, start_hour: u32) -> NaiveDateTime {
    let hour = NaiveTime::from_hms_opt(start_hour.min(23), 0, 0).unwrap_or_default();
    let boundary = t.date().and_time(hour);
    if t < boundary {
        boundary - Duration::days(1)
    } else {
        boundary
    }
}

/// Share of the window (in percent points) that is safe to use today.
///
/// Returns `None` when `reset_at` is not in the future of `now` — there is
/// no meaningful budget for an elapsed or unreported cycle.
///
/// With a known cycle length the budget is paced against the whole cycle:
/// today's allowance is the cumulative per-day allowance up to the current
/// cycle day minus what was already used, clamped to `[0, remaining]`. With
/// an unknown length it degrades to an even split of the remaining share
/// over the whole days left until reset.
#[must_use]
pub fn daily_budget(
    percent_used: f64,
    window_minutes: i32,
    reset_at: NaiveDateTime,
    start_hour: u32,
    now: NaiveDateTime,
) -> Option<f64> {
    if reset_at <= now {
        return None;
    }

    let remaining = (100.0 - percent_used).max(0.0);

    if window_minutes > 0 {
        let window_start = reset_at - Duration::minutes(i64::from(window_minutes));
        let cycle_day_start = day_start(window_start, start_hour);
        // The day bucket containing the last instant before reset.
        let cycle_day_end = day_start(reset_at - Duration::nanoseconds(1), start_hour);
        let current_day_start = day_start(now, start_hour).clamp(cycle_day_start, cycle_day_end);

        let total_days = ((cycle_day_end - cycle_day_start).num_days() + 1).max(1);
        let current_day_index = ((current_day_start - cycle_day_start).num_days() + 1).max(1);

        #[allow(clippy::cast_precision_loss)]
        let cumulative_allowed = 100.0 * current_day_index as f64 / total_days as f64;
        return Some((cumulative_allowed - percent_used).clamp(0.0, remaining));
    }

    // Cycle length unknown: split what is left evenly over the days to reset.
    let days_remaining = (reset_at - day_start(now, start_hour)).num_days().max(1);
    #[allow(clippy::cast_precision_loss)]
    let spread = remaining / days_remaining as f64;
    Some(spread)
}
