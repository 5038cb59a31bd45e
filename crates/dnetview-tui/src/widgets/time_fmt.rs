//! Relative time formatting for timestamps in the tree and detail pane.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// "3s ago", "2m 5s ago". Whole seconds only; future or same-second
/// timestamps read as "just now".
pub fn fmt_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds();
    match u64::try_from(secs) {
        Ok(secs) if secs > 0 => {
            format!("{} ago", humantime::format_duration(Duration::from_secs(secs)))
        }
        _ => "just now".into(),
    }
}

/// `fmt_ago` for optional timestamps.
pub fn fmt_ago_opt(then: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    then.map_or_else(|| "never".into(), |t| fmt_ago(t, now))
}

/// Wall-clock time, e.g. "14:03:27".
pub fn fmt_clock(at: DateTime<Utc>) -> String {
    at.format("%H:%M:%S").to_string()
}
