//! Formatting helpers for the card

use chrono::{DateTime, Utc};

/// Milliseconds as `m:ss`, truncating to whole seconds
pub fn format_duration(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{}:{:02}", minutes, seconds)
}

/// Coarse "time ago" for a scrobble timestamp
pub fn format_played_at(played_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - played_at).num_minutes();
    match minutes {
        i64::MIN..=0 => "just now".to_string(),
        1..=59 => format!("{} min ago", minutes),
        60..=1439 => format!("{} h ago", minutes / 60),
        _ => played_at.format("%b %-d").to_string(),
    }
}

pub fn truncate_string(s: &str, max_width: usize) -> String {
    if s.chars().count() > max_width {
        let truncated: String = s.chars().take(max_width.saturating_sub(3)).collect();
        format!("{}...", truncated)
    } else {
        s.to_string()
    }
}
