//! Formatting helpers shared by the CLI views.

use chrono::{DateTime, Utc};

/// Format a timestamp as relative time (e.g., "2m ago").
pub fn format_relative_time(ts: DateTime<Utc>) -> String {
    let now = Utc::now();
    let duration = now.signed_duration_since(ts);

    if duration.num_seconds() < 0 {
        "just now".to_string()
    } else if duration.num_seconds() < 60 {
        format!("{}s ago", duration.num_seconds())
    } else if duration.num_minutes() < 60 {
        format!("{}m ago", duration.num_minutes())
    } else if duration.num_hours() < 24 {
        format!("{}h ago", duration.num_hours())
    } else if duration.num_days() < 7 {
        format!("{}d ago", duration.num_days())
    } else {
        ts.format("%b %d").to_string()
    }
}

/// Format an optional timestamp as relative time, or "never" if missing.
pub fn format_relative_time_opt(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(ts) => format_relative_time(ts),
        None => "never".to_string(),
    }
}

/// Compact token count: 950, 14.2K, 3.1M.
pub fn format_tokens(tokens: u64) -> String {
    if tokens >= 1_000_000 {
        format!("{:.1}M", tokens as f64 / 1_000_000.0)
    } else if tokens >= 1_000 {
        format!("{:.1}K", tokens as f64 / 1_000.0)
    } else {
        tokens.to_string()
    }
}

/// USD with four decimals below a dollar, two above.
pub fn format_usd(amount: f64) -> String {
    if amount.abs() < 1.0 {
        format!("${:.4}", amount)
    } else {
        format!("${:.2}", amount)
    }
}

/// Human duration: "42.0s", "1m 05s", "2h 03m".
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0.0s".to_string();
    }
    if seconds < 60.0 {
        return format!("{:.1}s", seconds);
    }

    let total = seconds.round() as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else {
        format!("{}m {:02}s", minutes, secs)
    }
}

/// Percentage of a 0..=1 ratio, e.g. "66.7%".
pub fn format_percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

/// Fixed-width text progress bar: `[#####-----]`.
///
/// A zero `total` renders a full bar (top level reached).
pub fn progress_bar(current: u64, total: u64, width: usize) -> String {
    let filled = if total == 0 {
        width
    } else {
        ((current.min(total) as f64 / total as f64) * width as f64).round() as usize
    };
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_relative_time() {
        let now = Utc::now();
        assert_eq!(format_relative_time(now + Duration::seconds(30)), "just now");
        assert_eq!(format_relative_time(now - Duration::minutes(5)), "5m ago");
        assert_eq!(format_relative_time(now - Duration::hours(3)), "3h ago");
        assert_eq!(format_relative_time(now - Duration::days(2)), "2d ago");
        assert_eq!(format_relative_time_opt(None), "never");
    }

    #[test]
    fn test_tokens() {
        assert_eq!(format_tokens(950), "950");
        assert_eq!(format_tokens(1500), "1.5K");
        assert_eq!(format_tokens(14_200), "14.2K");
        assert_eq!(format_tokens(3_100_000), "3.1M");
    }

    #[test]
    fn test_usd() {
        assert_eq!(format_usd(0.0105), "$0.0105");
        assert_eq!(format_usd(12.5), "$12.50");
    }

    #[test]
    fn test_duration() {
        assert_eq!(format_duration(42.0), "42.0s");
        assert_eq!(format_duration(65.0), "1m 05s");
        assert_eq!(format_duration(7380.0), "2h 03m");
        assert_eq!(format_duration(-1.0), "0.0s");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0, 50, 10), "[----------]");
        assert_eq!(progress_bar(25, 50, 10), "[#####-----]");
        assert_eq!(progress_bar(80, 50, 10), "[##########]");
        assert_eq!(progress_bar(0, 0, 4), "[####]");
        assert_eq!(format_percent(2.0 / 3.0), "66.7%");
    }
}
