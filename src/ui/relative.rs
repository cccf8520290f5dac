use time::OffsetDateTime;

/// Human description of how long ago `then` was, e.g. "3 hours ago".
pub fn ago(now: OffsetDateTime, then: OffsetDateTime) -> String {
    if then == OffsetDateTime::UNIX_EPOCH {
        return "never requested".to_string();
    }
    let elapsed = now - then;
    let minutes = elapsed.whole_minutes();
    let hours = elapsed.whole_hours();
    let days = elapsed.whole_days();
    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        plural(minutes, "minute")
    } else if hours < 24 {
        plural(hours, "hour")
    } else {
        plural(days, "day")
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("a {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}

/// Cuts `s` to at most `max` characters, ending in "..." when shortened.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use time::Duration;
    use time::macros::datetime;

    use super::*;

    const NOW: OffsetDateTime = datetime!(2024-01-10 16:00 UTC);

    #[test]
    fn ago_picks_a_unit() {
        assert_eq!(ago(NOW, NOW - Duration::seconds(20)), "just now");
        assert_eq!(ago(NOW, NOW - Duration::minutes(1)), "a minute ago");
        assert_eq!(ago(NOW, NOW - Duration::minutes(45)), "45 minutes ago");
        assert_eq!(ago(NOW, NOW - Duration::hours(5)), "5 hours ago");
        assert_eq!(ago(NOW, NOW - Duration::days(3)), "3 days ago");
        assert_eq!(ago(NOW, OffsetDateTime::UNIX_EPOCH), "never requested");
    }

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("short", 60), "short");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        assert_eq!(truncate("ééééé", 4), "é...");
    }
}
