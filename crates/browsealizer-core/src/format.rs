// Little helpers for turning numbers and dates into something readable
use chrono::{DateTime, Utc};

/// "Today", "Yesterday", "3 days ago", "2 weeks ago", "5 months ago", ...
pub fn relative_date(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (now - date).num_days().max(0);

    match days {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=6 => format!("{} days ago", days),
        7..=29 => plural(days / 7, "week"),
        30..=364 => plural(days / 30, "month"),
        _ => plural(days / 365, "year"),
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", n, unit)
    }
}

/// Repository size as GitHub reports it (KB) in the largest sensible unit
pub fn format_size_kb(kb: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    let bytes = kb.saturating_mul(1024);
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    // Two decimals at most, no trailing zeros
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

/// 1234567 -> "1,234,567"
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Short form for tight spots: 950, 1.2k, 48k, 3.1M
pub fn compact_count(n: u64) -> String {
    match n {
        0..=999 => n.to_string(),
        1_000..=9_999 => trim_decimal(n as f64 / 1_000.0, "k"),
        10_000..=999_999 => format!("{}k", n / 1_000),
        _ => trim_decimal(n as f64 / 1_000_000.0, "M"),
    }
}

fn trim_decimal(value: f64, suffix: &str) -> String {
    let s = format!("{:.1}", (value * 10.0).floor() / 10.0);
    let s = s.strip_suffix(".0").unwrap_or(&s);
    format!("{}{}", s, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_relative_date() {
        let now = Utc::now();
        let ago = |days| relative_date(now - Duration::days(days), now);

        assert_eq!(ago(0), "Today");
        assert_eq!(ago(1), "Yesterday");
        assert_eq!(ago(3), "3 days ago");
        assert_eq!(ago(7), "1 week ago");
        assert_eq!(ago(20), "2 weeks ago");
        assert_eq!(ago(45), "1 month ago");
        assert_eq!(ago(300), "10 months ago");
        assert_eq!(ago(365), "1 year ago");
        assert_eq!(ago(800), "2 years ago");
    }

    #[test]
    fn test_future_dates_are_today() {
        let now = Utc::now();
        assert_eq!(relative_date(now + Duration::days(2), now), "Today");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size_kb(0), "0 Bytes");
        assert_eq!(format_size_kb(1), "1 KB");
        assert_eq!(format_size_kb(1536), "1.5 MB");
        assert_eq!(format_size_kb(2 * 1024 * 1024), "2 GB");
    }

    #[test]
    fn test_counts() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1234567), "1,234,567");

        assert_eq!(compact_count(950), "950");
        assert_eq!(compact_count(1000), "1k");
        assert_eq!(compact_count(1250), "1.2k");
        assert_eq!(compact_count(48_700), "48k");
        assert_eq!(compact_count(3_150_000), "3.1M");
    }
}
