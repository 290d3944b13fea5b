//! Number formatting for damage reports and tracker stats.
//!
//! All numeric display formatting in the reporting tools goes through this
//! module so tables and summaries stay consistent.

/// Format a number with thousands separators.
///
/// # Examples
/// ```
/// use bestiary_types::formatting::format_thousands;
/// assert_eq!(format_thousands(0), "0");
/// assert_eq!(format_thousands(600), "600");
/// assert_eq!(format_thousands(1_500), "1,500");
/// assert_eq!(format_thousands(1_500_000), "1,500,000");
/// ```
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

/// Format a large number with K/M suffix for compact display.
///
/// # Examples
/// ```
/// use bestiary_types::formatting::format_compact;
/// assert_eq!(format_compact(500), "500");
/// assert_eq!(format_compact(1_500), "1.50K");
/// assert_eq!(format_compact(1_500_000), "1.50M");
/// ```
pub fn format_compact(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

/// Format a decimal number with the specified precision.
///
/// # Examples
/// ```
/// use bestiary_types::formatting::format_decimal;
/// assert_eq!(format_decimal(412.333, 1), "412.3");
/// assert_eq!(format_decimal(3.0, 0), "3");
/// ```
pub fn format_decimal(n: f64, precision: usize) -> String {
    format!("{:.prec$}", n, prec = precision)
}

/// Format a percentage from count/total with one decimal place.
///
/// Returns `"0%"` if total is zero.
///
/// # Examples
/// ```
/// use bestiary_types::formatting::format_pct_ratio;
/// assert_eq!(format_pct_ratio(3, 10), "30.0%");
/// assert_eq!(format_pct_ratio(0, 0), "0%");
/// ```
pub fn format_pct_ratio(count: usize, total: usize) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    format!("{:.1}%", count as f64 / total as f64 * 100.0)
}

/// Format an age in seconds as `M:SS`, or `H:MM:SS` past one hour.
///
/// Negative ages (clock skew) render as `0:00`.
///
/// # Examples
/// ```
/// use bestiary_types::formatting::format_age;
/// assert_eq!(format_age(125), "2:05");
/// assert_eq!(format_age(3_725), "1:02:05");
/// assert_eq!(format_age(-4), "0:00");
/// ```
pub fn format_age(secs: i64) -> String {
    let secs = secs.max(0);
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}
