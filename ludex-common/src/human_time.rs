//! Human-readable duration formatting
//!
//! Shared by every Ludex service that renders elapsed/remaining time in
//! progress output; one formatter keeps the display uniform.

/// Format a duration in seconds as `M:SS`, `H:MM:SS` or `Dd H:MM:SS`
///
/// # Examples
///
/// ```
/// use ludex_common::human_time::format_duration;
///
/// assert_eq!(format_duration(45), "0:45");
/// assert_eq!(format_duration(330), "5:30");
/// assert_eq!(format_duration(3661), "1:01:01");
/// assert_eq!(format_duration(90000), "1d 1:00:00");
/// ```
pub fn format_duration(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}d {}:{:02}:{:02}", days, hours, mins, secs)
    } else if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

/// Format an optional remaining-time estimate; `None` renders as `--:--`
///
/// # Examples
///
/// ```
/// use ludex_common::human_time::format_eta;
///
/// assert_eq!(format_eta(Some(90)), "1:30");
/// assert_eq!(format_eta(None), "--:--");
/// ```
pub fn format_eta(seconds: Option<u64>) -> String {
    match seconds {
        Some(secs) => format_duration(secs),
        None => "--:--".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_hour_format() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(9), "0:09");
        assert_eq!(format_duration(59), "0:59");
        assert_eq!(format_duration(60), "1:00");
        assert_eq!(format_duration(3599), "59:59");
    }

    #[test]
    fn test_hour_format() {
        assert_eq!(format_duration(3600), "1:00:00");
        assert_eq!(format_duration(3661), "1:01:01");
        assert_eq!(format_duration(86399), "23:59:59");
    }

    #[test]
    fn test_day_format() {
        assert_eq!(format_duration(86400), "1d 0:00:00");
        assert_eq!(format_duration(90000), "1d 1:00:00");
        assert_eq!(format_duration(2 * 86400 + 125), "2d 0:02:05");
    }

    #[test]
    fn test_eta_none_placeholder() {
        assert_eq!(format_eta(None), "--:--");
        assert_eq!(format_eta(Some(0)), "0:00");
    }
}
