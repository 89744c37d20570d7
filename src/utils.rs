use chrono::NaiveDate;

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

pub fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

pub fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// `2026-02-15` -> `February 15, 2026`. Empty is `N/A`; anything that is not
/// an ISO date comes back unchanged.
pub fn format_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return "N/A".to_string();
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date.format("%B %-d, %Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// `2026-02-15` -> `Feb 2026`.
pub fn format_date_short(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return "N/A".to_string();
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date.format("%b %Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("Plymouth", 24), "Plymouth");
        assert_eq!(truncate("Owner-Occupancy Requirement", 5), "Owner...");
        assert_eq!(truncate("Lowell\u{2019}s", 7), "Lowell\u{2019}");
    }

    #[test]
    fn dates() {
        assert_eq!(format_date("2026-02-15"), "February 15, 2026");
        assert_eq!(format_date("2025-05-01"), "May 1, 2025");
        assert_eq!(format_date(""), "N/A");
        assert_eq!(format_date("Spring 2025"), "Spring 2025");
        assert_eq!(format_date_short("2026-02-15"), "Feb 2026");
        assert_eq!(format_date_short("soon"), "soon");
    }

    #[test]
    fn percent_of_nothing() {
        assert_eq!(percent(3, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
    }
}
