/// Truncate a string to a maximum number of characters, adding ellipsis if needed
pub fn truncate(s: &str, max_len: usize) -> String {
    // Replace tabs and newlines with spaces to keep table rows on one line
    let cleaned: String = s.replace(['\t', '\n', '\r'], " ").trim().to_string();
    if cleaned.chars().count() <= max_len {
        cleaned
    } else {
        let kept: String = cleaned.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}

/// Remove HTML tags from rich-text notes and collapse whitespace
pub fn strip_html(s: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-insensitive substring check
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Format a timestamp from the service to a more readable format
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y").to_string()
    } else if date.len() >= 10 && date.is_char_boundary(10) {
        // "YYYY-MM-DD HH:MM:SS" style timestamps
        date[..10].to_string()
    } else {
        date.to_string()
    }
}

/// Format an optional string, returning "-" if None or empty
pub fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("-")
}
