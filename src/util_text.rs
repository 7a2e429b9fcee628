//! Small text formatting helpers shared by the view builders and the CLI.

/// Buckets an age in seconds into a human-relative string
/// (seconds/minutes/hours/days).
pub fn relative_age(age_secs: i64) -> String {
    let age = age_secs.max(0);
    if age < 60 {
        format!("{age}s ago")
    } else if age < 3600 {
        format!("{}m ago", age / 60)
    } else if age < 86_400 {
        format!("{}h ago", age / 3600)
    } else {
        format!("{}d ago", age / 86_400)
    }
}

/// Shortens long identifiers (contract ids, party fingerprints) for display,
/// keeping both ends.
pub fn truncate_id(id: &str, max: usize) -> String {
    let len = id.chars().count();
    if len <= max || max < 8 {
        return id.to_string();
    }
    // Counted in chars, not bytes: party ids may carry multi-byte names
    let keep = (max - 2) / 2;
    let head: String = id.chars().take(keep).collect();
    let tail: String = id.chars().skip(len - keep).collect();
    format!("{head}..{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_age_buckets() {
        assert_eq!(relative_age(5), "5s ago");
        assert_eq!(relative_age(59), "59s ago");
        assert_eq!(relative_age(60), "1m ago");
        assert_eq!(relative_age(3599), "59m ago");
        assert_eq!(relative_age(7200), "2h ago");
        assert_eq!(relative_age(90_000), "1d ago");
        // Clock skew: never render a negative age
        assert_eq!(relative_age(-30), "0s ago");
    }

    #[test]
    fn test_truncate_id_keeps_both_ends() {
        let id = "0061d2719d3c3a1f0737c3e162da80f4a7fca19828a31a3efc2f9b63aaa2797455";
        let t = truncate_id(id, 16);
        assert!(t.len() <= 16);
        assert!(t.starts_with("0061d27"));
        assert!(t.ends_with("797455"));
    }

    #[test]
    fn test_truncate_id_short_ids_untouched() {
        assert_eq!(truncate_id("abc", 16), "abc");
    }

    #[test]
    fn test_truncate_id_multibyte_names() {
        let id = "Алиса-Банк::0061d2719d3c3a1f0737c3e162da80f4a7fca198";
        let t = truncate_id(id, 16);
        assert_eq!(t.chars().count(), 16);
        assert!(t.starts_with("Алиса-Б"));
        assert!(t.ends_with("7fca198"));
    }
}
