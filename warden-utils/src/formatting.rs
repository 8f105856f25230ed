/// Label shown for a case: `#12`, or `#?` when the backend assigned no number.
pub fn format_case_label(case_number: Option<u64>) -> String {
    match case_number {
        Some(number) => format!("#{number}"),
        None => "#?".to_owned(),
    }
}

/// Convert internal action identifiers to user-facing names.
pub fn action_display_name(action: &str) -> String {
    match action {
        "warn" => "Warn".to_owned(),
        "mute" => "Mute".to_owned(),
        "ban" => "Ban".to_owned(),
        "kick" => "Kick".to_owned(),
        "timeout" => "Timeout".to_owned(),
        other => {
            let words: Vec<String> = other
                .split(['_', '-', ' '])
                .filter(|part| !part.is_empty())
                .map(capitalize)
                .collect();

            if words.is_empty() {
                "Unknown".to_owned()
            } else {
                words.join(" ")
            }
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => format!(
            "{}{}",
            first.to_uppercase(),
            chars.as_str().to_ascii_lowercase()
        ),
        None => String::new(),
    }
}

/// Format seconds into a compact human-readable duration (e.g. 59s, 1m, 1h, 1d, 1h 30m).
pub fn format_compact_duration(total_seconds: u64) -> String {
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    if days > 0 {
        return if hours > 0 {
            format!("{days}d {hours}h")
        } else {
            format!("{days}d")
        };
    }

    let mut parts = Vec::with_capacity(3);
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds}s"));
    }
    parts.join(" ")
}

/// Millisecond variant of [`format_compact_duration`]; sub-second rests round up.
pub fn format_duration_ms(duration_ms: u64) -> String {
    format_compact_duration(duration_ms.div_ceil(1_000))
}

/// Clip `text` to at most `max_chars` characters, marking the cut with `…`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }

    let kept: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{kept}…")
}

#[cfg(test)]
mod tests {
    use super::{
        action_display_name, format_case_label, format_compact_duration, format_duration_ms,
        truncate_chars,
    };

    #[test]
    fn formats_case_labels() {
        assert_eq!(format_case_label(Some(12)), "#12");
        assert_eq!(format_case_label(None), "#?");
    }

    #[test]
    fn action_names_are_user_friendly() {
        assert_eq!(action_display_name("warn"), "Warn");
        assert_eq!(action_display_name("timeout"), "Timeout");
        assert_eq!(action_display_name("role_changes"), "Role Changes");
        assert_eq!(action_display_name("  "), "Unknown");
    }

    #[test]
    fn compact_duration_formatting() {
        assert_eq!(format_compact_duration(0), "0s");
        assert_eq!(format_compact_duration(59), "59s");
        assert_eq!(format_compact_duration(60), "1m");
        assert_eq!(format_compact_duration(61), "1m 1s");
        assert_eq!(format_compact_duration(3600), "1h");
        assert_eq!(format_compact_duration(3660), "1h 1m");
        assert_eq!(format_compact_duration(3670), "1h 1m 10s");
        assert_eq!(format_compact_duration(3605), "1h 5s");
        assert_eq!(format_compact_duration(86400), "1d");
        assert_eq!(format_compact_duration(90000), "1d 1h");
    }

    #[test]
    fn millisecond_durations() {
        assert_eq!(format_duration_ms(3_600_000), "1h");
        assert_eq!(format_duration_ms(900_000), "15m");
        assert_eq!(format_duration_ms(1_500), "2s");
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("äöüäöü", 4), "äöü…");
    }
}
