/// Parse a compact duration such as `30s`, `10m`, `1h30m`, `2d` into milliseconds.
///
/// A bare number is read as minutes, matching the timeout command's default
/// unit. Zero and overflowing values are rejected.
pub fn parse_duration_ms(raw: &str) -> Option<u64> {
    let compact: String = raw.chars().filter(|ch| !ch.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }

    if compact.bytes().all(|byte| byte.is_ascii_digit()) {
        let minutes = compact.parse::<u64>().ok().filter(|value| *value > 0)?;
        return minutes.checked_mul(60_000);
    }

    let bytes = compact.as_bytes();
    let mut cursor = 0;
    let mut total_ms = 0_u64;

    while cursor < bytes.len() {
        let number_start = cursor;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        if number_start == cursor || cursor == bytes.len() {
            return None;
        }

        let number = compact[number_start..cursor].parse::<u64>().ok()?;
        let multiplier = match bytes[cursor].to_ascii_lowercase() {
            b's' => 1_000_u64,
            b'm' => 60_000,
            b'h' => 3_600_000,
            b'd' => 86_400_000,
            b'w' => 604_800_000,
            _ => return None,
        };
        cursor += 1;

        total_ms = total_ms.checked_add(number.checked_mul(multiplier)?)?;
    }

    (total_ms > 0).then_some(total_ms)
}

/// Parse `on`/`off` style toggles.
pub fn parse_switch(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "enable" | "enabled" | "true" | "yes" => Some(true),
        "off" | "disable" | "disabled" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Parse a channel mention (`<#123>`) or a raw channel id.
pub fn parse_channel_id(raw: &str) -> Option<u64> {
    let value = raw.trim();
    let digits = value
        .strip_prefix("<#")
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(value);

    digits.parse::<u64>().ok().filter(|id| *id > 0)
}

#[cfg(test)]
mod tests {
    use super::{parse_channel_id, parse_duration_ms, parse_switch};

    #[test]
    fn parses_unit_segments() {
        assert_eq!(parse_duration_ms("30s"), Some(30_000));
        assert_eq!(parse_duration_ms("10m"), Some(600_000));
        assert_eq!(parse_duration_ms("1h"), Some(3_600_000));
        assert_eq!(parse_duration_ms("1h 30m"), Some(5_400_000));
        assert_eq!(parse_duration_ms("2D"), Some(172_800_000));
        assert_eq!(parse_duration_ms("1w"), Some(604_800_000));
    }

    #[test]
    fn bare_numbers_are_minutes() {
        assert_eq!(parse_duration_ms("15"), Some(900_000));
        assert_eq!(parse_duration_ms("0"), None);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_duration_ms(""), None);
        assert_eq!(parse_duration_ms("h"), None);
        assert_eq!(parse_duration_ms("10x"), None);
        assert_eq!(parse_duration_ms("10m5"), None);
        assert_eq!(parse_duration_ms("0s"), None);
        assert_eq!(parse_duration_ms("99999999999999999999d"), None);
    }

    #[test]
    fn switches() {
        assert_eq!(parse_switch("ON"), Some(true));
        assert_eq!(parse_switch(" off "), Some(false));
        assert_eq!(parse_switch("maybe"), None);
    }

    #[test]
    fn channel_mentions_and_ids() {
        assert_eq!(parse_channel_id("<#123>"), Some(123));
        assert_eq!(parse_channel_id(" 456 "), Some(456));
        assert_eq!(parse_channel_id("#general"), None);
        assert_eq!(parse_channel_id("0"), None);
    }
}
