use std::time::{SystemTime, UNIX_EPOCH};

/// Return the current unix timestamp in seconds.
pub fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

/// Unix timestamp `duration_ms` after `start_unix_secs`, rounded up to the second.
pub fn unix_secs_after(start_unix_secs: u64, duration_ms: u64) -> u64 {
    start_unix_secs.saturating_add(duration_ms.div_ceil(1_000))
}

/// Discord markup rendering a timestamp relative to the reader ("in 1 hour").
pub fn discord_relative_timestamp(unix_secs: u64) -> String {
    format!("<t:{unix_secs}:R>")
}
