/// Default embed color used across the bot UI.
pub const DEFAULT_EMBED_COLOR: u32 = 0x90_55_30;
/// Warnings and timeouts.
pub const CAUTION_EMBED_COLOR: u32 = 0xE6_A2_3C;
/// Kicks, bans and failed automated actions.
pub const SEVERE_EMBED_COLOR: u32 = 0xC0_39_2B;

/// Embed colour for an action key such as `warn` or `ban`.
pub fn action_color(action: &str) -> u32 {
    match action {
        "warn" | "timeout" | "mute" => CAUTION_EMBED_COLOR,
        "kick" | "ban" => SEVERE_EMBED_COLOR,
        _ => DEFAULT_EMBED_COLOR,
    }
}

#[cfg(test)]
mod tests {
    use super::{CAUTION_EMBED_COLOR, DEFAULT_EMBED_COLOR, SEVERE_EMBED_COLOR, action_color};

    #[test]
    fn colours_follow_severity() {
        assert_eq!(action_color("warn"), CAUTION_EMBED_COLOR);
        assert_eq!(action_color("ban"), SEVERE_EMBED_COLOR);
        assert_eq!(action_color("other"), DEFAULT_EMBED_COLOR);
    }
}
