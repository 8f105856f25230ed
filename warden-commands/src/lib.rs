pub mod moderation;
pub mod utility;

use warden_core::{Data, Error};

pub struct CommandMeta {
    pub name: &'static str,
    pub desc: &'static str,
    pub category: &'static str,
    pub usage: &'static str,
}

pub const COMMANDS: &[CommandMeta] = &[
    utility::ping::META,
    utility::help::META,
    moderation::warn::META,
    moderation::timeout::META,
    moderation::kick::META,
    moderation::ban::META,
    moderation::case::CASES_META,
    moderation::case::CASE_META,
    moderation::modconfig::META,
    moderation::feature::META,
];

/// Usage line for a top-level command name, if it is registered.
pub fn usage_for(name: &str) -> Option<&'static str> {
    COMMANDS
        .iter()
        .find(|meta| meta.name == name)
        .map(|meta| meta.usage)
}

pub fn commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        utility::ping::ping(),
        utility::help::help(),
        moderation::warn::warn(),
        moderation::timeout::timeout(),
        moderation::kick::kick(),
        moderation::ban::ban(),
        moderation::case::cases(),
        moderation::case::case(),
        moderation::modconfig::modconfig(),
        moderation::feature::feature(),
    ]
}

#[cfg(test)]
mod tests {
    use super::{COMMANDS, commands, usage_for};

    #[test]
    fn every_registered_command_has_metadata() {
        let registered = commands();
        assert_eq!(registered.len(), COMMANDS.len());
        for command in &registered {
            assert!(
                usage_for(&command.name).is_some(),
                "{} has no metadata",
                command.name
            );
        }
    }

    #[test]
    fn unknown_names_have_no_usage() {
        assert_eq!(usage_for("warn"), Some("!warn <user> [reason]"));
        assert_eq!(usage_for("purge"), None);
    }
}
