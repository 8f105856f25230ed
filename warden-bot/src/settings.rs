use std::env;

use anyhow::Context as _;

const DEFAULT_CACHE_KEY_PREFIX: &str = "warden:prod";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    Redis,
    Disabled,
}

impl CacheBackend {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("redis") => CacheBackend::Redis,
            Some("none" | "disabled" | "off") => CacheBackend::Disabled,
            _ => CacheBackend::Memory,
        }
    }
}

/// Everything the binary reads from the environment (or `.env`).
#[derive(Debug)]
pub struct Settings {
    pub discord_token: String,
    pub guild_id: u64,
    /// Unset means the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub auto_run_migrations: bool,
    pub cache_backend: CacheBackend,
    pub redis_url: Option<String>,
    pub cache_key_prefix: String,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let discord_token = non_empty("DISCORD_TOKEN").context("DISCORD_TOKEN is not set")?;
        let guild_id = non_empty("DISCORD_GUILD_ID")
            .context("DISCORD_GUILD_ID is not set")?
            .trim()
            .parse::<u64>()
            .context("DISCORD_GUILD_ID must be a numeric guild id")?;

        let db_max_connections = match non_empty("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|max| *max > 0)
                .context("DATABASE_MAX_CONNECTIONS must be a positive number")?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };

        Ok(Self {
            discord_token,
            guild_id,
            database_url: non_empty("DATABASE_URL"),
            db_max_connections,
            auto_run_migrations: flag(non_empty("AUTO_RUN_MIGRATIONS").as_deref(), true),
            cache_backend: CacheBackend::parse(non_empty("CACHE_BACKEND").as_deref()),
            redis_url: non_empty("REDIS_URL"),
            cache_key_prefix: non_empty("CACHE_KEY_PREFIX")
                .unwrap_or_else(|| DEFAULT_CACHE_KEY_PREFIX.to_owned()),
        })
    }
}

fn flag(raw: Option<&str>, default: bool) -> bool {
    match raw {
        Some(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{CacheBackend, Settings};

    fn settings(pairs: &[(&str, &str)]) -> anyhow::Result<Settings> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn minimal_environment_uses_defaults() {
        let settings =
            settings(&[("DISCORD_TOKEN", "token"), ("DISCORD_GUILD_ID", "42")]).expect("valid");

        assert_eq!(settings.guild_id, 42);
        assert_eq!(settings.database_url, None);
        assert_eq!(settings.db_max_connections, 5);
        assert!(settings.auto_run_migrations);
        assert_eq!(settings.cache_backend, CacheBackend::Memory);
        assert_eq!(settings.cache_key_prefix, "warden:prod");
    }

    #[test]
    fn explicit_values_win() {
        let settings = settings(&[
            ("DISCORD_TOKEN", "token"),
            ("DISCORD_GUILD_ID", " 7 "),
            ("DATABASE_URL", "postgres://localhost/warden"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("AUTO_RUN_MIGRATIONS", "off"),
            ("CACHE_BACKEND", " Redis "),
            ("REDIS_URL", "redis://localhost"),
            ("CACHE_KEY_PREFIX", "warden:dev"),
        ])
        .expect("valid");

        assert_eq!(settings.guild_id, 7);
        assert_eq!(settings.db_max_connections, 12);
        assert!(!settings.auto_run_migrations);
        assert_eq!(settings.cache_backend, CacheBackend::Redis);
        assert_eq!(settings.redis_url.as_deref(), Some("redis://localhost"));
        assert_eq!(settings.cache_key_prefix, "warden:dev");
    }

    #[test]
    fn cache_backend_aliases() {
        assert_eq!(CacheBackend::parse(Some("none")), CacheBackend::Disabled);
        assert_eq!(CacheBackend::parse(Some("OFF")), CacheBackend::Disabled);
        assert_eq!(CacheBackend::parse(Some("something")), CacheBackend::Memory);
    }

    #[test]
    fn missing_or_malformed_required_values_fail() {
        assert!(settings(&[("DISCORD_GUILD_ID", "1")]).is_err());
        assert!(settings(&[("DISCORD_TOKEN", "t"), ("DISCORD_GUILD_ID", "guild")]).is_err());
        assert!(
            settings(&[
                ("DISCORD_TOKEN", "t"),
                ("DISCORD_GUILD_ID", "1"),
                ("DATABASE_MAX_CONNECTIONS", "0"),
            ])
            .is_err()
        );
    }
}
