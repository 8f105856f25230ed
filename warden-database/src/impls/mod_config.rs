use anyhow::Context as _;
use tracing::warn;

use crate::cache::{MOD_CONFIG_CACHE_TTL, invalidate_mod_config, mod_config_key};
use crate::database::Database;
use crate::impls::escalation::validate_ladder;
use crate::model::config::{Merge, ModerationConfig, ModerationConfigPatch};

/// Resolve a guild's moderation config: cached copy if fresh, otherwise
/// defaults merged with the stored patch.
///
/// Never fails. A backend read error degrades to the default document, which
/// is cached like any other result so retries are bounded by the TTL.
pub async fn fetch_config(db: &Database, guild_id: u64) -> ModerationConfig {
    let cache_key = mod_config_key(db.cache(), guild_id);
    let resolved = db
        .cache()
        .get_or_load_json(&cache_key, MOD_CONFIG_CACHE_TTL, || async {
            Ok(load_config(db, guild_id).await)
        })
        .await;

    match resolved {
        Ok(config) => config,
        Err(source) => {
            warn!(?source, guild_id, "moderation config resolution failed; using defaults");
            ModerationConfig::default_for(guild_id)
        }
    }
}

async fn load_config(db: &Database, guild_id: u64) -> ModerationConfig {
    let mut config = ModerationConfig::default_for(guild_id);

    match db.backend().load_mod_config(guild_id).await {
        Ok(Some(patch)) => config.merge(patch),
        Ok(None) => {}
        Err(source) => {
            warn!(?source, guild_id, "failed to read moderation config; using defaults");
        }
    }

    config.guild_id = guild_id;
    config
}

/// Merge `patch` into the guild's current config and persist the result.
///
/// The cache is only refreshed after the write succeeds, so a failed write
/// leaves both the stored row and the cached copy as they were.
pub async fn update_config(
    db: &Database,
    guild_id: u64,
    patch: ModerationConfigPatch,
) -> anyhow::Result<ModerationConfig> {
    let mut config = fetch_config(db, guild_id).await;
    config.merge(patch);
    config.guild_id = guild_id;

    validate_ladder(&config.escalation.warn).context("invalid warn escalation ladder")?;

    db.backend()
        .save_mod_config(guild_id, &config)
        .await
        .with_context(|| format!("failed to persist moderation config for guild {guild_id}"))?;

    let cache_key = mod_config_key(db.cache(), guild_id);
    if let Err(source) = db
        .cache()
        .set_json(&cache_key, &config, MOD_CONFIG_CACHE_TTL)
        .await
    {
        warn!(?source, guild_id, "failed to refresh cached moderation config");
        invalidate_config(db, guild_id).await?;
    }

    Ok(config)
}

/// Drop the cached copy; the next fetch re-reads the backend.
pub async fn invalidate_config(db: &Database, guild_id: u64) -> anyhow::Result<()> {
    invalidate_mod_config(db.cache(), guild_id).await
}
