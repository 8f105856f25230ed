use tracing::warn;

use crate::cache::{FEATURE_STATE_CACHE_TTL, FEATURE_STATE_FAILURE_TTL, feature_state_key};
use crate::database::Database;
use crate::model::features::{Feature, FeatureState};

/// Current state of `feature` for a guild, defaulting to `Disable`.
///
/// Confirmed reads are cached for five minutes. When the backend read fails
/// the default is cached for only thirty seconds, so an outage is retried
/// sooner than a known value is refreshed.
pub async fn get_feature_state(db: &Database, guild_id: u64, feature: Feature) -> FeatureState {
    let cache = db.cache();
    let key = feature_state_key(cache, guild_id, feature);

    match cache.get_json::<FeatureState>(&key).await {
        Ok(Some(state)) => return state,
        Ok(None) => {}
        Err(source) => warn!(?source, cache_key = %key, "feature cache read failed"),
    }

    let (state, ttl) = match db.backend().load_feature_flags(guild_id).await {
        Ok(flags) => (
            flags.map(|flags| flags.state(feature)).unwrap_or_default(),
            FEATURE_STATE_CACHE_TTL,
        ),
        Err(source) => {
            warn!(
                ?source,
                guild_id,
                feature = %feature,
                "failed to read feature state; treating as disabled"
            );
            (FeatureState::Disable, FEATURE_STATE_FAILURE_TTL)
        }
    };

    if let Err(source) = cache.set_json(&key, &state, ttl).await {
        warn!(?source, cache_key = %key, "feature cache write failed");
    }

    state
}

/// Persist a feature state and refresh the cached entry.
///
/// Does not enforce cross-feature rules; automod depending on moderation is
/// checked by the command layer.
pub async fn set_feature_state(
    db: &Database,
    guild_id: u64,
    feature: Feature,
    state: FeatureState,
) -> anyhow::Result<()> {
    db.backend()
        .save_feature_state(guild_id, feature, state.is_enabled())
        .await?;

    let cache = db.cache();
    let key = feature_state_key(cache, guild_id, feature);
    if let Err(source) = cache.set_json(&key, &state, FEATURE_STATE_CACHE_TTL).await {
        warn!(?source, cache_key = %key, "feature cache write failed; dropping entry");
        cache.del(&key).await?;
    }

    Ok(())
}
