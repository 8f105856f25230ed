use poise::serenity_prelude as serenity;

use crate::CommandMeta;
use crate::moderation::actions::admin_guard;
use crate::moderation::embeds::usage_message;
use warden_core::{Context, Error};
use warden_database::impls::features::{get_feature_state, set_feature_state};
use warden_database::model::features::{Feature, FeatureState};
use warden_utils::embed::DEFAULT_EMBED_COLOR;
use warden_utils::parse::parse_switch;

pub const META: CommandMeta = CommandMeta {
    name: "feature",
    desc: "Turn moderation and automod on or off for this server.",
    category: "moderation",
    usage: "!feature <status|moderation|automod> [on|off]",
};

#[derive(Debug, PartialEq, Eq)]
enum TogglePlan {
    /// Writes to perform, in order.
    Apply(Vec<(Feature, FeatureState)>),
    Rejected(&'static str),
}

/// Writes needed to move `feature` to `desired`.
///
/// Automod needs moderation, so it cannot be enabled on its own and turning
/// moderation off takes automod with it.
fn plan_toggle(
    moderation: FeatureState,
    automod: FeatureState,
    feature: Feature,
    desired: FeatureState,
) -> TogglePlan {
    match (feature, desired) {
        (Feature::Automod, FeatureState::Enable) if !moderation.is_enabled() => {
            TogglePlan::Rejected("Enable moderation before enabling automod.")
        }
        (Feature::Moderation, FeatureState::Disable) if automod.is_enabled() => {
            TogglePlan::Apply(vec![
                (Feature::Automod, FeatureState::Disable),
                (Feature::Moderation, FeatureState::Disable),
            ])
        }
        _ => TogglePlan::Apply(vec![(feature, desired)]),
    }
}

/// Show which features are enabled.
#[poise::command(
    prefix_command,
    slash_command,
    category = "Moderation",
    subcommands("status", "moderation", "automod")
)]
pub async fn feature(ctx: Context<'_>) -> Result<(), Error> {
    status_inner(ctx).await
}

/// Show which features are enabled.
#[poise::command(prefix_command, slash_command, category = "Moderation")]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    status_inner(ctx).await
}

async fn status_inner(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = admin_guard(ctx).await? else {
        return Ok(());
    };

    let db = &ctx.data().db;
    let mut lines = Vec::new();
    for feature in [Feature::Moderation, Feature::Automod] {
        let state = get_feature_state(db, guild_id.get(), feature).await;
        lines.push(format!(
            "**{} :** {}",
            feature.display_name(),
            if state.is_enabled() { "enabled" } else { "disabled" }
        ));
    }

    let embed = serenity::CreateEmbed::new()
        .title("Features")
        .color(DEFAULT_EMBED_COLOR)
        .description(lines.join("\n"))
        .footer(serenity::CreateEmbedFooter::new(META.usage));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

/// Enable or disable moderation commands.
#[poise::command(prefix_command, slash_command, category = "Moderation")]
pub async fn moderation(
    ctx: Context<'_>,
    #[description = "on or off"] state: Option<String>,
) -> Result<(), Error> {
    toggle(ctx, Feature::Moderation, state).await
}

/// Enable or disable automod.
#[poise::command(prefix_command, slash_command, category = "Moderation")]
pub async fn automod(
    ctx: Context<'_>,
    #[description = "on or off"] state: Option<String>,
) -> Result<(), Error> {
    toggle(ctx, Feature::Automod, state).await
}

async fn toggle(ctx: Context<'_>, feature: Feature, state: Option<String>) -> Result<(), Error> {
    let Some(guild_id) = admin_guard(ctx).await? else {
        return Ok(());
    };

    let Some(enabled) = state.as_deref().and_then(parse_switch) else {
        ctx.say(usage_message(META.usage)).await?;
        return Ok(());
    };

    let db = &ctx.data().db;
    let guild = guild_id.get();
    let moderation = get_feature_state(db, guild, Feature::Moderation).await;
    let automod = get_feature_state(db, guild, Feature::Automod).await;

    match plan_toggle(moderation, automod, feature, FeatureState::from_enabled(enabled)) {
        TogglePlan::Rejected(message) => {
            ctx.say(message).await?;
        }
        TogglePlan::Apply(writes) => {
            for (feature, state) in &writes {
                set_feature_state(db, guild, *feature, *state).await?;
            }
            let summary = writes
                .iter()
                .map(|(feature, state)| {
                    format!(
                        "{} is now **{}**.",
                        feature.display_name(),
                        if state.is_enabled() { "enabled" } else { "disabled" }
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            ctx.say(summary).await?;
        }
    }

    Ok(())
}
