use poise::serenity_prelude as serenity;

use crate::CommandMeta;
use crate::moderation::actions::admin_guard;
use crate::moderation::embeds::{config_summary_embed, escalation_ladder_description, usage_message};
use warden_core::{Context, Error};
use warden_database::impls::mod_config::{fetch_config, invalidate_config, update_config};
use warden_database::model::config::{
    LogCategory, LogChannelsPatch, ModerationConfigPatch, NotificationConfigPatch,
};
use warden_utils::embed::DEFAULT_EMBED_COLOR;
use warden_utils::parse::{parse_channel_id, parse_switch};

pub const META: CommandMeta = CommandMeta {
    name: "modconfig",
    desc: "View or change this server's moderation configuration.",
    category: "moderation",
    usage: "!modconfig <show|logchannel|escalation|dm|reload>",
};

const LOGCHANNEL_USAGE: &str = "!modconfig logchannel <category> [#channel|channel_id|clear]";
const DM_USAGE: &str = "!modconfig dm <on|off> [reason on|off]";

/// Show the current moderation configuration.
#[poise::command(
    prefix_command,
    slash_command,
    category = "Moderation",
    subcommands("show", "logchannel", "escalation", "dm", "reload")
)]
pub async fn modconfig(ctx: Context<'_>) -> Result<(), Error> {
    show_inner(ctx).await
}

/// Show the current moderation configuration.
#[poise::command(prefix_command, slash_command, category = "Moderation")]
pub async fn show(ctx: Context<'_>) -> Result<(), Error> {
    show_inner(ctx).await
}

async fn show_inner(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = admin_guard(ctx).await? else {
        return Ok(());
    };

    let config = fetch_config(&ctx.data().db, guild_id.get()).await;
    let embed = config_summary_embed(&config).footer(serenity::CreateEmbedFooter::new(
        "Subcommands: show, logchannel, escalation, dm, reload",
    ));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

/// Build the patch for `logchannel`; `None` channel input only reads.
fn log_channel_patch(
    category: &str,
    channel: Option<&str>,
) -> Result<(LogCategory, Option<ModerationConfigPatch>), String> {
    let category = category
        .parse::<LogCategory>()
        .map_err(|source| source.to_string())?;

    let Some(raw_channel) = channel.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok((category, None));
    };

    let channel_id = if raw_channel.eq_ignore_ascii_case("clear") {
        None
    } else {
        Some(
            parse_channel_id(raw_channel)
                .ok_or_else(|| format!("`{raw_channel}` is not a channel mention or id"))?,
        )
    };

    Ok((
        category,
        Some(ModerationConfigPatch {
            log_channels: Some(LogChannelsPatch::single(category, channel_id)),
            ..Default::default()
        }),
    ))
}

/// Set, clear or view the log channel for one category.
#[poise::command(prefix_command, slash_command, category = "Moderation")]
pub async fn logchannel(
    ctx: Context<'_>,
    #[description = "Log category, e.g. moderation, cases, bans"] category: Option<String>,
    #[description = "Channel mention/id, or 'clear'"] channel: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = admin_guard(ctx).await? else {
        return Ok(());
    };

    let Some(category) = category else {
        let valid = LogCategory::ALL.map(LogCategory::as_str).join(", ");
        ctx.say(format!("{}\nCategories: {valid}", usage_message(LOGCHANNEL_USAGE)))
            .await?;
        return Ok(());
    };

    let (category, patch) = match log_channel_patch(&category, channel.as_deref()) {
        Ok(parsed) => parsed,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    let db = &ctx.data().db;
    let config = match patch {
        Some(patch) => update_config(db, guild_id.get(), patch).await?,
        None => fetch_config(db, guild_id.get()).await,
    };

    let reply = match (config.log_channels.get(category), config.log_channels.moderation) {
        (Some(channel_id), _) => format!("`{category}` logs go to <#{channel_id}>."),
        (None, Some(fallback)) => {
            format!("`{category}` has no channel; logs fall back to <#{fallback}>.")
        }
        (None, None) => format!("`{category}` has no channel and no moderation fallback."),
    };
    ctx.say(reply).await?;

    Ok(())
}

/// Show the warn escalation ladder.
#[poise::command(prefix_command, slash_command, category = "Moderation")]
pub async fn escalation(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = admin_guard(ctx).await? else {
        return Ok(());
    };

    let config = fetch_config(&ctx.data().db, guild_id.get()).await;
    let embed = serenity::CreateEmbed::new()
        .title("Warn Escalation")
        .color(DEFAULT_EMBED_COLOR)
        .description(format!(
            "{}\n\nA rule fires once, when a member's warn count reaches its threshold exactly.",
            escalation_ladder_description(&config)
        ));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

/// Toggle direct messages to moderated members.
#[poise::command(prefix_command, slash_command, category = "Moderation")]
pub async fn dm(
    ctx: Context<'_>,
    #[description = "DM members on moderation actions (on/off)"] state: Option<String>,
    #[description = "Include the reason in the DM (on/off)"] include_reason: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = admin_guard(ctx).await? else {
        return Ok(());
    };

    let Some(dm_on_action) = state.as_deref().and_then(parse_switch) else {
        ctx.say(usage_message(DM_USAGE)).await?;
        return Ok(());
    };
    let dm_include_reason = match include_reason.as_deref() {
        Some(raw) => match parse_switch(raw) {
            Some(value) => Some(value),
            None => {
                ctx.say(usage_message(DM_USAGE)).await?;
                return Ok(());
            }
        },
        None => None,
    };

    let patch = ModerationConfigPatch {
        notifications: Some(NotificationConfigPatch {
            dm_on_action: Some(dm_on_action),
            dm_include_reason,
        }),
        ..Default::default()
    };
    let config = update_config(&ctx.data().db, guild_id.get(), patch).await?;

    ctx.say(format!(
        "Moderation DMs are **{}**, reasons are **{}**.",
        if config.notifications.dm_on_action { "on" } else { "off" },
        if config.notifications.dm_include_reason { "included" } else { "hidden" }
    ))
    .await?;

    Ok(())
}

/// Drop the cached configuration so the next read hits the database.
#[poise::command(prefix_command, slash_command, category = "Moderation")]
pub async fn reload(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = admin_guard(ctx).await? else {
        return Ok(());
    };

    invalidate_config(&ctx.data().db, guild_id.get()).await?;
    ctx.say("Moderation config cache cleared.").await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::log_channel_patch;
    use warden_database::model::config::LogCategory;

    #[test]
    fn reading_needs_no_patch() {
        let (category, patch) = log_channel_patch("bans", None).expect("valid");
        assert_eq!(category, LogCategory::Bans);
        assert!(patch.is_none());
    }

    #[test]
    fn set_and_clear_build_single_field_patches() {
        let (_, patch) = log_channel_patch("messageEdits", Some("<#55>")).expect("valid");
        let channels = patch.and_then(|patch| patch.log_channels).expect("channels");
        assert_eq!(channels.message_edits, Some(Some(55)));
        assert_eq!(channels.moderation, None);

        let (_, patch) = log_channel_patch("cases", Some("clear")).expect("valid");
        let channels = patch.and_then(|patch| patch.log_channels).expect("channels");
        assert_eq!(channels.cases, Some(None));
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(log_channel_patch("nope", None).is_err());
        assert!(log_channel_patch("cases", Some("#general")).is_err());
    }
}
