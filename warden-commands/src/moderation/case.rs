use poise::serenity_prelude as serenity;

use crate::CommandMeta;
use crate::moderation::actions::moderation_guard;
use crate::moderation::embeds::{case_detail_embed, case_list_description, usage_message};
use warden_core::{Context, Error};
use warden_database::impls::cases::{get_case, list_cases};
use warden_database::model::cases::{CaseFilters, CaseType};
use warden_utils::embed::DEFAULT_EMBED_COLOR;

pub const CASES_META: CommandMeta = CommandMeta {
    name: "cases",
    desc: "List recent moderation cases, optionally for one user or action.",
    category: "moderation",
    usage: "!cases [user] [type] [limit]",
};

pub const CASE_META: CommandMeta = CommandMeta {
    name: "case",
    desc: "Show a single moderation case by number.",
    category: "moderation",
    usage: "!case <number>",
};

const DEFAULT_LISTING: u32 = 10;

#[poise::command(prefix_command, slash_command, category = "Moderation")]
pub async fn cases(
    ctx: Context<'_>,
    #[description = "Only cases against this user"] user: Option<serenity::User>,
    #[description = "Only this action (warn, timeout, kick, ban, mute)"]
    case_type: Option<String>,
    #[description = "How many cases to show (max 100)"] limit: Option<u32>,
) -> Result<(), Error> {
    let Some((guild_id, _config)) =
        moderation_guard(ctx, serenity::Permissions::MODERATE_MEMBERS).await?
    else {
        return Ok(());
    };

    let case_type = match case_type.as_deref().map(str::parse::<CaseType>) {
        Some(Ok(case_type)) => Some(case_type),
        Some(Err(_)) => {
            ctx.say(usage_message(CASES_META.usage)).await?;
            return Ok(());
        }
        None => None,
    };

    let filters = CaseFilters {
        target_id: user.as_ref().map(|user| user.id.get()),
        moderator_id: None,
        case_type,
        limit: limit.unwrap_or(DEFAULT_LISTING),
    };
    let found = list_cases(&ctx.data().db, guild_id.get(), filters).await?;

    let title = match &user {
        Some(user) => format!("Cases for {}", user.tag()),
        None => "Recent Cases".to_owned(),
    };
    let embed = serenity::CreateEmbed::new()
        .title(title)
        .color(DEFAULT_EMBED_COLOR)
        .description(case_list_description(&found));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

#[poise::command(prefix_command, slash_command, category = "Moderation")]
pub async fn case(
    ctx: Context<'_>,
    #[description = "Case number, with or without #"] number: Option<String>,
) -> Result<(), Error> {
    let Some((guild_id, _config)) =
        moderation_guard(ctx, serenity::Permissions::MODERATE_MEMBERS).await?
    else {
        return Ok(());
    };

    let Some(case_number) = number
        .as_deref()
        .map(|raw| raw.trim().trim_start_matches('#'))
        .and_then(|raw| raw.parse::<u64>().ok())
    else {
        ctx.say(usage_message(CASE_META.usage)).await?;
        return Ok(());
    };

    match get_case(&ctx.data().db, guild_id.get(), case_number).await? {
        Some(found) => {
            ctx.send(poise::CreateReply::default().embed(case_detail_embed(&found)))
                .await?;
        }
        None => {
            ctx.say(format!("Case #{case_number} does not exist.")).await?;
        }
    }

    Ok(())
}
