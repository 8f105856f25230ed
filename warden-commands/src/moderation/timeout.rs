use poise::serenity_prelude as serenity;

use crate::CommandMeta;
use crate::moderation::actions::run_action;
use crate::moderation::embeds::usage_message;
use warden_core::{Context, Error};
use warden_database::model::cases::CaseType;
use warden_utils::parse::parse_duration_ms;

pub const META: CommandMeta = CommandMeta {
    name: "timeout",
    desc: "Timeout a user for a duration (default: the server's default timeout).",
    category: "moderation",
    usage: "!timeout <user> [duration] [reason]",
};

/// Discord caps member timeouts at 28 days.
const MAX_TIMEOUT_MS: u64 = 28 * 86_400_000;

/// Split leading duration tokens off the free text.
///
/// `10m spam` and `1h 30m spam` yield a duration; a first token that is not a
/// duration is kept as part of the reason. `--` ends duration parsing.
fn split_duration_and_reason(
    duration: Option<&str>,
    reason: Option<&str>,
) -> (Option<u64>, Option<String>) {
    let tokens: Vec<&str> = duration
        .into_iter()
        .chain(reason.into_iter().flat_map(str::split_whitespace))
        .collect();

    let mut duration_ms: Option<u64> = None;
    let mut rest = tokens.as_slice();
    while let Some((token, tail)) = rest.split_first() {
        if *token == "--" {
            rest = tail;
            break;
        }
        let unit_token = token.ends_with(|ch: char| ch.is_ascii_alphabetic());
        let parsed = match parse_duration_ms(token) {
            Some(parsed) if unit_token || duration_ms.is_none() => parsed,
            _ => break,
        };
        duration_ms = Some(duration_ms.unwrap_or(0).saturating_add(parsed));
        rest = tail;
        if !unit_token {
            break;
        }
    }

    let reason = (!rest.is_empty()).then(|| rest.join(" "));
    (duration_ms, reason)
}

#[poise::command(prefix_command, slash_command, category = "Moderation")]
pub async fn timeout(
    ctx: Context<'_>,
    #[description = "The user to timeout"] user: Option<serenity::User>,
    #[description = "Duration (e.g. 10m, 2h)"] duration: Option<String>,
    #[description = "Reason for timeout"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let Some(user) = user else {
        ctx.say(usage_message(META.usage)).await?;
        return Ok(());
    };

    let (duration_ms, reason) = split_duration_and_reason(duration.as_deref(), reason.as_deref());
    if duration_ms.is_some_and(|duration_ms| duration_ms > MAX_TIMEOUT_MS) {
        ctx.say("Timeouts can last at most 28 days.").await?;
        return Ok(());
    }

    run_action(
        ctx,
        CaseType::Timeout,
        serenity::Permissions::MODERATE_MEMBERS,
        user,
        duration_ms,
        reason,
    )
    .await
}
