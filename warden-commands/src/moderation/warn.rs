use poise::serenity_prelude as serenity;

use crate::CommandMeta;
use crate::moderation::actions::run_action;
use crate::moderation::embeds::usage_message;
use warden_core::{Context, Error};
use warden_database::model::cases::CaseType;

pub const META: CommandMeta = CommandMeta {
    name: "warn",
    desc: "Issue a warning to a user. Repeated warnings escalate.",
    category: "moderation",
    usage: "!warn <user> [reason]",
};

#[poise::command(prefix_command, slash_command, category = "Moderation")]
pub async fn warn(
    ctx: Context<'_>,
    #[description = "The user to warn"] user: Option<serenity::User>,
    #[description = "Reason for warning"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let Some(user) = user else {
        ctx.say(usage_message(META.usage)).await?;
        return Ok(());
    };

    run_action(
        ctx,
        CaseType::Warn,
        serenity::Permissions::MODERATE_MEMBERS,
        user,
        None,
        reason,
    )
    .await
}
