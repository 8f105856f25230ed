use poise::serenity_prelude as serenity;

use crate::CommandMeta;
use crate::moderation::actions::run_action;
use crate::moderation::embeds::usage_message;
use warden_core::{Context, Error};
use warden_database::model::cases::CaseType;

pub const META: CommandMeta = CommandMeta {
    name: "kick",
    desc: "Kick a user from the server.",
    category: "moderation",
    usage: "!kick <user> [reason]",
};

#[poise::command(prefix_command, slash_command, category = "Moderation")]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "The user to kick"] user: Option<serenity::User>,
    #[description = "Reason for the kick"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let Some(user) = user else {
        ctx.say(usage_message(META.usage)).await?;
        return Ok(());
    };

    run_action(
        ctx,
        CaseType::Kick,
        serenity::Permissions::KICK_MEMBERS,
        user,
        None,
        reason,
    )
    .await
}
