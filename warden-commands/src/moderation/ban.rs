use poise::serenity_prelude as serenity;

use crate::CommandMeta;
use crate::moderation::actions::run_action;
use crate::moderation::embeds::usage_message;
use warden_core::{Context, Error};
use warden_database::model::cases::CaseType;

pub const META: CommandMeta = CommandMeta {
    name: "ban",
    desc: "Ban a user from the server.",
    category: "moderation",
    usage: "!ban <user> [reason]",
};

#[poise::command(prefix_command, slash_command, category = "Moderation")]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "The user to ban"] user: Option<serenity::User>,
    #[description = "Reason for the ban"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let Some(user) = user else {
        ctx.say(usage_message(META.usage)).await?;
        return Ok(());
    };

    run_action(
        ctx,
        CaseType::Ban,
        serenity::Permissions::BAN_MEMBERS,
        user,
        None,
        reason,
    )
    .await
}
