//! The flow shared by `warn`, `timeout`, `kick` and `ban`.

use poise::serenity_prelude as serenity;
use tracing::{error, warn};

use warden_core::{Context, Error};
use warden_database::Database;
use warden_database::impls::cases::{Escalation, create_moderation_case};
use warden_database::impls::features::get_feature_state;
use warden_database::impls::mod_config::fetch_config;
use warden_database::model::cases::{CaseMetadata, CaseType, ModerationCase, NewCase};
use warden_database::model::config::ModerationConfig;
use warden_database::model::features::{Feature, FeatureState};
use warden_utils::permissions::{MemberAccess, resolve_member_access};

use crate::moderation::embeds::{
    feature_disabled_message, guild_only_message, moderation_action_embed,
    moderation_bot_target_message, moderation_self_action_message, permission_denied_message,
    target_profile_from_user,
};
use crate::moderation::escalation::{Actor, EscalationOutcome, apply_escalation};
use crate::moderation::gateway::{Gateway, SerenityGateway, is_missing_permissions};
use crate::moderation::logging::{log_case, notify_target, past_tense};

pub const DEFAULT_REASON: &str = "No reason provided";

/// One moderator-issued action.
#[derive(Clone, Debug)]
pub struct ActionRequest {
    pub guild_id: u64,
    pub guild_name: String,
    pub case_type: CaseType,
    pub target_id: u64,
    pub target_tag: String,
    pub moderator: Actor,
    /// Recorded as moderator on automated follow-up cases.
    pub bot: Actor,
    pub reason: String,
    pub duration_ms: Option<u64>,
}

#[derive(Debug)]
pub struct ActionReport {
    pub case: ModerationCase,
    pub logged: bool,
    pub notified: bool,
    pub escalation: Option<(Escalation, EscalationOutcome)>,
}

/// Apply, record, log and escalate one action.
///
/// Punitive actions are applied on the platform before the case is written,
/// so a rejected action leaves no record. Kicks and bans DM the target first
/// because the DM can no longer be delivered once they left the guild.
pub async fn execute_action(
    gateway: &dyn Gateway,
    db: &Database,
    request: ActionRequest,
) -> anyhow::Result<ActionReport> {
    let config = fetch_config(db, request.guild_id).await;
    let new_case = NewCase {
        guild_id: request.guild_id,
        case_type: request.case_type,
        target_id: request.target_id,
        target_tag: request.target_tag.clone(),
        moderator_id: request.moderator.id,
        moderator_tag: request.moderator.tag.clone(),
        reason: request.reason.clone(),
        severity: None,
        duration_ms: request.duration_ms,
        metadata: CaseMetadata::default(),
    };

    let notify_first = matches!(request.case_type, CaseType::Kick | CaseType::Ban);
    let mut notified = false;
    if notify_first {
        notified = notify_target(gateway, &config, &new_case, &request.guild_name).await;
    }

    apply_platform_action(gateway, &new_case).await?;

    let outcome = create_moderation_case(db, new_case.clone()).await?;
    let logged = log_case(gateway, db, request.guild_id, &outcome.case).await;

    if !notify_first {
        notified = notify_target(gateway, &config, &new_case, &request.guild_name).await;
    }

    let escalation = match outcome.escalation {
        Some(escalation) => {
            let applied = apply_escalation(
                gateway,
                db,
                &outcome.case,
                &escalation,
                &request.bot,
                &request.guild_name,
            )
            .await?;
            Some((escalation, applied))
        }
        None => None,
    };

    Ok(ActionReport {
        case: outcome.case,
        logged,
        notified,
        escalation,
    })
}

async fn apply_platform_action(gateway: &dyn Gateway, new_case: &NewCase) -> anyhow::Result<()> {
    let guild_id = new_case.guild_id;
    let target_id = new_case.target_id;
    let reason = new_case.reason.as_str();

    match new_case.case_type {
        CaseType::Warn => Ok(()),
        CaseType::Timeout | CaseType::Mute => {
            let Some(duration_ms) = new_case.duration_ms else {
                anyhow::bail!("a {} needs a duration", new_case.case_type);
            };
            gateway
                .apply_timeout(guild_id, target_id, duration_ms, reason)
                .await
        }
        CaseType::Kick => gateway.apply_kick(guild_id, target_id, reason).await,
        CaseType::Ban => gateway.apply_ban(guild_id, target_id, reason).await,
    }
}

/// Guild, resolved config and feature/permission gate for a moderation command.
///
/// Replies to the invoker and returns `None` when the command must stop.
pub async fn moderation_guard(
    ctx: Context<'_>,
    required: serenity::Permissions,
) -> Result<Option<(serenity::GuildId, ModerationConfig)>, Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(None);
    };

    let db = &ctx.data().db;
    if get_feature_state(db, guild_id.get(), Feature::Moderation).await != FeatureState::Enable {
        ctx.say(feature_disabled_message(Feature::Moderation)).await?;
        return Ok(None);
    }

    let config = fetch_config(db, guild_id.get()).await;
    let access = resolve_member_access(ctx.http(), guild_id, ctx.author().id).await?;
    if let Some(denial) = access_denial(
        &access,
        required,
        &config.permissions.moderator_role_ids,
        &config.permissions.admin_role_ids,
    ) {
        ctx.say(denial).await?;
        return Ok(None);
    }

    Ok(Some((guild_id, config)))
}

/// Gate for settings commands: `MANAGE_GUILD` or a configured admin role.
/// Moderator roles do not count here.
pub async fn admin_guard(ctx: Context<'_>) -> Result<Option<serenity::GuildId>, Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(None);
    };

    let config = fetch_config(&ctx.data().db, guild_id.get()).await;
    let access = resolve_member_access(ctx.http(), guild_id, ctx.author().id).await?;
    if let Some(denial) = access_denial(
        &access,
        serenity::Permissions::MANAGE_GUILD,
        &[],
        &config.permissions.admin_role_ids,
    ) {
        ctx.say(denial).await?;
        return Ok(None);
    }

    Ok(Some(guild_id))
}

/// Reply for a member who fails the gate, `None` when they pass.
fn access_denial(
    access: &MemberAccess,
    required: serenity::Permissions,
    moderator_role_ids: &[u64],
    admin_role_ids: &[u64],
) -> Option<String> {
    (!access.allows(required, moderator_role_ids, admin_role_ids))
        .then(|| permission_denied_message(required))
}

/// Command entry point shared by the action commands.
///
/// A timeout without an explicit duration uses the guild's default.
pub async fn run_action(
    ctx: Context<'_>,
    case_type: CaseType,
    required: serenity::Permissions,
    user: serenity::User,
    duration_ms: Option<u64>,
    reason: Option<String>,
) -> Result<(), Error> {
    let Some((guild_id, config)) = moderation_guard(ctx, required).await? else {
        return Ok(());
    };

    if user.bot {
        ctx.say(moderation_bot_target_message()).await?;
        return Ok(());
    }
    if user.id == ctx.author().id {
        ctx.say(moderation_self_action_message(case_type.as_str()))
            .await?;
        return Ok(());
    }

    let guild_name = ctx
        .guild()
        .map(|guild| guild.name.clone())
        .unwrap_or_else(|| format!("Server {}", guild_id.get()));
    let bot_user = ctx.serenity_context().cache.current_user().clone();

    let request = ActionRequest {
        guild_id: guild_id.get(),
        guild_name,
        case_type,
        target_id: user.id.get(),
        target_tag: user.tag(),
        moderator: Actor {
            id: ctx.author().id.get(),
            tag: ctx.author().tag(),
        },
        bot: Actor {
            id: bot_user.id.get(),
            tag: bot_user.tag(),
        },
        reason: reason
            .filter(|reason| !reason.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REASON.to_owned()),
        duration_ms: match (case_type, duration_ms) {
            (CaseType::Timeout, None) => {
                Some(config.defaults.timeout_minutes.saturating_mul(60_000))
            }
            (_, duration_ms) => duration_ms,
        },
    };

    let gateway = SerenityGateway::new(ctx.serenity_context().http.clone());
    let report = match execute_action(&gateway, &ctx.data().db, request).await {
        Ok(report) => report,
        Err(source) if is_missing_permissions(&source) => {
            warn!(?source, guild_id = guild_id.get(), "missing permissions for moderation action");
            ctx.say(format!(
                "I couldn't {} that user. Check role hierarchy and permissions.",
                case_type
            ))
            .await?;
            return Ok(());
        }
        Err(source) => {
            error!(?source, guild_id = guild_id.get(), "moderation action failed");
            return Err(source);
        }
    };

    let embed = moderation_action_embed(
        &target_profile_from_user(&user),
        &report,
        past_tense(case_type),
    );
    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude as serenity;
    use serde_json::json;

    use super::{ActionRequest, access_denial, execute_action};
    use crate::moderation::escalation::{Actor, EscalationOutcome};
    use crate::moderation::gateway::testing::{Call, RecordingGateway};
    use warden_database::impls::cases::list_cases;
    use warden_database::model::cases::{CaseFilters, CaseType};
    use warden_database::{CacheService, Database};
    use warden_utils::permissions::MemberAccess;

    fn member(permissions: serenity::Permissions, role_ids: Vec<u64>) -> MemberAccess {
        MemberAccess {
            permissions,
            role_ids,
            is_owner: false,
        }
    }

    #[test]
    fn members_without_access_get_a_reply() {
        let plain = member(serenity::Permissions::SEND_MESSAGES, vec![]);
        let denial = access_denial(&plain, serenity::Permissions::KICK_MEMBERS, &[], &[])
            .expect("denied");
        assert!(denial.starts_with("You are not permitted to use this command."));
        assert!(denial.contains("Kick Members"));

        let kicker = member(serenity::Permissions::KICK_MEMBERS, vec![]);
        assert_eq!(
            access_denial(&kicker, serenity::Permissions::KICK_MEMBERS, &[], &[]),
            None
        );
    }

    #[test]
    fn moderator_roles_do_not_open_the_admin_gate() {
        let moderator = member(serenity::Permissions::empty(), vec![5]);
        assert_eq!(
            access_denial(&moderator, serenity::Permissions::BAN_MEMBERS, &[5], &[]),
            None
        );
        assert!(
            access_denial(&moderator, serenity::Permissions::MANAGE_GUILD, &[], &[7]).is_some()
        );

        let admin = member(serenity::Permissions::empty(), vec![7]);
        assert_eq!(
            access_denial(&admin, serenity::Permissions::MANAGE_GUILD, &[], &[7]),
            None
        );
    }

    fn request(case_type: CaseType, duration_ms: Option<u64>) -> ActionRequest {
        ActionRequest {
            guild_id: 1,
            guild_name: "Guild".to_owned(),
            case_type,
            target_id: 10,
            target_tag: "target".to_owned(),
            moderator: Actor {
                id: 20,
                tag: "mod".to_owned(),
            },
            bot: Actor {
                id: 99,
                tag: "Warden#0001".to_owned(),
            },
            reason: "spam".to_owned(),
            duration_ms,
        }
    }

    async fn case_count(db: &Database) -> usize {
        list_cases(
            db,
            1,
            CaseFilters {
                target_id: Some(10),
                moderator_id: None,
                case_type: None,
                limit: 100,
            },
        )
        .await
        .expect("list")
        .len()
    }

    #[tokio::test]
    async fn cold_guild_third_warn_times_out_the_target() {
        let (db, backend) = Database::in_memory(CacheService::memory("test"));
        backend.seed_config(1, json!({ "logChannels": { "moderation": 501 } }));
        let gateway = RecordingGateway::default();

        for _ in 0..2 {
            let report = execute_action(&gateway, &db, request(CaseType::Warn, None))
                .await
                .expect("warn");
            assert!(report.escalation.is_none());
            assert!(report.logged);
        }
        assert!(gateway.actions().is_empty());

        let third = execute_action(&gateway, &db, request(CaseType::Warn, None))
            .await
            .expect("third warn");

        let (escalation, outcome) = third.escalation.expect("escalates");
        assert_eq!(escalation.rule.id, "warn-3-timeout-1h");
        assert_eq!(escalation.trigger_count, 3);
        assert!(matches!(outcome, EscalationOutcome::Applied { .. }));
        assert_eq!(
            gateway.actions(),
            vec![Call::Timeout {
                guild_id: 1,
                target_id: 10,
                duration_ms: 3_600_000,
            }]
        );
        assert_eq!(case_count(&db).await, 4);
    }

    #[tokio::test]
    async fn rejected_action_leaves_no_case() {
        let (db, _backend) = Database::in_memory(CacheService::memory("test"));
        let gateway = RecordingGateway {
            fail_actions: true,
            ..Default::default()
        };

        let result = execute_action(&gateway, &db, request(CaseType::Kick, None)).await;

        assert!(result.is_err());
        assert_eq!(case_count(&db).await, 0);
    }

    #[tokio::test]
    async fn bans_notify_before_applying() {
        let (db, _backend) = Database::in_memory(CacheService::memory("test"));
        let gateway = RecordingGateway::default();

        let report = execute_action(&gateway, &db, request(CaseType::Ban, None))
            .await
            .expect("ban");

        assert!(report.notified);
        assert!(!report.logged);
        let calls = gateway.calls();
        assert!(matches!(calls[0], Call::DirectMessage { user_id: 10, .. }));
        assert!(matches!(calls[1], Call::Ban { guild_id: 1, target_id: 10 }));
    }

    #[tokio::test]
    async fn timeout_without_duration_is_rejected() {
        let (db, _backend) = Database::in_memory(CacheService::memory("test"));
        let gateway = RecordingGateway::default();

        let result = execute_action(&gateway, &db, request(CaseType::Timeout, None)).await;

        assert!(result.is_err());
        assert_eq!(case_count(&db).await, 0);
    }

    #[tokio::test]
    async fn timeout_records_its_duration() {
        let (db, _backend) = Database::in_memory(CacheService::memory("test"));
        let gateway = RecordingGateway::default();

        let report = execute_action(&gateway, &db, request(CaseType::Timeout, Some(600_000)))
            .await
            .expect("timeout");

        assert_eq!(report.case.duration_ms, Some(600_000));
        assert!(report.escalation.is_none());
    }
}
