//! Applying escalations recommended by the case manager.

use tracing::{error, info};

use warden_database::Database;
use warden_database::impls::cases::{Escalation, create_moderation_case, escalation_follow_up};
use warden_database::impls::escalation::describe_action;
use warden_database::impls::mod_config::fetch_config;
use warden_database::model::cases::ModerationCase;
use warden_database::model::config::{EscalationAction, LogCategory};
use warden_utils::embed::SEVERE_EMBED_COLOR;

use crate::moderation::gateway::{Gateway, LogMessage, is_missing_permissions};
use crate::moderation::logging::{log_case, notify_target, send_log};

/// Identity recorded as moderator on automated cases.
#[derive(Clone, Debug)]
pub struct Actor {
    pub id: u64,
    pub tag: String,
}

#[derive(Debug)]
pub enum EscalationOutcome {
    /// The action took effect and was recorded as `case`.
    Applied { case: ModerationCase },
    /// The platform rejected the action; nothing was recorded.
    Failed { error: String },
}

/// Carry out `escalation` for the target of `source`.
///
/// On success a linked case is recorded, logged and the target notified. When
/// the platform call fails the error is logged, a notice goes to the
/// moderation log and no case is written. Errors persisting the linked case
/// propagate.
pub async fn apply_escalation(
    gateway: &dyn Gateway,
    db: &Database,
    source: &ModerationCase,
    escalation: &Escalation,
    actor: &Actor,
    guild_name: &str,
) -> anyhow::Result<EscalationOutcome> {
    let guild_id = source.guild_id;
    let target_id = source.target_id;
    let reason = escalation.action.reason();

    let applied = match &escalation.action {
        EscalationAction::Timeout { duration_ms, .. } => {
            gateway
                .apply_timeout(guild_id, target_id, *duration_ms, reason)
                .await
        }
        EscalationAction::Ban { .. } => gateway.apply_ban(guild_id, target_id, reason).await,
        EscalationAction::Kick { .. } => gateway.apply_kick(guild_id, target_id, reason).await,
    };

    if let Err(source_error) = applied {
        error!(
            source = ?source_error,
            guild_id,
            target_id,
            rule_id = %escalation.rule.id,
            missing_permissions = is_missing_permissions(&source_error),
            "failed to apply escalation"
        );

        let notice = failure_notice(source, escalation, &source_error);
        send_log(gateway, db, guild_id, LogCategory::Moderation, &notice).await;

        return Ok(EscalationOutcome::Failed {
            error: source_error.to_string(),
        });
    }

    let follow_up = escalation_follow_up(source, escalation, actor.id, &actor.tag);
    let outcome = create_moderation_case(db, follow_up.clone()).await?;

    info!(
        guild_id,
        target_id,
        rule_id = %escalation.rule.id,
        case_id = outcome.case.id,
        "escalation applied"
    );

    log_case(gateway, db, guild_id, &outcome.case).await;

    let config = fetch_config(db, guild_id).await;
    notify_target(gateway, &config, &follow_up, guild_name).await;

    Ok(EscalationOutcome::Applied { case: outcome.case })
}

fn failure_notice(
    source: &ModerationCase,
    escalation: &Escalation,
    error: &anyhow::Error,
) -> LogMessage {
    LogMessage::new("Automatic escalation failed")
        .color(SEVERE_EMBED_COLOR)
        .field("Rule", format!("`{}`", escalation.rule.id))
        .field("Action", describe_action(&escalation.action))
        .field(
            "Target",
            format!("<@{}> ({})", source.target_id, source.target_tag),
        )
        .field("Trigger count", escalation.trigger_count.to_string())
        .field("Error", error.to_string())
        .footer(format!("Source case ID {}", source.id))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Actor, EscalationOutcome, apply_escalation};
    use crate::moderation::gateway::testing::{Call, RecordingGateway};
    use warden_database::impls::cases::{CaseOutcome, create_moderation_case, list_cases};
    use warden_database::model::cases::{CaseFilters, CaseMetadata, CaseType, NewCase};
    use warden_database::{CacheService, Database};

    fn warn_case(target_id: u64) -> NewCase {
        NewCase {
            guild_id: 1,
            case_type: CaseType::Warn,
            target_id,
            target_tag: "target".to_owned(),
            moderator_id: 20,
            moderator_tag: "mod".to_owned(),
            reason: "spam".to_owned(),
            severity: None,
            duration_ms: None,
            metadata: CaseMetadata::default(),
        }
    }

    fn bot() -> Actor {
        Actor {
            id: 99,
            tag: "Warden#0001".to_owned(),
        }
    }

    async fn third_warn(db: &Database) -> CaseOutcome {
        let mut last = None;
        for _ in 0..3 {
            last = Some(create_moderation_case(db, warn_case(10)).await.expect("warn"));
        }
        last.expect("three warns")
    }

    async fn all_cases(db: &Database) -> usize {
        list_cases(
            db,
            1,
            CaseFilters {
                target_id: None,
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
    async fn applied_escalation_records_a_linked_case() {
        let (db, backend) = Database::in_memory(CacheService::memory("test"));
        backend.seed_config(1, json!({ "logChannels": { "moderation": 501 } }));
        let gateway = RecordingGateway::default();

        let source = third_warn(&db).await;
        let escalation = source.escalation.clone().expect("third warn escalates");

        let outcome = apply_escalation(&gateway, &db, &source.case, &escalation, &bot(), "Guild")
            .await
            .expect("apply");

        let EscalationOutcome::Applied { case } = outcome else {
            panic!("escalation should apply");
        };
        assert_eq!(case.case_type, CaseType::Timeout);
        assert_eq!(case.moderator_id, 99);
        assert_eq!(case.metadata.source_case_id, Some(source.case.id));
        assert_eq!(case.duration_ms, Some(3_600_000));

        assert_eq!(
            gateway.actions(),
            vec![Call::Timeout {
                guild_id: 1,
                target_id: 10,
                duration_ms: 3_600_000,
            }]
        );
        let posts = gateway.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, 501);
        assert_eq!(gateway.direct_messages().len(), 1);
        assert_eq!(all_cases(&db).await, 4);
    }

    #[tokio::test]
    async fn failed_escalation_records_nothing_and_reports() {
        let (db, backend) = Database::in_memory(CacheService::memory("test"));
        backend.seed_config(1, json!({ "logChannels": { "moderation": 501, "cases": 503 } }));
        let gateway = RecordingGateway {
            fail_actions: true,
            ..Default::default()
        };

        let source = third_warn(&db).await;
        let escalation = source.escalation.clone().expect("third warn escalates");

        let outcome = apply_escalation(&gateway, &db, &source.case, &escalation, &bot(), "Guild")
            .await
            .expect("failure is reported, not raised");

        assert!(matches!(outcome, EscalationOutcome::Failed { .. }));
        assert_eq!(all_cases(&db).await, 3);

        let posts = gateway.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0, 501);
        assert_eq!(posts[0].1.title, "Automatic escalation failed");
        assert_eq!(
            posts[0].1.field_value("Rule"),
            Some("`warn-3-timeout-1h`")
        );
        assert!(gateway.direct_messages().is_empty());
    }

    #[tokio::test]
    async fn ban_rule_applies_a_ban() {
        let (db, _backend) = Database::in_memory(CacheService::memory("test"));
        let gateway = RecordingGateway::default();

        let mut last = None;
        for _ in 0..5 {
            last = Some(create_moderation_case(&db, warn_case(10)).await.expect("warn"));
        }
        let source = last.expect("five warns");
        let escalation = source.escalation.clone().expect("fifth warn escalates");

        let outcome = apply_escalation(&gateway, &db, &source.case, &escalation, &bot(), "Guild")
            .await
            .expect("apply");

        assert!(matches!(outcome, EscalationOutcome::Applied { ref case } if case.case_type == CaseType::Ban));
        assert_eq!(
            gateway.actions(),
            vec![Call::Ban {
                guild_id: 1,
                target_id: 10,
            }]
        );
    }
}
