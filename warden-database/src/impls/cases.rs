use anyhow::Context as _;
use chrono::Utc;
use tracing::info;

use crate::database::Database;
use crate::impls::escalation::evaluate;
use crate::impls::mod_config::fetch_config;
use crate::model::cases::{CaseFilters, CaseMetadata, ModerationCase, NewCase};
use crate::model::config::{EscalationAction, EscalationRule};

/// Upper bound for a single case listing.
pub const MAX_CASE_LISTING: u32 = 100;

/// An automated follow-up the caller is expected to apply.
#[derive(Clone, Debug, PartialEq)]
pub struct Escalation {
    pub rule: EscalationRule,
    pub action: EscalationAction,
    /// Number of same-type cases, the new one included, that hit the rule.
    pub trigger_count: u64,
}

/// Result of recording a case.
#[derive(Clone, Debug)]
pub struct CaseOutcome {
    pub case: ModerationCase,
    pub escalation: Option<Escalation>,
}

/// Record a moderation case and work out whether it escalates.
///
/// Nothing is applied on the platform here. When `escalation` is returned the
/// caller applies the action and, once it took effect, records the automated
/// case built by [`escalation_follow_up`] through this same function.
///
/// Insert and count are serialised per (guild, target) within this process.
/// Persistence and counting errors propagate.
pub async fn create_moderation_case(
    db: &Database,
    new_case: NewCase,
) -> anyhow::Result<CaseOutcome> {
    let _guard = db
        .case_locks()
        .acquire(new_case.guild_id, new_case.target_id)
        .await;

    let case = db
        .backend()
        .insert_case(&new_case, Utc::now())
        .await
        .context("failed to persist moderation case")?;

    info!(
        guild_id = case.guild_id,
        case_id = case.id,
        case_number = ?case.case_number,
        case_type = %case.case_type,
        target_id = case.target_id,
        "moderation case recorded"
    );

    let config = fetch_config(db, case.guild_id).await;
    let ladder = config.escalation.for_case_type(case.case_type);
    if ladder.is_empty() {
        return Ok(CaseOutcome {
            case,
            escalation: None,
        });
    }

    let trigger_count = db
        .backend()
        .count_cases(case.guild_id, case.target_id, case.case_type)
        .await
        .context("failed to count prior cases for escalation")?;

    let escalation = evaluate(ladder, trigger_count).map(|rule| Escalation {
        rule: rule.clone(),
        action: rule.action.clone(),
        trigger_count,
    });

    if let Some(escalation) = &escalation {
        info!(
            guild_id = case.guild_id,
            target_id = case.target_id,
            rule_id = %escalation.rule.id,
            trigger_count,
            "escalation threshold reached"
        );
    }

    Ok(CaseOutcome { case, escalation })
}

/// Input for the linked case documenting an applied escalation.
pub fn escalation_follow_up(
    source: &ModerationCase,
    escalation: &Escalation,
    moderator_id: u64,
    moderator_tag: &str,
) -> NewCase {
    NewCase {
        guild_id: source.guild_id,
        case_type: escalation.action.case_type(),
        target_id: source.target_id,
        target_tag: source.target_tag.clone(),
        moderator_id,
        moderator_tag: moderator_tag.to_owned(),
        reason: escalation.action.reason().to_owned(),
        severity: source.severity.clone(),
        duration_ms: escalation.action.duration_ms(),
        metadata: CaseMetadata {
            escalation_rule_id: Some(escalation.rule.id.clone()),
            trigger_count: Some(escalation.trigger_count),
            source_case_id: Some(source.id),
            ..Default::default()
        },
    }
}

pub async fn list_cases(
    db: &Database,
    guild_id: u64,
    mut filters: CaseFilters,
) -> anyhow::Result<Vec<ModerationCase>> {
    filters.limit = filters.limit.clamp(1, MAX_CASE_LISTING);
    db.backend().list_cases(guild_id, &filters).await
}

pub async fn get_case(
    db: &Database,
    guild_id: u64,
    case_number: u64,
) -> anyhow::Result<Option<ModerationCase>> {
    db.backend().get_case(guild_id, case_number).await
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::task::JoinSet;

    use super::{create_moderation_case, escalation_follow_up, get_case, list_cases};
    use crate::cache::CacheService;
    use crate::database::Database;
    use crate::model::cases::{CaseFilters, CaseMetadata, CaseType, NewCase};
    use crate::model::config::EscalationAction;

    fn new_case(guild_id: u64, case_type: CaseType, target_id: u64, reason: &str) -> NewCase {
        NewCase {
            guild_id,
            case_type,
            target_id,
            target_tag: format!("user{target_id}"),
            moderator_id: 900,
            moderator_tag: "mod".to_owned(),
            reason: reason.to_owned(),
            severity: None,
            duration_ms: None,
            metadata: CaseMetadata::default(),
        }
    }

    #[tokio::test]
    async fn cold_guild_escalates_on_the_third_warn() {
        let (db, _backend) = Database::in_memory(CacheService::memory("test"));

        let first = create_moderation_case(&db, new_case(1, CaseType::Warn, 10, "spam"))
            .await
            .expect("first");
        let second = create_moderation_case(&db, new_case(1, CaseType::Warn, 10, "caps"))
            .await
            .expect("second");
        let third = create_moderation_case(&db, new_case(1, CaseType::Warn, 10, "insults"))
            .await
            .expect("third");

        assert!(first.escalation.is_none());
        assert!(second.escalation.is_none());

        let escalation = third.escalation.expect("third warn escalates");
        assert_eq!(escalation.trigger_count, 3);
        assert_eq!(escalation.rule.id, "warn-3-timeout-1h");
        assert!(matches!(
            escalation.action,
            EscalationAction::Timeout {
                duration_ms: 3_600_000,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn counts_are_per_target_and_per_type() {
        let (db, _backend) = Database::in_memory(CacheService::memory("test"));

        for _ in 0..2 {
            create_moderation_case(&db, new_case(1, CaseType::Warn, 10, "a"))
                .await
                .expect("warn");
        }
        create_moderation_case(&db, new_case(1, CaseType::Kick, 10, "b"))
            .await
            .expect("kick");
        let other_target = create_moderation_case(&db, new_case(1, CaseType::Warn, 11, "c"))
            .await
            .expect("other target");
        let other_guild = create_moderation_case(&db, new_case(2, CaseType::Warn, 10, "d"))
            .await
            .expect("other guild");

        assert!(other_target.escalation.is_none());
        assert!(other_guild.escalation.is_none());

        let third = create_moderation_case(&db, new_case(1, CaseType::Warn, 10, "e"))
            .await
            .expect("third");
        assert_eq!(third.escalation.map(|e| e.trigger_count), Some(3));
    }

    #[tokio::test]
    async fn non_warn_cases_never_escalate() {
        let (db, _backend) = Database::in_memory(CacheService::memory("test"));

        for _ in 0..5 {
            let outcome = create_moderation_case(&db, new_case(1, CaseType::Timeout, 10, "t"))
                .await
                .expect("timeout");
            assert!(outcome.escalation.is_none());
        }
    }

    #[tokio::test]
    async fn fourth_warn_is_quiet_and_fifth_bans() {
        let (db, _backend) = Database::in_memory(CacheService::memory("test"));
        let mut outcomes = Vec::new();
        for index in 0..6 {
            outcomes.push(
                create_moderation_case(&db, new_case(1, CaseType::Warn, 10, &format!("w{index}")))
                    .await
                    .expect("warn"),
            );
        }

        let fired: Vec<_> = outcomes
            .iter()
            .map(|outcome| outcome.escalation.as_ref().map(|e| e.rule.id.as_str()))
            .collect();
        assert_eq!(
            fired,
            vec![
                None,
                None,
                Some("warn-3-timeout-1h"),
                None,
                Some("warn-5-ban"),
                None
            ]
        );
    }

    #[tokio::test]
    async fn guild_ladder_override_is_used() {
        let (db, backend) = Database::in_memory(CacheService::memory("test"));
        backend.seed_config(
            1,
            json!({ "escalation": { "warn": [
                { "id": "warn-1-kick", "threshold": 1, "action": { "kind": "kick", "reason": "r" } }
            ] } }),
        );

        let outcome = create_moderation_case(&db, new_case(1, CaseType::Warn, 10, "x"))
            .await
            .expect("warn");
        assert_eq!(
            outcome.escalation.map(|e| e.rule.id),
            Some("warn-1-kick".to_owned())
        );
    }

    #[tokio::test]
    async fn cases_are_numbered_per_guild() {
        let (db, _backend) = Database::in_memory(CacheService::memory("test"));

        let a = create_moderation_case(&db, new_case(1, CaseType::Ban, 10, "x")).await.expect("a");
        let b = create_moderation_case(&db, new_case(2, CaseType::Ban, 10, "x")).await.expect("b");
        let c = create_moderation_case(&db, new_case(1, CaseType::Kick, 11, "x")).await.expect("c");

        assert_eq!(a.case.case_number, Some(1));
        assert_eq!(b.case.case_number, Some(1));
        assert_eq!(c.case.case_number, Some(2));
        assert_ne!(a.case.id, c.case.id);
    }

    #[tokio::test]
    async fn failed_insert_propagates() {
        let (db, backend) = Database::in_memory(CacheService::memory("test"));
        backend.set_fail_writes(true);

        let result = create_moderation_case(&db, new_case(1, CaseType::Warn, 10, "x")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn follow_up_links_back_to_the_source_case() {
        let (db, _backend) = Database::in_memory(CacheService::memory("test"));
        let mut last = None;
        for _ in 0..3 {
            last = Some(
                create_moderation_case(&db, new_case(1, CaseType::Warn, 10, "w"))
                    .await
                    .expect("warn"),
            );
        }
        let source = last.expect("ran three times");
        let escalation = source.escalation.clone().expect("escalated");

        let follow_up = escalation_follow_up(&source.case, &escalation, 1, "Warden#0001");
        assert_eq!(follow_up.case_type, CaseType::Timeout);
        assert_eq!(follow_up.duration_ms, Some(3_600_000));
        assert_eq!(follow_up.reason, "Automatische Auszeit nach 3 Verwarnungen.");

        let linked = create_moderation_case(&db, follow_up).await.expect("linked");
        assert!(linked.escalation.is_none());
        assert_eq!(linked.case.metadata.source_case_id, Some(source.case.id));
        assert_eq!(
            linked.case.metadata.escalation_rule_id.as_deref(),
            Some("warn-3-timeout-1h")
        );
        assert_eq!(linked.case.metadata.trigger_count, Some(3));
        assert_eq!(linked.case.moderator_tag, "Warden#0001");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_warns_see_distinct_counts() {
        let (db, _backend) = Database::in_memory(CacheService::memory("test"));
        let mut tasks = JoinSet::new();

        for index in 0..5 {
            let db = db.clone();
            tasks.spawn(async move {
                create_moderation_case(&db, new_case(1, CaseType::Warn, 10, &format!("w{index}")))
                    .await
            });
        }

        let mut fired = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.expect("task").expect("case");
            if let Some(escalation) = outcome.escalation {
                fired.push(escalation.trigger_count);
            }
        }
        fired.sort_unstable();

        assert_eq!(fired, vec![3, 5]);
        assert_eq!(db.case_locks().len(), 0);
    }

    #[tokio::test]
    async fn finished_cases_leave_no_lock_entries() {
        let (db, _backend) = Database::in_memory(CacheService::memory("test"));

        for target_id in 0..200 {
            create_moderation_case(&db, new_case(1, CaseType::Kick, target_id, "raid"))
                .await
                .expect("case");
        }

        assert_eq!(db.case_locks().len(), 0);
    }

    #[tokio::test]
    async fn failed_insert_releases_its_lock_entry() {
        let (db, backend) = Database::in_memory(CacheService::memory("test"));
        backend.set_fail_writes(true);

        assert!(
            create_moderation_case(&db, new_case(1, CaseType::Warn, 10, "x"))
                .await
                .is_err()
        );
        assert_eq!(db.case_locks().len(), 0);
    }

    #[tokio::test]
    async fn listing_filters_and_lookup_by_number() {
        let (db, _backend) = Database::in_memory(CacheService::memory("test"));
        create_moderation_case(&db, new_case(1, CaseType::Warn, 10, "a")).await.expect("a");
        create_moderation_case(&db, new_case(1, CaseType::Ban, 11, "b")).await.expect("b");
        create_moderation_case(&db, new_case(1, CaseType::Warn, 11, "c")).await.expect("c");

        let warns = list_cases(
            &db,
            1,
            CaseFilters {
                target_id: None,
                moderator_id: None,
                case_type: Some(CaseType::Warn),
                limit: 10,
            },
        )
        .await
        .expect("list");
        let reasons: Vec<_> = warns.iter().map(|case| case.reason.as_str()).collect();
        assert_eq!(reasons, vec!["c", "a"]);

        let capped = list_cases(
            &db,
            1,
            CaseFilters {
                target_id: Some(11),
                moderator_id: None,
                case_type: None,
                limit: 0,
            },
        )
        .await
        .expect("list");
        assert_eq!(capped.len(), 1);

        let found = get_case(&db, 1, 2).await.expect("lookup").expect("exists");
        assert_eq!(found.reason, "b");
        assert!(get_case(&db, 1, 99).await.expect("lookup").is_none());
    }
}
