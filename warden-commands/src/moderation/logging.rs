use tracing::{debug, warn};

use warden_database::Database;
use warden_database::impls::mod_config::fetch_config;
use warden_database::model::cases::{CaseType, ModerationCase, NewCase};
use warden_database::model::config::{LogCategory, ModerationConfig};
use warden_utils::embed::action_color;
use warden_utils::formatting::{
    action_display_name, format_case_label, format_duration_ms, truncate_chars,
};
use warden_utils::time::{discord_relative_timestamp, unix_secs_after};

use crate::moderation::gateway::{Gateway, LogMessage};

/// Embed field values are capped at 1024 characters by Discord.
const FIELD_VALUE_LIMIT: usize = 1024;

/// Post `message` to the guild's channel for `category`.
///
/// Falls back to the moderation channel when the category has none. Returns
/// `false` when neither is configured or delivery failed; both are logged.
pub async fn send_log(
    gateway: &dyn Gateway,
    db: &Database,
    guild_id: u64,
    category: LogCategory,
    message: &LogMessage,
) -> bool {
    let config = fetch_config(db, guild_id).await;

    let Some(channel_id) = config.log_channels.resolve(category) else {
        warn!(guild_id, category = %category, "no log channel configured");
        return false;
    };

    match gateway.post_message(channel_id, message).await {
        Ok(()) => true,
        Err(source) => {
            warn!(
                ?source,
                guild_id,
                channel_id,
                category = %category,
                "failed to deliver log message"
            );
            false
        }
    }
}

/// Post a case summary to the `cases` log category.
pub async fn log_case(
    gateway: &dyn Gateway,
    db: &Database,
    guild_id: u64,
    case: &ModerationCase,
) -> bool {
    send_log(gateway, db, guild_id, LogCategory::Cases, &case_log_message(case)).await
}

pub fn case_log_message(case: &ModerationCase) -> LogMessage {
    let mut message = LogMessage::new(format!("Case {}", format_case_label(case.case_number)))
        .color(action_color(case.case_type.as_str()))
        .field("Action", action_display_name(case.case_type.as_str()))
        .field(
            "Target",
            format!("<@{}> ({})", case.target_id, case.target_tag),
        )
        .field(
            "Moderator",
            format!("<@{}> ({})", case.moderator_id, case.moderator_tag),
        )
        .field("Reason", sanitize(&case.reason));

    if let Some(duration_ms) = case.duration_ms {
        let created_unix = u64::try_from(case.created_at.timestamp()).unwrap_or_default();
        let ends = unix_secs_after(created_unix, duration_ms);
        message = message.field(
            "Duration",
            format!(
                "{} (ends {})",
                format_duration_ms(duration_ms),
                discord_relative_timestamp(ends)
            ),
        );
    }

    if let Some(severity) = &case.severity {
        message = message.field("Severity", severity.clone());
    }

    if let (Some(rule_id), Some(trigger_count)) = (
        case.metadata.escalation_rule_id.as_deref(),
        case.metadata.trigger_count,
    ) {
        message = message.field(
            "Escalation",
            format!("`{rule_id}` after {trigger_count} case(s)"),
        );
    }

    message.footer(format!("Case ID {}", case.id))
}

/// DM the target about an action, if the guild allows it.
///
/// The reason is only included when `dmIncludeReason` is set. Failures are
/// expected (closed DMs) and only logged at debug level.
pub async fn notify_target(
    gateway: &dyn Gateway,
    config: &ModerationConfig,
    notice: &NewCase,
    guild_name: &str,
) -> bool {
    if !config.notifications.dm_on_action {
        return false;
    }

    let message = direct_notice(config, notice, guild_name);
    match gateway.send_direct_message(notice.target_id, &message).await {
        Ok(()) => true,
        Err(source) => {
            debug!(?source, target_id = notice.target_id, "could not DM moderation target");
            false
        }
    }
}

fn direct_notice(config: &ModerationConfig, notice: &NewCase, guild_name: &str) -> LogMessage {
    let mut message = LogMessage::new(format!(
        "You have been {} in {}",
        past_tense(notice.case_type),
        guild_name
    ))
    .color(action_color(notice.case_type.as_str()));

    if config.notifications.dm_include_reason {
        message = message.field("Reason", sanitize(&notice.reason));
    }
    if let Some(duration_ms) = notice.duration_ms {
        message = message.field("Duration", format_duration_ms(duration_ms));
    }

    message
}

pub fn past_tense(case_type: CaseType) -> &'static str {
    match case_type {
        CaseType::Warn => "warned",
        CaseType::Mute => "muted",
        CaseType::Ban => "banned",
        CaseType::Kick => "kicked",
        CaseType::Timeout => "timed out",
    }
}

fn sanitize(text: &str) -> String {
    truncate_chars(&text.replace('@', "@\u{200B}"), FIELD_VALUE_LIMIT)
}
