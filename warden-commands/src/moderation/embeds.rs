use poise::serenity_prelude as serenity;

use warden_database::impls::cases::Escalation;
use warden_database::impls::escalation::describe_action;
use warden_database::model::cases::ModerationCase;
use warden_database::model::config::{FilterAction, FilterLevel, LogCategory, ModerationConfig};
use warden_database::model::features::Feature;
use warden_utils::embed::{DEFAULT_EMBED_COLOR, action_color};
use warden_utils::formatting::{
    action_display_name, format_case_label, format_duration_ms, truncate_chars,
};

use crate::moderation::actions::ActionReport;
use crate::moderation::escalation::EscalationOutcome;

#[derive(Clone, Debug)]
pub struct TargetProfile {
    pub display_name: String,
    pub avatar_url: Option<String>,
}

pub fn target_profile_from_user(user: &serenity::User) -> TargetProfile {
    TargetProfile {
        display_name: user
            .global_name
            .clone()
            .unwrap_or_else(|| user.name.clone()),
        avatar_url: Some(user.face()),
    }
}

/// Reply shown to the moderator after an action went through.
pub fn moderation_action_embed(
    target_profile: &TargetProfile,
    report: &ActionReport,
    action_past_tense: &str,
) -> serenity::CreateEmbed {
    let case = &report.case;
    let mut lines = vec![
        format!("**Target :** <@{}>", case.target_id),
        format!("**Reason :** {}", clean(&case.reason)),
    ];
    if let Some(duration_ms) = case.duration_ms {
        lines.push(format!("**Duration :** {}", format_duration_ms(duration_ms)));
    }
    if let Some((escalation, outcome)) = &report.escalation {
        lines.push(String::new());
        lines.push(escalation_line(escalation, outcome));
    }
    if !report.logged {
        lines.push(String::new());
        lines.push("_No log channel received this case._".to_owned());
    }

    let heading = format!(
        "{} has been {}",
        target_profile.display_name, action_past_tense
    );
    let mut embed = serenity::CreateEmbed::new()
        .color(action_color(case.case_type.as_str()))
        .description(lines.join("\n"))
        .footer(serenity::CreateEmbedFooter::new(format_case_label(
            case.case_number,
        )));

    embed = match target_profile.avatar_url.as_deref() {
        Some(url) => embed.author(serenity::CreateEmbedAuthor::new(heading).icon_url(url)),
        None => embed.title(heading),
    };

    embed
}

fn escalation_line(escalation: &Escalation, outcome: &EscalationOutcome) -> String {
    match outcome {
        EscalationOutcome::Applied { case } => format!(
            "**Escalation :** {} applied by rule `{}` ({})",
            describe_action(&escalation.action),
            escalation.rule.id,
            format_case_label(case.case_number)
        ),
        EscalationOutcome::Failed { .. } => format!(
            "**Escalation :** rule `{}` reached but {} could not be applied",
            escalation.rule.id,
            describe_action(&escalation.action)
        ),
    }
}

pub fn case_detail_embed(case: &ModerationCase) -> serenity::CreateEmbed {
    let mut lines = vec![
        format!("**Action :** {}", action_display_name(case.case_type.as_str())),
        format!("**Target :** <@{}> ({})", case.target_id, case.target_tag),
        format!(
            "**Moderator :** <@{}> ({})",
            case.moderator_id, case.moderator_tag
        ),
        format!("**Reason :** {}", clean(&case.reason)),
    ];
    if let Some(duration_ms) = case.duration_ms {
        lines.push(format!("**Duration :** {}", format_duration_ms(duration_ms)));
    }
    if let Some(severity) = &case.severity {
        lines.push(format!("**Severity :** {severity}"));
    }
    if let Some(source_case_id) = case.metadata.source_case_id {
        lines.push(format!(
            "**Escalated from :** case ID {} (rule `{}`)",
            source_case_id,
            case.metadata.escalation_rule_id.as_deref().unwrap_or("?")
        ));
    }
    lines.push(format!("**When :** <t:{}:f>", case.created_at.timestamp()));

    serenity::CreateEmbed::new()
        .title(format!("Case {}", format_case_label(case.case_number)))
        .color(action_color(case.case_type.as_str()))
        .description(lines.join("\n"))
}

pub fn case_list_description(cases: &[ModerationCase]) -> String {
    if cases.is_empty() {
        return "No cases found.".to_owned();
    }

    cases
        .iter()
        .map(|case| {
            format!(
                "`{}` **{}** <@{}> <t:{}:R>: {}",
                format_case_label(case.case_number),
                action_display_name(case.case_type.as_str()),
                case.target_id,
                case.created_at.timestamp(),
                truncate_chars(&clean(&case.reason), 80)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn config_summary_embed(config: &ModerationConfig) -> serenity::CreateEmbed {
    let channels = LogCategory::ALL
        .into_iter()
        .filter_map(|category| {
            config
                .log_channels
                .get(category)
                .map(|channel_id| format!("`{category}` → <#{channel_id}>"))
        })
        .collect::<Vec<_>>();
    let channels = if channels.is_empty() {
        "None configured".to_owned()
    } else {
        channels.join("\n")
    };

    let ladder = escalation_ladder_description(config);
    let notifications = format!(
        "DM on action: **{}**\nInclude reason: **{}**",
        on_off(config.notifications.dm_on_action),
        on_off(config.notifications.dm_include_reason)
    );

    serenity::CreateEmbed::new()
        .title("Moderation Config")
        .color(DEFAULT_EMBED_COLOR)
        .field("Log channels", channels, false)
        .field("Warn escalation", ladder, false)
        .field("Notifications", notifications, false)
        .field("Content filter", filter_summary(config), true)
        .field(
            "Default timeout",
            format!("{} minute(s)", config.defaults.timeout_minutes),
            true,
        )
        .field(
            "Retention",
            format!(
                "cases {}d, logs {}d",
                config.retention.case_retention_days, config.retention.log_retention_days
            ),
            true,
        )
}

pub fn escalation_ladder_description(config: &ModerationConfig) -> String {
    if config.escalation.warn.is_empty() {
        return "No escalation rules.".to_owned();
    }

    let mut rules: Vec<_> = config.escalation.warn.iter().collect();
    rules.sort_by_key(|rule| rule.threshold);
    rules
        .into_iter()
        .map(|rule| {
            format!(
                "**{}** warns → {} (`{}`)",
                rule.threshold,
                describe_action(&rule.action),
                rule.id
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Selected filter level and what it does.
pub fn filter_summary(config: &ModerationConfig) -> String {
    let level = match config.filters.level {
        FilterLevel::Level1 => 1,
        FilterLevel::Level2 => 2,
        FilterLevel::Level3 => 3,
    };
    let action = match config.filters.active_action() {
        FilterAction::Timeout { duration_ms } => {
            format!("timeout {}", format_duration_ms(*duration_ms))
        }
        FilterAction::Kick => "kick".to_owned(),
        FilterAction::Ban => "ban".to_owned(),
    };

    format!("level {level}: {action}")
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

fn clean(text: &str) -> String {
    text.replace('@', "@\u{200B}")
}

pub fn usage_message(usage: &str) -> String {
    format!("Usage: `{usage}`")
}

pub fn guild_only_message() -> &'static str {
    "This command only works in servers."
}

pub fn feature_disabled_message(feature: Feature) -> String {
    format!(
        "{} is disabled on this server. An admin can enable it with `!feature`.",
        feature.display_name()
    )
}

pub fn permission_denied_message(required: serenity::Permissions) -> String {
    format!(
        "You are not permitted to use this command. It needs `{}` or a configured staff role.",
        required.get_permission_names().join(", ")
    )
}

pub fn moderation_self_action_message(action: &str) -> String {
    format!("You can't {action} yourself.")
}

pub fn moderation_bot_target_message() -> &'static str {
    "You can't use moderation actions on bots or application accounts."
}
