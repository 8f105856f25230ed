//! Per-guild moderation configuration.
//!
//! A guild's document is always the hard-coded defaults with the stored
//! patch merged on top. Patches use the `*Patch` mirror types below, where
//! every field is optional: nested groups merge field by field, vectors and
//! scalars replace, and absent fields leave the target untouched.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::model::cases::CaseType;

/// Apply a partial patch onto a fully populated value.
pub trait Merge {
    type Patch;

    fn merge(&mut self, patch: Self::Patch);
}

/// Overwrite every listed field whose patch value is present.
macro_rules! replace_fields {
    ($target:expr, $patch:expr; $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $patch.$field {
                $target.$field = value;
            }
        )+
    };
}

/// Recurse into every listed group whose patch value is present.
macro_rules! merge_groups {
    ($target:expr, $patch:expr; $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $patch.$field {
                $target.$field.merge(value);
            }
        )+
    };
}

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Root document
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationConfig {
    pub guild_id: u64,
    pub log_channels: LogChannels,
    pub escalation: EscalationLadders,
    pub soft_actions: SoftActions,
    pub filters: FilterConfig,
    pub rate_limits: RateLimits,
    pub raid: RaidConfig,
    pub notifications: NotificationConfig,
    pub retention: RetentionConfig,
    pub permissions: PermissionConfig,
    pub defaults: DefaultsConfig,
}

impl ModerationConfig {
    /// The document a guild gets when nothing has been stored for it.
    pub fn default_for(guild_id: u64) -> Self {
        Self {
            guild_id,
            log_channels: LogChannels::default(),
            escalation: EscalationLadders::default(),
            soft_actions: SoftActions::default(),
            filters: FilterConfig::default(),
            rate_limits: RateLimits::default(),
            raid: RaidConfig::default(),
            notifications: NotificationConfig::default(),
            retention: RetentionConfig::default(),
            permissions: PermissionConfig::default(),
            defaults: DefaultsConfig::default(),
        }
    }
}

/// Partial document. Unknown keys (including a stored `guildId`) are ignored.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModerationConfigPatch {
    pub log_channels: Option<LogChannelsPatch>,
    pub escalation: Option<EscalationLaddersPatch>,
    pub soft_actions: Option<SoftActionsPatch>,
    pub filters: Option<FilterConfigPatch>,
    pub rate_limits: Option<RateLimitsPatch>,
    pub raid: Option<RaidConfigPatch>,
    pub notifications: Option<NotificationConfigPatch>,
    pub retention: Option<RetentionConfigPatch>,
    pub permissions: Option<PermissionConfigPatch>,
    pub defaults: Option<DefaultsConfigPatch>,
}

impl Merge for ModerationConfig {
    type Patch = ModerationConfigPatch;

    fn merge(&mut self, patch: Self::Patch) {
        merge_groups!(self, patch;
            log_channels,
            escalation,
            soft_actions,
            filters,
            rate_limits,
            raid,
            notifications,
            retention,
            permissions,
            defaults,
        );
    }
}

// ---------------------------------------------------------------------------
// Log channels
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LogCategory {
    Moderation,
    Cases,
    Joins,
    Leaves,
    NameChanges,
    AvatarChanges,
    MessageDeletes,
    MessageEdits,
    Bans,
    Unbans,
    Timeouts,
    RoleChanges,
}

impl LogCategory {
    pub const ALL: [LogCategory; 12] = [
        LogCategory::Moderation,
        LogCategory::Cases,
        LogCategory::Joins,
        LogCategory::Leaves,
        LogCategory::NameChanges,
        LogCategory::AvatarChanges,
        LogCategory::MessageDeletes,
        LogCategory::MessageEdits,
        LogCategory::Bans,
        LogCategory::Unbans,
        LogCategory::Timeouts,
        LogCategory::RoleChanges,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LogCategory::Moderation => "moderation",
            LogCategory::Cases => "cases",
            LogCategory::Joins => "joins",
            LogCategory::Leaves => "leaves",
            LogCategory::NameChanges => "nameChanges",
            LogCategory::AvatarChanges => "avatarChanges",
            LogCategory::MessageDeletes => "messageDeletes",
            LogCategory::MessageEdits => "messageEdits",
            LogCategory::Bans => "bans",
            LogCategory::Unbans => "unbans",
            LogCategory::Timeouts => "timeouts",
            LogCategory::RoleChanges => "roleChanges",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogCategory {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim();
        LogCategory::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| anyhow::anyhow!("unknown log category `{wanted}`"))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogChannels {
    pub moderation: Option<u64>,
    pub cases: Option<u64>,
    pub joins: Option<u64>,
    pub leaves: Option<u64>,
    pub name_changes: Option<u64>,
    pub avatar_changes: Option<u64>,
    pub message_deletes: Option<u64>,
    pub message_edits: Option<u64>,
    pub bans: Option<u64>,
    pub unbans: Option<u64>,
    pub timeouts: Option<u64>,
    pub role_changes: Option<u64>,
}

impl LogChannels {
    pub fn get(&self, category: LogCategory) -> Option<u64> {
        match category {
            LogCategory::Moderation => self.moderation,
            LogCategory::Cases => self.cases,
            LogCategory::Joins => self.joins,
            LogCategory::Leaves => self.leaves,
            LogCategory::NameChanges => self.name_changes,
            LogCategory::AvatarChanges => self.avatar_changes,
            LogCategory::MessageDeletes => self.message_deletes,
            LogCategory::MessageEdits => self.message_edits,
            LogCategory::Bans => self.bans,
            LogCategory::Unbans => self.unbans,
            LogCategory::Timeouts => self.timeouts,
            LogCategory::RoleChanges => self.role_changes,
        }
    }

    /// Destination for `category`, falling back to the moderation channel.
    pub fn resolve(&self, category: LogCategory) -> Option<u64> {
        self.get(category).or(self.moderation)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogChannelsPatch {
    #[serde(deserialize_with = "nullable")]
    pub moderation: Option<Option<u64>>,
    #[serde(deserialize_with = "nullable")]
    pub cases: Option<Option<u64>>,
    #[serde(deserialize_with = "nullable")]
    pub joins: Option<Option<u64>>,
    #[serde(deserialize_with = "nullable")]
    pub leaves: Option<Option<u64>>,
    #[serde(deserialize_with = "nullable")]
    pub name_changes: Option<Option<u64>>,
    #[serde(deserialize_with = "nullable")]
    pub avatar_changes: Option<Option<u64>>,
    #[serde(deserialize_with = "nullable")]
    pub message_deletes: Option<Option<u64>>,
    #[serde(deserialize_with = "nullable")]
    pub message_edits: Option<Option<u64>>,
    #[serde(deserialize_with = "nullable")]
    pub bans: Option<Option<u64>>,
    #[serde(deserialize_with = "nullable")]
    pub unbans: Option<Option<u64>>,
    #[serde(deserialize_with = "nullable")]
    pub timeouts: Option<Option<u64>>,
    #[serde(deserialize_with = "nullable")]
    pub role_changes: Option<Option<u64>>,
}

impl LogChannelsPatch {
    /// Patch touching exactly one category; `None` clears it.
    pub fn single(category: LogCategory, channel_id: Option<u64>) -> Self {
        let mut patch = Self::default();
        let slot = match category {
            LogCategory::Moderation => &mut patch.moderation,
            LogCategory::Cases => &mut patch.cases,
            LogCategory::Joins => &mut patch.joins,
            LogCategory::Leaves => &mut patch.leaves,
            LogCategory::NameChanges => &mut patch.name_changes,
            LogCategory::AvatarChanges => &mut patch.avatar_changes,
            LogCategory::MessageDeletes => &mut patch.message_deletes,
            LogCategory::MessageEdits => &mut patch.message_edits,
            LogCategory::Bans => &mut patch.bans,
            LogCategory::Unbans => &mut patch.unbans,
            LogCategory::Timeouts => &mut patch.timeouts,
            LogCategory::RoleChanges => &mut patch.role_changes,
        };
        *slot = Some(channel_id);
        patch
    }
}

impl Merge for LogChannels {
    type Patch = LogChannelsPatch;

    fn merge(&mut self, patch: Self::Patch) {
        replace_fields!(self, patch;
            moderation,
            cases,
            joins,
            leaves,
            name_changes,
            avatar_changes,
            message_deletes,
            message_edits,
            bans,
            unbans,
            timeouts,
            role_changes,
        );
    }
}

// ---------------------------------------------------------------------------
// Escalation
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum EscalationAction {
    Timeout { duration_ms: u64, reason: String },
    Ban { reason: String },
    Kick { reason: String },
}

impl EscalationAction {
    pub fn reason(&self) -> &str {
        match self {
            EscalationAction::Timeout { reason, .. }
            | EscalationAction::Ban { reason }
            | EscalationAction::Kick { reason } => reason,
        }
    }

    pub fn duration_ms(&self) -> Option<u64> {
        match self {
            EscalationAction::Timeout { duration_ms, .. } => Some(*duration_ms),
            EscalationAction::Ban { .. } | EscalationAction::Kick { .. } => None,
        }
    }

    /// Case type recorded once the action has been applied.
    pub fn case_type(&self) -> CaseType {
        match self {
            EscalationAction::Timeout { .. } => CaseType::Timeout,
            EscalationAction::Ban { .. } => CaseType::Ban,
            EscalationAction::Kick { .. } => CaseType::Kick,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationRule {
    pub id: String,
    pub threshold: u64,
    pub action: EscalationAction,
    #[serde(default)]
    pub note: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EscalationLadders {
    pub warn: Vec<EscalationRule>,
}

impl EscalationLadders {
    /// Ladder evaluated for new cases of `case_type`; empty when none applies.
    pub fn for_case_type(&self, case_type: CaseType) -> &[EscalationRule] {
        match case_type {
            CaseType::Warn => self.warn.as_slice(),
            CaseType::Mute | CaseType::Ban | CaseType::Kick | CaseType::Timeout => &[],
        }
    }
}

impl Default for EscalationLadders {
    fn default() -> Self {
        Self {
            warn: vec![
                EscalationRule {
                    id: "warn-3-timeout-1h".to_owned(),
                    threshold: 3,
                    action: EscalationAction::Timeout {
                        duration_ms: 3_600_000,
                        reason: "Automatische Auszeit nach 3 Verwarnungen.".to_owned(),
                    },
                    note: "Drei Verwarnungen führen zu einer Stunde Auszeit.".to_owned(),
                },
                EscalationRule {
                    id: "warn-5-ban".to_owned(),
                    threshold: 5,
                    action: EscalationAction::Ban {
                        reason: "Automatischer Bann nach 5 Verwarnungen.".to_owned(),
                    },
                    note: "Fünf Verwarnungen führen zum Bann.".to_owned(),
                },
            ],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EscalationLaddersPatch {
    pub warn: Option<Vec<EscalationRule>>,
}

impl Merge for EscalationLadders {
    type Patch = EscalationLaddersPatch;

    fn merge(&mut self, patch: Self::Patch) {
        replace_fields!(self, patch; warn);
    }
}

// ---------------------------------------------------------------------------
// Soft actions
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoftActions {
    pub default_slowmode_seconds: u64,
}

impl Default for SoftActions {
    fn default() -> Self {
        Self {
            default_slowmode_seconds: 30,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoftActionsPatch {
    pub default_slowmode_seconds: Option<u64>,
}

impl Merge for SoftActions {
    type Patch = SoftActionsPatch;

    fn merge(&mut self, patch: Self::Patch) {
        replace_fields!(self, patch; default_slowmode_seconds);
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterLevel {
    Level1,
    Level2,
    Level3,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum FilterAction {
    Timeout { duration_ms: u64 },
    Kick,
    Ban,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterConfig {
    pub level: FilterLevel,
    pub level1: FilterAction,
    pub level2: FilterAction,
    pub level3: FilterAction,
}

impl FilterConfig {
    /// Action bound to the currently selected level.
    pub fn active_action(&self) -> &FilterAction {
        match self.level {
            FilterLevel::Level1 => &self.level1,
            FilterLevel::Level2 => &self.level2,
            FilterLevel::Level3 => &self.level3,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            level: FilterLevel::Level1,
            level1: FilterAction::Timeout {
                duration_ms: 15 * 60 * 1000,
            },
            level2: FilterAction::Timeout {
                duration_ms: 12 * 60 * 60 * 1000,
            },
            level3: FilterAction::Ban,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterConfigPatch {
    pub level: Option<FilterLevel>,
    pub level1: Option<FilterAction>,
    pub level2: Option<FilterAction>,
    pub level3: Option<FilterAction>,
}

impl Merge for FilterConfig {
    type Patch = FilterConfigPatch;

    fn merge(&mut self, patch: Self::Patch) {
        replace_fields!(self, patch; level, level1, level2, level3);
    }
}

// ---------------------------------------------------------------------------
// Rate limits
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RateLimits {
    pub messages_per_second: u32,
    pub messages_per_minute: u32,
    pub caps_percentage: u32,
    pub emoji_limit: u32,
    pub mention_limit: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            messages_per_second: 5,
            messages_per_minute: 20,
            caps_percentage: 80,
            emoji_limit: 10,
            mention_limit: 5,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RateLimitsPatch {
    pub messages_per_second: Option<u32>,
    pub messages_per_minute: Option<u32>,
    pub caps_percentage: Option<u32>,
    pub emoji_limit: Option<u32>,
    pub mention_limit: Option<u32>,
}

impl Merge for RateLimits {
    type Patch = RateLimitsPatch;

    fn merge(&mut self, patch: Self::Patch) {
        replace_fields!(self, patch;
            messages_per_second,
            messages_per_minute,
            caps_percentage,
            emoji_limit,
            mention_limit,
        );
    }
}

// ---------------------------------------------------------------------------
// Raid protection
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RaidConfig {
    pub spike_member_count: u32,
    pub spike_interval_minutes: u32,
    pub auto_slowmode_seconds: u32,
    pub auto_lock_duration_minutes: u32,
    pub require_verification: bool,
}

impl Default for RaidConfig {
    fn default() -> Self {
        Self {
            spike_member_count: 10,
            spike_interval_minutes: 2,
            auto_slowmode_seconds: 10,
            auto_lock_duration_minutes: 15,
            require_verification: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RaidConfigPatch {
    pub spike_member_count: Option<u32>,
    pub spike_interval_minutes: Option<u32>,
    pub auto_slowmode_seconds: Option<u32>,
    pub auto_lock_duration_minutes: Option<u32>,
    pub require_verification: Option<bool>,
}

impl Merge for RaidConfig {
    type Patch = RaidConfigPatch;

    fn merge(&mut self, patch: Self::Patch) {
        replace_fields!(self, patch;
            spike_member_count,
            spike_interval_minutes,
            auto_slowmode_seconds,
            auto_lock_duration_minutes,
            require_verification,
        );
    }
}

// ---------------------------------------------------------------------------
// Notifications, retention, permissions, defaults
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationConfig {
    pub dm_on_action: bool,
    pub dm_include_reason: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            dm_on_action: true,
            dm_include_reason: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationConfigPatch {
    pub dm_on_action: Option<bool>,
    pub dm_include_reason: Option<bool>,
}

impl Merge for NotificationConfig {
    type Patch = NotificationConfigPatch;

    fn merge(&mut self, patch: Self::Patch) {
        replace_fields!(self, patch; dm_on_action, dm_include_reason);
    }
}

/// Retention windows. Stored and displayed only; nothing prunes cases.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetentionConfig {
    pub case_retention_days: u32,
    pub log_retention_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            case_retention_days: 180,
            log_retention_days: 180,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetentionConfigPatch {
    pub case_retention_days: Option<u32>,
    pub log_retention_days: Option<u32>,
}

impl Merge for RetentionConfig {
    type Patch = RetentionConfigPatch;

    fn merge(&mut self, patch: Self::Patch) {
        replace_fields!(self, patch; case_retention_days, log_retention_days);
    }
}

/// Roles granted moderation access on top of Discord permissions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PermissionConfig {
    pub moderator_role_ids: Vec<u64>,
    pub admin_role_ids: Vec<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PermissionConfigPatch {
    pub moderator_role_ids: Option<Vec<u64>>,
    pub admin_role_ids: Option<Vec<u64>>,
}

impl Merge for PermissionConfig {
    type Patch = PermissionConfigPatch;

    fn merge(&mut self, patch: Self::Patch) {
        replace_fields!(self, patch; moderator_role_ids, admin_role_ids);
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefaultsConfig {
    pub timeout_minutes: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: 10,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefaultsConfigPatch {
    pub timeout_minutes: Option<u64>,
}

impl Merge for DefaultsConfig {
    type Patch = DefaultsConfigPatch;

    fn merge(&mut self, patch: Self::Patch) {
        replace_fields!(self, patch; timeout_minutes);
    }
}
