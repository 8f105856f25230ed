use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseType {
    Warn,
    Mute,
    Ban,
    Kick,
    Timeout,
}

impl CaseType {
    pub const ALL: [CaseType; 5] = [
        CaseType::Warn,
        CaseType::Mute,
        CaseType::Ban,
        CaseType::Kick,
        CaseType::Timeout,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CaseType::Warn => "warn",
            CaseType::Mute => "mute",
            CaseType::Ban => "ban",
            CaseType::Kick => "kick",
            CaseType::Timeout => "timeout",
        }
    }
}

impl fmt::Display for CaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseType {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim();
        CaseType::ALL
            .into_iter()
            .find(|case_type| case_type.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| anyhow::anyhow!("unknown case type `{wanted}`"))
    }
}

/// Free-form case metadata. Escalation provenance has dedicated keys.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaseMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_rule_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_case_id: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CaseMetadata {
    pub fn is_escalation(&self) -> bool {
        self.source_case_id.is_some()
    }
}

/// Input for a new case record. `created_at` and numbering are assigned on insert.
#[derive(Clone, Debug)]
pub struct NewCase {
    pub guild_id: u64,
    pub case_type: CaseType,
    pub target_id: u64,
    pub target_tag: String,
    pub moderator_id: u64,
    pub moderator_tag: String,
    pub reason: String,
    pub severity: Option<String>,
    pub duration_ms: Option<u64>,
    pub metadata: CaseMetadata,
}

/// A persisted, immutable moderation case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModerationCase {
    pub id: u64,
    /// Sequential per guild. Absent on rows written without a sequence.
    pub case_number: Option<u64>,
    pub guild_id: u64,
    #[serde(rename = "type")]
    pub case_type: CaseType,
    pub target_id: u64,
    pub target_tag: String,
    pub moderator_id: u64,
    pub moderator_tag: String,
    pub reason: String,
    pub severity: Option<String>,
    pub duration_ms: Option<u64>,
    pub metadata: CaseMetadata,
    pub created_at: DateTime<Utc>,
}

pub struct CaseFilters {
    pub target_id: Option<u64>,
    pub moderator_id: Option<u64>,
    pub case_type: Option<CaseType>,
    pub limit: u32,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{CaseMetadata, CaseType};

    #[test]
    fn case_types_round_trip_through_strings() {
        assert_eq!("WARN".parse::<CaseType>().ok(), Some(CaseType::Warn));
        assert_eq!(CaseType::Timeout.to_string(), "timeout");
        assert!("purge".parse::<CaseType>().is_err());
    }

    #[test]
    fn metadata_keeps_provenance_keys_and_extras() {
        let metadata: CaseMetadata = serde_json::from_value(json!({
            "escalationRuleId": "warn-3-timeout-1h",
            "triggerCount": 3,
            "sourceCaseId": 41,
            "channel": "general"
        }))
        .expect("valid metadata");

        assert!(metadata.is_escalation());
        assert_eq!(metadata.trigger_count, Some(3));
        assert_eq!(metadata.extra.get("channel"), Some(&json!("general")));

        let plain = serde_json::to_value(CaseMetadata::default()).expect("serializable");
        assert_eq!(plain, json!({}));
    }
}
