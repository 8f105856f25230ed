use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::model::cases::{CaseFilters, CaseType, ModerationCase, NewCase};
use crate::model::config::{ModerationConfig, ModerationConfigPatch};
use crate::model::features::{Feature, FeatureFlags, FeatureState};
use crate::store::Backend;

/// In-process backend. Config documents are kept as JSON values, the same
/// shape the `config` JSONB column holds.
///
/// Clones share state, so a test can keep a handle and flip the failure
/// switches while a `Database` owns another.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    inner: Arc<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    configs: DashMap<u64, serde_json::Value>,
    cases: Mutex<Vec<ModerationCase>>,
    features: DashMap<u64, FeatureFlags>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read fail until switched back.
    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Store a raw config document, bypassing validation.
    pub fn seed_config(&self, guild_id: u64, document: serde_json::Value) {
        self.inner.configs.insert(guild_id, document);
    }

    /// Raw stored document, if any.
    pub fn stored_config(&self, guild_id: u64) -> Option<serde_json::Value> {
        self.inner
            .configs
            .get(&guild_id)
            .map(|entry| entry.value().clone())
    }

    pub fn seed_feature_flags(&self, guild_id: u64, flags: FeatureFlags) {
        self.inner.features.insert(guild_id, flags);
    }

    fn check_read(&self) -> anyhow::Result<()> {
        if self.inner.fail_reads.load(Ordering::SeqCst) {
            anyhow::bail!("memory backend: simulated read failure");
        }
        Ok(())
    }

    fn check_write(&self) -> anyhow::Result<()> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("memory backend: simulated write failure");
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn load_mod_config(&self, guild_id: u64) -> anyhow::Result<Option<ModerationConfigPatch>> {
        self.check_read()?;

        let Some(document) = self.stored_config(guild_id) else {
            return Ok(None);
        };

        let patch = serde_json::from_value(document)
            .map_err(|e| anyhow::anyhow!("stored config for guild {guild_id} is malformed: {e}"))?;
        Ok(Some(patch))
    }

    async fn save_mod_config(
        &self,
        guild_id: u64,
        config: &ModerationConfig,
    ) -> anyhow::Result<()> {
        self.check_write()?;

        let document = serde_json::to_value(config)?;
        self.inner.configs.insert(guild_id, document);
        Ok(())
    }

    async fn insert_case(
        &self,
        new_case: &NewCase,
        created_at: DateTime<Utc>,
    ) -> anyhow::Result<ModerationCase> {
        self.check_write()?;

        let mut cases = self.inner.cases.lock().await;
        let id = cases.len() as u64 + 1;
        let case_number = cases
            .iter()
            .filter(|case| case.guild_id == new_case.guild_id)
            .filter_map(|case| case.case_number)
            .max()
            .unwrap_or(0)
            + 1;

        let case = ModerationCase {
            id,
            case_number: Some(case_number),
            guild_id: new_case.guild_id,
            case_type: new_case.case_type,
            target_id: new_case.target_id,
            target_tag: new_case.target_tag.clone(),
            moderator_id: new_case.moderator_id,
            moderator_tag: new_case.moderator_tag.clone(),
            reason: new_case.reason.clone(),
            severity: new_case.severity.clone(),
            duration_ms: new_case.duration_ms,
            metadata: new_case.metadata.clone(),
            created_at,
        };
        cases.push(case.clone());

        Ok(case)
    }

    async fn count_cases(
        &self,
        guild_id: u64,
        target_id: u64,
        case_type: CaseType,
    ) -> anyhow::Result<u64> {
        self.check_read()?;

        let cases = self.inner.cases.lock().await;
        let count = cases
            .iter()
            .filter(|case| {
                case.guild_id == guild_id
                    && case.target_id == target_id
                    && case.case_type == case_type
            })
            .count();

        Ok(count as u64)
    }

    async fn list_cases(
        &self,
        guild_id: u64,
        filters: &CaseFilters,
    ) -> anyhow::Result<Vec<ModerationCase>> {
        self.check_read()?;

        let cases = self.inner.cases.lock().await;
        Ok(cases
            .iter()
            .rev()
            .filter(|case| case.guild_id == guild_id)
            .filter(|case| filters.target_id.is_none_or(|id| case.target_id == id))
            .filter(|case| filters.moderator_id.is_none_or(|id| case.moderator_id == id))
            .filter(|case| filters.case_type.is_none_or(|kind| case.case_type == kind))
            .take(filters.limit as usize)
            .cloned()
            .collect())
    }

    async fn get_case(
        &self,
        guild_id: u64,
        case_number: u64,
    ) -> anyhow::Result<Option<ModerationCase>> {
        self.check_read()?;

        let cases = self.inner.cases.lock().await;
        Ok(cases
            .iter()
            .find(|case| case.guild_id == guild_id && case.case_number == Some(case_number))
            .cloned())
    }

    async fn load_feature_flags(&self, guild_id: u64) -> anyhow::Result<Option<FeatureFlags>> {
        self.check_read()?;

        Ok(self.inner.features.get(&guild_id).map(|entry| *entry.value()))
    }

    async fn save_feature_state(
        &self,
        guild_id: u64,
        feature: Feature,
        enabled: bool,
    ) -> anyhow::Result<()> {
        self.check_write()?;

        self.inner
            .features
            .entry(guild_id)
            .or_default()
            .set(feature, FeatureState::from_enabled(enabled));
        Ok(())
    }
}
