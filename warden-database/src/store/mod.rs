//! Storage port and its adapters.
//!
//! `PgBackend` is what the bot runs against; `MemoryBackend` keeps the same
//! contract in process for tests and database-less development runs.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::cases::{CaseFilters, CaseType, ModerationCase, NewCase};
use crate::model::config::{ModerationConfig, ModerationConfigPatch};
use crate::model::features::{Feature, FeatureFlags};

pub use memory::MemoryBackend;
pub use postgres::PgBackend;

#[async_trait]
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// Stored configuration document for a guild, read as a patch so that
    /// defaults added later still apply. `None` when no row exists.
    async fn load_mod_config(&self, guild_id: u64) -> anyhow::Result<Option<ModerationConfigPatch>>;

    /// Upsert the whole configuration document for a guild.
    async fn save_mod_config(&self, guild_id: u64, config: &ModerationConfig)
    -> anyhow::Result<()>;

    /// Append a case, assigning its id and per-guild case number.
    async fn insert_case(
        &self,
        new_case: &NewCase,
        created_at: DateTime<Utc>,
    ) -> anyhow::Result<ModerationCase>;

    /// Number of cases of `case_type` recorded against `target_id`.
    async fn count_cases(
        &self,
        guild_id: u64,
        target_id: u64,
        case_type: CaseType,
    ) -> anyhow::Result<u64>;

    /// Most recent cases first.
    async fn list_cases(
        &self,
        guild_id: u64,
        filters: &CaseFilters,
    ) -> anyhow::Result<Vec<ModerationCase>>;

    async fn get_case(
        &self,
        guild_id: u64,
        case_number: u64,
    ) -> anyhow::Result<Option<ModerationCase>>;

    async fn load_feature_flags(&self, guild_id: u64) -> anyhow::Result<Option<FeatureFlags>>;

    async fn save_feature_state(
        &self,
        guild_id: u64,
        feature: Feature,
        enabled: bool,
    ) -> anyhow::Result<()>;
}
