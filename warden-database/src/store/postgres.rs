use anyhow::Context as _;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use crate::model::cases::{CaseFilters, CaseMetadata, CaseType, ModerationCase, NewCase};
use crate::model::config::{ModerationConfig, ModerationConfigPatch};
use crate::model::features::{Feature, FeatureFlags};
use crate::store::Backend;

const CASE_COLUMNS: &str = "id, case_number, guild_id, case_type, target_id, target_tag, \
     moderator_id, moderator_tag, reason, severity, duration_ms, metadata, created_at";

#[derive(Clone, Debug)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct CaseRow {
    id: i64,
    case_number: Option<i64>,
    guild_id: i64,
    case_type: String,
    target_id: i64,
    target_tag: String,
    moderator_id: i64,
    moderator_tag: String,
    reason: String,
    severity: Option<String>,
    duration_ms: Option<i64>,
    metadata: Json<CaseMetadata>,
    created_at: DateTime<Utc>,
}

fn to_i64(value: u64, field: &'static str) -> anyhow::Result<i64> {
    i64::try_from(value).with_context(|| format!("{field} out of i64 range"))
}

fn to_u64(value: i64, field: &'static str) -> anyhow::Result<u64> {
    u64::try_from(value).with_context(|| format!("{field} row out of u64 range"))
}

fn to_moderation_case(row: CaseRow) -> anyhow::Result<ModerationCase> {
    Ok(ModerationCase {
        id: to_u64(row.id, "id")?,
        case_number: row
            .case_number
            .map(|number| to_u64(number, "case_number"))
            .transpose()?,
        guild_id: to_u64(row.guild_id, "guild_id")?,
        case_type: row.case_type.parse()?,
        target_id: to_u64(row.target_id, "target_id")?,
        target_tag: row.target_tag,
        moderator_id: to_u64(row.moderator_id, "moderator_id")?,
        moderator_tag: row.moderator_tag,
        reason: row.reason,
        severity: row.severity,
        duration_ms: row
            .duration_ms
            .map(|duration| to_u64(duration, "duration_ms"))
            .transpose()?,
        metadata: row.metadata.0,
        created_at: row.created_at,
    })
}

#[async_trait]
impl Backend for PgBackend {
    async fn load_mod_config(&self, guild_id: u64) -> anyhow::Result<Option<ModerationConfigPatch>> {
        let guild_id_i64 = to_i64(guild_id, "guild_id")?;

        let stored: Option<Json<ModerationConfigPatch>> =
            sqlx::query_scalar("SELECT config FROM moderation_config WHERE guild_id = $1")
                .bind(guild_id_i64)
                .fetch_optional(&self.pool)
                .await?;

        Ok(stored.map(|Json(patch)| patch))
    }

    async fn save_mod_config(
        &self,
        guild_id: u64,
        config: &ModerationConfig,
    ) -> anyhow::Result<()> {
        let guild_id_i64 = to_i64(guild_id, "guild_id")?;

        sqlx::query(
            "INSERT INTO moderation_config (guild_id, config, updated_at)
             VALUES ($1, $2, NOW())
             ON CONFLICT (guild_id) DO UPDATE
             SET config = EXCLUDED.config, updated_at = EXCLUDED.updated_at",
        )
        .bind(guild_id_i64)
        .bind(Json(config))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_case(
        &self,
        new_case: &NewCase,
        created_at: DateTime<Utc>,
    ) -> anyhow::Result<ModerationCase> {
        let guild_id_i64 = to_i64(new_case.guild_id, "guild_id")?;
        let target_id_i64 = to_i64(new_case.target_id, "target_id")?;
        let moderator_id_i64 = to_i64(new_case.moderator_id, "moderator_id")?;
        let duration_ms_i64 = new_case
            .duration_ms
            .map(|duration| to_i64(duration, "duration_ms"))
            .transpose()?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(guild_id_i64)
            .execute(&mut *tx)
            .await?;

        let next_case_number: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(case_number), 0) + 1 FROM moderation_cases WHERE guild_id = $1",
        )
        .bind(guild_id_i64)
        .fetch_one(&mut *tx)
        .await?;

        let row: CaseRow = sqlx::query_as(&format!(
            "INSERT INTO moderation_cases (
                case_number,
                guild_id,
                case_type,
                target_id,
                target_tag,
                moderator_id,
                moderator_tag,
                reason,
                severity,
                duration_ms,
                metadata,
                created_at
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {CASE_COLUMNS}"
        ))
        .bind(next_case_number)
        .bind(guild_id_i64)
        .bind(new_case.case_type.as_str())
        .bind(target_id_i64)
        .bind(&new_case.target_tag)
        .bind(moderator_id_i64)
        .bind(&new_case.moderator_tag)
        .bind(&new_case.reason)
        .bind(new_case.severity.as_deref())
        .bind(duration_ms_i64)
        .bind(Json(&new_case.metadata))
        .bind(created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        to_moderation_case(row)
    }

    async fn count_cases(
        &self,
        guild_id: u64,
        target_id: u64,
        case_type: CaseType,
    ) -> anyhow::Result<u64> {
        let guild_id_i64 = to_i64(guild_id, "guild_id")?;
        let target_id_i64 = to_i64(target_id, "target_id")?;

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM moderation_cases
             WHERE guild_id = $1 AND target_id = $2 AND case_type = $3",
        )
        .bind(guild_id_i64)
        .bind(target_id_i64)
        .bind(case_type.as_str())
        .fetch_one(&self.pool)
        .await?;

        to_u64(count, "count")
    }

    async fn list_cases(
        &self,
        guild_id: u64,
        filters: &CaseFilters,
    ) -> anyhow::Result<Vec<ModerationCase>> {
        let guild_id_i64 = to_i64(guild_id, "guild_id")?;
        let target_id_i64 = filters
            .target_id
            .map(|id| to_i64(id, "target_id"))
            .transpose()?;
        let moderator_id_i64 = filters
            .moderator_id
            .map(|id| to_i64(id, "moderator_id"))
            .transpose()?;

        let rows: Vec<CaseRow> = sqlx::query_as(&format!(
            "SELECT {CASE_COLUMNS}
             FROM moderation_cases
             WHERE guild_id = $1
               AND ($2::BIGINT IS NULL OR target_id = $2)
               AND ($3::BIGINT IS NULL OR moderator_id = $3)
               AND ($4::TEXT IS NULL OR case_type = $4)
             ORDER BY created_at DESC, id DESC
             LIMIT $5"
        ))
        .bind(guild_id_i64)
        .bind(target_id_i64)
        .bind(moderator_id_i64)
        .bind(filters.case_type.map(CaseType::as_str))
        .bind(i64::from(filters.limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(to_moderation_case).collect()
    }

    async fn get_case(
        &self,
        guild_id: u64,
        case_number: u64,
    ) -> anyhow::Result<Option<ModerationCase>> {
        let guild_id_i64 = to_i64(guild_id, "guild_id")?;
        let case_number_i64 = to_i64(case_number, "case_number")?;

        let row: Option<CaseRow> = sqlx::query_as(&format!(
            "SELECT {CASE_COLUMNS}
             FROM moderation_cases
             WHERE guild_id = $1 AND case_number = $2"
        ))
        .bind(guild_id_i64)
        .bind(case_number_i64)
        .fetch_optional(&self.pool)
        .await?;

        row.map(to_moderation_case).transpose()
    }

    async fn load_feature_flags(&self, guild_id: u64) -> anyhow::Result<Option<FeatureFlags>> {
        let guild_id_i64 = to_i64(guild_id, "guild_id")?;

        let row: Option<(bool, bool)> = sqlx::query_as(
            "SELECT mod_feature, automod FROM guild_features WHERE guild_id = $1",
        )
        .bind(guild_id_i64)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(mod_feature, automod)| FeatureFlags {
            mod_feature,
            automod,
        }))
    }

    async fn save_feature_state(
        &self,
        guild_id: u64,
        feature: Feature,
        enabled: bool,
    ) -> anyhow::Result<()> {
        let guild_id_i64 = to_i64(guild_id, "guild_id")?;

        let statement = match feature {
            Feature::Moderation => {
                "INSERT INTO guild_features (guild_id, mod_feature)
                 VALUES ($1, $2)
                 ON CONFLICT (guild_id) DO UPDATE SET mod_feature = EXCLUDED.mod_feature"
            }
            Feature::Automod => {
                "INSERT INTO guild_features (guild_id, automod)
                 VALUES ($1, $2)
                 ON CONFLICT (guild_id) DO UPDATE SET automod = EXCLUDED.automod"
            }
        };

        sqlx::query(statement)
            .bind(guild_id_i64)
            .bind(enabled)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
