//! Outbound side of moderation: applying actions on the platform and posting
//! messages. Everything above this module talks to [`Gateway`] so the flows
//! can be exercised without a live Discord connection.

use std::sync::Arc;

use async_trait::async_trait;
use poise::serenity_prelude as serenity;

use warden_utils::embed::DEFAULT_EMBED_COLOR;
use warden_utils::time::now_unix_secs;

/// A titled block of named fields, rendered as an embed by the Discord adapter.
#[derive(Clone, Debug, PartialEq)]
pub struct LogMessage {
    pub title: String,
    pub description: Option<String>,
    pub fields: Vec<(String, String)>,
    pub footer: Option<String>,
    pub color: u32,
}

impl LogMessage {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            fields: Vec::new(),
            footer: None,
            color: DEFAULT_EMBED_COLOR,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    /// Value of the first field called `name`.
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field_name, _)| field_name == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn to_embed(&self) -> serenity::CreateEmbed {
        let mut embed = serenity::CreateEmbed::new()
            .title(self.title.clone())
            .color(self.color);

        if let Some(description) = &self.description {
            embed = embed.description(description.clone());
        }
        for (name, value) in &self.fields {
            embed = embed.field(name.clone(), value.clone(), false);
        }
        if let Some(footer) = &self.footer {
            embed = embed.footer(serenity::CreateEmbedFooter::new(footer.clone()));
        }

        embed
    }
}

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn apply_timeout(
        &self,
        guild_id: u64,
        target_id: u64,
        duration_ms: u64,
        reason: &str,
    ) -> anyhow::Result<()>;

    async fn apply_ban(&self, guild_id: u64, target_id: u64, reason: &str) -> anyhow::Result<()>;

    async fn apply_kick(&self, guild_id: u64, target_id: u64, reason: &str) -> anyhow::Result<()>;

    async fn post_message(&self, channel_id: u64, message: &LogMessage) -> anyhow::Result<()>;

    async fn send_direct_message(&self, user_id: u64, message: &LogMessage) -> anyhow::Result<()>;
}

/// [`Gateway`] backed by serenity's HTTP client.
#[derive(Clone)]
pub struct SerenityGateway {
    http: Arc<serenity::Http>,
}

impl SerenityGateway {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Gateway for SerenityGateway {
    async fn apply_timeout(
        &self,
        guild_id: u64,
        target_id: u64,
        duration_ms: u64,
        reason: &str,
    ) -> anyhow::Result<()> {
        let until_unix = now_unix_secs().saturating_add(duration_ms.div_ceil(1_000));
        let until = serenity::Timestamp::from_unix_timestamp(i64::try_from(until_unix)?)?;

        let edit = serenity::EditMember::new()
            .disable_communication_until_datetime(until)
            .audit_log_reason(reason);
        serenity::GuildId::new(guild_id)
            .edit_member(&*self.http, serenity::UserId::new(target_id), edit)
            .await?;

        Ok(())
    }

    async fn apply_ban(&self, guild_id: u64, target_id: u64, reason: &str) -> anyhow::Result<()> {
        serenity::GuildId::new(guild_id)
            .ban_with_reason(&*self.http, serenity::UserId::new(target_id), 0, reason)
            .await?;
        Ok(())
    }

    async fn apply_kick(&self, guild_id: u64, target_id: u64, reason: &str) -> anyhow::Result<()> {
        serenity::GuildId::new(guild_id)
            .kick_with_reason(&*self.http, serenity::UserId::new(target_id), reason)
            .await?;
        Ok(())
    }

    async fn post_message(&self, channel_id: u64, message: &LogMessage) -> anyhow::Result<()> {
        serenity::ChannelId::new(channel_id)
            .send_message(
                &*self.http,
                serenity::CreateMessage::new().embed(message.to_embed()),
            )
            .await?;
        Ok(())
    }

    async fn send_direct_message(&self, user_id: u64, message: &LogMessage) -> anyhow::Result<()> {
        serenity::UserId::new(user_id)
            .direct_message(
                &*self.http,
                serenity::CreateMessage::new().embed(message.to_embed()),
            )
            .await?;
        Ok(())
    }
}

/// Discord's "missing permissions" response, usually a role hierarchy problem.
pub fn is_missing_permissions(source: &anyhow::Error) -> bool {
    matches!(
        source.downcast_ref::<serenity::Error>(),
        Some(serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response)))
            if response.status_code.as_u16() == 403 || response.error.code == 50013
    )
}
