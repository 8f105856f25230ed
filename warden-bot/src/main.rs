mod settings;

use poise::serenity_prelude as serenity;
use rustls::crypto::ring::default_provider;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, error, info, warn};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use settings::{CacheBackend, Settings};
use warden_core::{Data, Error};
use warden_database::{CacheService, Database, MIGRATOR};
use warden_utils::COMMAND_PREFIX;
use warden_utils::embed::SEVERE_EMBED_COLOR;

/// Info and above, minus the shard chatter serenity emits on every heartbeat.
fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(filter_fn(|metadata| {
        if *metadata.level() > tracing::Level::INFO {
            return false;
        }

        let target = metadata.target();
        !(target.starts_with("serenity::gateway::bridge::shard_manager")
            || target.starts_with("serenity::gateway::bridge::shard_runner"))
    }));

    tracing_subscriber::registry().with(fmt_layer).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls ring provider"))?;

    dotenvy::dotenv().ok();
    let settings = Settings::from_env()?;

    let cache = build_cache(&settings).await;
    let db = open_database(&settings, cache).await?;

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let guild_id = serenity::GuildId::new(settings.guild_id);
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: warden_commands::commands(),
            on_error: |error| Box::pin(on_error(error)),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(COMMAND_PREFIX.to_string()),
                mention_as_prefix: false,
                ..Default::default()
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!(user = %ready.user.tag(), guild_id = guild_id.get(), "Warden is on watch.");
                poise::builtins::register_in_guild(ctx, &framework.options().commands, guild_id)
                    .await?;
                Ok(Data { db })
            })
        })
        .build();

    info!("Warden is connecting...");
    serenity::ClientBuilder::new(&settings.discord_token, intents)
        .framework(framework)
        .await?
        .start()
        .await?;

    Ok(())
}

async fn open_database(settings: &Settings, cache: CacheService) -> anyhow::Result<Database> {
    let Some(database_url) = settings.database_url.as_deref() else {
        warn!("DATABASE_URL is not set; cases, config and features live in memory only.");
        let (db, _backend) = Database::in_memory(cache);
        return Ok(db);
    };

    let pool = PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .connect(database_url)
        .await?;
    info!(
        max_connections = settings.db_max_connections,
        "PostgreSQL connection established."
    );

    if settings.auto_run_migrations {
        MIGRATOR.run(&pool).await?;
        info!("Database migrations applied.");
    } else {
        info!("Auto migrations disabled (set AUTO_RUN_MIGRATIONS=true to run at startup).");
    }

    Ok(Database::with_cache(pool, cache))
}

/// Redis problems degrade to the in-process cache rather than stopping startup.
async fn build_cache(settings: &Settings) -> CacheService {
    let prefix = settings.cache_key_prefix.clone();
    let cache = match (settings.cache_backend, settings.redis_url.as_deref()) {
        (CacheBackend::Memory, _) => CacheService::memory(prefix),
        (CacheBackend::Disabled, _) => CacheService::disabled(prefix),
        (CacheBackend::Redis, None) => {
            warn!(key_prefix = %prefix, "CACHE_BACKEND=redis but REDIS_URL is missing; using the in-process cache.");
            CacheService::memory(prefix)
        }
        (CacheBackend::Redis, Some(redis_url)) => {
            match CacheService::redis(redis_url, prefix.clone()) {
                Ok(cache) => cache,
                Err(err) => {
                    warn!(?err, key_prefix = %prefix, "Failed to initialize Redis cache; using the in-process cache.");
                    CacheService::memory(prefix)
                }
            }
        }
    };

    match cache.ping().await {
        Ok(()) => info!(backend = cache.backend_name(), "Cache ready."),
        Err(err) => warn!(
            ?err,
            backend = cache.backend_name(),
            "Cache ping failed; reads will fall through to the database."
        ),
    }

    cache
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(?error, command = %ctx.command().qualified_name, "command failed");

            let embed = serenity::CreateEmbed::new()
                .title("Command Error")
                .description("Something went wrong while running this command.")
                .color(SEVERE_EMBED_COLOR);
            if let Err(err) = ctx
                .send(poise::CreateReply::default().ephemeral(true).embed(embed))
                .await
            {
                debug!(?err, "could not report command error");
            }
        }
        poise::FrameworkError::ArgumentParse { ctx, input, .. } => {
            let root = ctx.command().qualified_name.split(' ').next().unwrap_or_default();
            let usage = warden_commands::usage_for(root)
                .map(str::to_owned)
                .unwrap_or_else(|| format!("{COMMAND_PREFIX}{}", ctx.command().qualified_name));
            let description = match input {
                Some(input) => format!("Invalid argument `{input}`.\nUsage: `{usage}`"),
                None => format!("Missing required argument.\nUsage: `{usage}`"),
            };

            if let Err(err) = ctx.say(description).await {
                debug!(?err, "could not report argument error");
            }
        }
        poise::FrameworkError::UnknownCommand { msg_content, .. } => {
            debug!(content = %msg_content, "unknown command invocation");
        }
        other => {
            error!(?other, "framework error");
        }
    }
}
