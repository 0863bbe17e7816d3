//! Startup settings and the services built from them before the gateway
//! connects.

use std::env;
use std::time::Duration;

use anyhow::Context as _;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use mooncrest_core::config::DEFAULT_CONFIG_PATH;
use mooncrest_database::cache::{
    DEFAULT_LLM_MENTION_RATE_LIMIT_MAX_HITS, DEFAULT_LLM_MENTION_RATE_LIMIT_WINDOW,
};
use mooncrest_database::{CacheService, Database, MIGRATOR};

const DEFAULT_REDIS_KEY_PREFIX: &str = "mooncrest:prod";
const DB_MAX_CONNECTIONS: u32 = 5;

/// Gateway shard chatter that drowns out the bot's own logs at info level.
const NOISY_TARGETS: &[&str] = &[
    "serenity::gateway::bridge::shard_manager",
    "serenity::gateway::bridge::shard_runner",
];

fn is_noisy_target(target: &str) -> bool {
    NOISY_TARGETS.iter().any(|prefix| target.starts_with(prefix))
}

pub fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(filter_fn(|metadata| {
        *metadata.level() <= tracing::Level::INFO && !is_noisy_target(metadata.target())
    }));

    tracing_subscriber::registry().with(fmt_layer).init();
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedisSettings {
    pub enabled: bool,
    pub url: Option<String>,
    pub key_prefix: String,
}

/// Everything the bot reads from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub discord_token: String,
    pub database_url: String,
    pub guild_id: u64,
    pub config_path: String,
    pub rover_api_key: Option<String>,
    pub redis: RedisSettings,
    pub mention_window: Duration,
    pub mention_max_hits: u64,
    pub auto_run_migrations: bool,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} must be set"));
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let flag = |key: &str, default: bool| lookup(key).map_or(default, |raw| parse_flag(&raw));
        let number = |key: &str, default: u64| {
            lookup(key)
                .and_then(|raw| raw.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };

        let guild_id = required("DISCORD_GUILD_ID")?
            .trim()
            .parse::<u64>()
            .context("DISCORD_GUILD_ID must be a numeric id")?;

        Ok(Self {
            discord_token: required("DISCORD_TOKEN")?,
            database_url: required("DATABASE_URL")?,
            guild_id,
            config_path: non_empty("BOT_CONFIG_PATH")
                .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned()),
            rover_api_key: non_empty("ROVER_API_KEY"),
            redis: RedisSettings {
                enabled: flag("REDIS_ENABLED", false),
                url: non_empty("REDIS_URL"),
                key_prefix: non_empty("REDIS_KEY_PREFIX")
                    .unwrap_or_else(|| DEFAULT_REDIS_KEY_PREFIX.to_owned()),
            },
            mention_window: Duration::from_secs(number(
                "LLM_RATELIMIT_WINDOW_SECONDS",
                DEFAULT_LLM_MENTION_RATE_LIMIT_WINDOW.as_secs(),
            )),
            mention_max_hits: number(
                "LLM_RATELIMIT_MAX_HITS",
                DEFAULT_LLM_MENTION_RATE_LIMIT_MAX_HITS,
            ),
            auto_run_migrations: flag("AUTO_RUN_MIGRATIONS", true),
        })
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Redis when configured and reachable to build, otherwise the DB-only cache.
fn build_cache(redis: &RedisSettings) -> CacheService {
    let prefix = redis.key_prefix.clone();

    if !redis.enabled {
        info!("Redis cache disabled (set REDIS_ENABLED=true to enable).");
        return CacheService::disabled(prefix);
    }

    let Some(url) = redis.url.as_deref() else {
        warn!(key_prefix = %prefix, "REDIS_ENABLED=true but REDIS_URL is missing; continuing with DB-only mode.");
        return CacheService::disabled(prefix);
    };

    match CacheService::redis(url, prefix.clone()) {
        Ok(cache) => {
            info!(key_prefix = %prefix, "Redis cache enabled.");
            cache
        }
        Err(err) => {
            warn!(?err, key_prefix = %prefix, "Failed to initialize Redis cache; continuing with DB-only mode.");
            CacheService::disabled(prefix)
        }
    }
}

async fn connect_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(DB_MAX_CONNECTIONS)
        .connect(database_url)
        .await
        .context("failed to connect to PostgreSQL")?;
    info!("PostgreSQL connection established.");
    Ok(pool)
}

/// Pool, cache and schema, ready for the framework.
pub async fn open_database(settings: &Settings) -> anyhow::Result<Database> {
    let pool = connect_pool(&settings.database_url).await?;

    let mut cache = build_cache(&settings.redis);
    cache.configure_llm_rate_limit(settings.mention_window, settings.mention_max_hits);
    info!(
        window_seconds = cache.llm_rate_limit_window().as_secs(),
        max_hits = cache.llm_rate_limit_max_hits(),
        "Assistant mention rate limit configured."
    );

    if cache.is_redis_enabled() {
        match cache.ping().await {
            Ok(()) => info!("Redis cache health check passed."),
            Err(err) => warn!(?err, "Redis cache ping failed; falling back to the database."),
        }
    }

    let db = Database::with_cache(pool, cache);

    if settings.auto_run_migrations {
        MIGRATOR.run(db.pool()).await?;
        info!("Database migrations applied.");
    } else {
        info!("Auto migrations disabled (set AUTO_RUN_MIGRATIONS=true to run at startup).");
    }

    Ok(db)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::{RedisSettings, Settings, build_cache, is_noisy_target, parse_flag};

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("DISCORD_TOKEN", "token"),
        ("DATABASE_URL", "postgres://localhost/mooncrest"),
        ("DISCORD_GUILD_ID", " 123 "),
    ];

    #[test]
    fn defaults_fill_in_optional_settings() {
        let settings = Settings::from_lookup(lookup(REQUIRED)).unwrap();

        assert_eq!(settings.guild_id, 123);
        assert_eq!(settings.config_path, "config.json");
        assert_eq!(settings.rover_api_key, None);
        assert!(!settings.redis.enabled);
        assert_eq!(settings.redis.key_prefix, "mooncrest:prod");
        assert!(settings.auto_run_migrations);
    }

    #[test]
    fn overrides_are_trimmed_and_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("ROVER_API_KEY", "  key  "),
            ("REDIS_ENABLED", "Yes"),
            ("AUTO_RUN_MIGRATIONS", "off"),
            ("LLM_RATELIMIT_WINDOW_SECONDS", "30"),
            ("LLM_RATELIMIT_MAX_HITS", "not a number"),
        ]);
        let settings = Settings::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(settings.rover_api_key.as_deref(), Some("key"));
        assert!(settings.redis.enabled);
        assert!(!settings.auto_run_migrations);
        assert_eq!(settings.mention_window, Duration::from_secs(30));
        assert_eq!(
            settings.mention_max_hits,
            mooncrest_database::cache::DEFAULT_LLM_MENTION_RATE_LIMIT_MAX_HITS
        );
    }

    #[test]
    fn missing_or_malformed_required_values_fail() {
        assert!(Settings::from_lookup(lookup(&REQUIRED[..2])).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs[2] = ("DISCORD_GUILD_ID", "guild");
        assert!(Settings::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn flags_accept_common_spellings() {
        for raw in ["1", "true", "YES", " on "] {
            assert!(parse_flag(raw), "{raw}");
        }
        for raw in ["0", "false", "", "maybe"] {
            assert!(!parse_flag(raw), "{raw}");
        }
    }

    #[test]
    fn shard_chatter_is_filtered() {
        assert!(is_noisy_target("serenity::gateway::bridge::shard_runner"));
        assert!(!is_noisy_target("mooncrest_bot::events::tasks"));
    }

    #[test]
    fn redis_without_url_falls_back_to_db_only() {
        let cache = build_cache(&RedisSettings {
            enabled: true,
            url: None,
            key_prefix: "test".to_owned(),
        });
        assert!(!cache.is_redis_enabled());
    }
}
