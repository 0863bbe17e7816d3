use sqlx::{PgPool, migrate::Migrator};

use crate::cache::CacheService;

/// Embedded SQLx migrations for the `mooncrest-database` crate.
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Shared persistence handle: PostgreSQL pool plus the optional cache.
#[derive(Clone, Debug)]
pub struct Database {
    pool: PgPool,
    cache: CacheService,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            cache: CacheService::disabled("mooncrest:prod"),
        }
    }

    pub fn with_cache(pool: PgPool, cache: CacheService) -> Self {
        Self { pool, cache }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn cache(&self) -> &CacheService {
        &self.cache
    }
}
