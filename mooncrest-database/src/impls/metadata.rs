use anyhow::Context as _;

use crate::database::Database;

const LAST_MILESTONE_KEY: &str = "last_announced_member_milestone";

async fn get_value(db: &Database, key: &str) -> anyhow::Result<Option<i64>> {
    let value: Option<i64> = sqlx::query_scalar("SELECT value FROM bot_metadata WHERE key = $1")
        .bind(key)
        .fetch_optional(db.pool())
        .await?;

    Ok(value)
}

async fn set_value(db: &Database, key: &str, value: i64) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO bot_metadata (key, value)
         VALUES ($1, $2)
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
    )
    .bind(key)
    .bind(value)
    .execute(db.pool())
    .await?;

    Ok(())
}

/// Highest group member-count milestone already announced, or 0.
pub async fn get_last_announced_milestone(db: &Database) -> anyhow::Result<u64> {
    match get_value(db, LAST_MILESTONE_KEY).await? {
        Some(value) => u64::try_from(value).context("milestone row out of u64 range"),
        None => Ok(0),
    }
}

pub async fn set_last_announced_milestone(db: &Database, milestone: u64) -> anyhow::Result<()> {
    let milestone_i64 = i64::try_from(milestone).context("milestone out of i64 range")?;
    set_value(db, LAST_MILESTONE_KEY, milestone_i64).await
}
