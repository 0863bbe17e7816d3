use anyhow::Context as _;

use crate::database::Database;

/// Whether the assistant answers mentions in this guild. Defaults to on.
pub async fn get_llm_enabled(db: &Database, guild_id: u64) -> anyhow::Result<bool> {
    let guild_id_i64 = i64::try_from(guild_id).context("guild_id out of i64 range")?;

    let enabled: Option<bool> =
        sqlx::query_scalar("SELECT enabled FROM guild_assistant_settings WHERE guild_id = $1")
            .bind(guild_id_i64)
            .fetch_optional(db.pool())
            .await?;

    Ok(enabled.unwrap_or(true))
}

pub async fn set_llm_enabled(
    db: &Database,
    guild_id: u64,
    enabled: bool,
) -> anyhow::Result<()> {
    let guild_id_i64 = i64::try_from(guild_id).context("guild_id out of i64 range")?;

    sqlx::query(
        "INSERT INTO guild_assistant_settings (guild_id, enabled)
         VALUES ($1, $2)
         ON CONFLICT (guild_id) DO UPDATE SET enabled = EXCLUDED.enabled",
    )
    .bind(guild_id_i64)
    .bind(enabled)
    .execute(db.pool())
    .await?;

    Ok(())
}
