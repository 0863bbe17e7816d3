use anyhow::Context as _;

use crate::database::Database;
use crate::impls::now_unix_secs;
use crate::model::assistant_chat::{ChatRole, ChatTurn};

/// Turns kept per channel once pruning runs.
pub const HISTORY_RETAINED_PER_CHANNEL: u32 = 200;

#[derive(sqlx::FromRow)]
struct ChatRow {
    user_id: i64,
    display_name: Option<String>,
    role: String,
    content: String,
    created_at: i64,
}

pub async fn insert_chat_turn(
    db: &Database,
    guild_id: u64,
    channel_id: u64,
    user_id: u64,
    display_name: Option<&str>,
    role: ChatRole,
    content: &str,
) -> anyhow::Result<()> {
    let guild_id_i64 = i64::try_from(guild_id).context("guild_id out of i64 range")?;
    let channel_id_i64 = i64::try_from(channel_id).context("channel_id out of i64 range")?;
    let user_id_i64 = i64::try_from(user_id).context("user_id out of i64 range")?;
    let created_at_i64 = i64::try_from(now_unix_secs()).context("created_at out of i64 range")?;

    sqlx::query(
        "INSERT INTO assistant_chat_history (guild_id, channel_id, user_id, display_name, role, content, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(guild_id_i64)
    .bind(channel_id_i64)
    .bind(user_id_i64)
    .bind(display_name)
    .bind(role.as_str())
    .bind(content)
    .bind(created_at_i64)
    .execute(db.pool())
    .await?;

    Ok(())
}

/// Most recent turns in a channel, newest first.
pub async fn list_recent_chat_turns(
    db: &Database,
    guild_id: u64,
    channel_id: u64,
    limit: u32,
) -> anyhow::Result<Vec<ChatTurn>> {
    let guild_id_i64 = i64::try_from(guild_id).context("guild_id out of i64 range")?;
    let channel_id_i64 = i64::try_from(channel_id).context("channel_id out of i64 range")?;
    let limit_i64 = i64::from(limit.clamp(1, HISTORY_RETAINED_PER_CHANNEL));

    let rows: Vec<ChatRow> = sqlx::query_as(
        "SELECT user_id, display_name, role, content, created_at
         FROM assistant_chat_history
         WHERE guild_id = $1 AND channel_id = $2
         ORDER BY created_at DESC, id DESC
         LIMIT $3",
    )
    .bind(guild_id_i64)
    .bind(channel_id_i64)
    .bind(limit_i64)
    .fetch_all(db.pool())
    .await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(role) = ChatRole::parse(&row.role) else {
            continue;
        };

        out.push(ChatTurn {
            user_id: u64::try_from(row.user_id).context("user_id row out of u64 range")?,
            display_name: row.display_name,
            role,
            content: row.content,
            created_at: u64::try_from(row.created_at).context("created_at row out of u64 range")?,
        });
    }

    Ok(out)
}

/// Drop everything but the newest turns in a channel.
pub async fn prune_chat_history(db: &Database, guild_id: u64, channel_id: u64) -> anyhow::Result<u64> {
    let guild_id_i64 = i64::try_from(guild_id).context("guild_id out of i64 range")?;
    let channel_id_i64 = i64::try_from(channel_id).context("channel_id out of i64 range")?;

    let result = sqlx::query(
        "DELETE FROM assistant_chat_history
         WHERE guild_id = $1 AND channel_id = $2 AND id NOT IN (
            SELECT id FROM assistant_chat_history
            WHERE guild_id = $1 AND channel_id = $2
            ORDER BY created_at DESC, id DESC
            LIMIT $3
         )",
    )
    .bind(guild_id_i64)
    .bind(channel_id_i64)
    .bind(i64::from(HISTORY_RETAINED_PER_CHANNEL))
    .execute(db.pool())
    .await?;

    Ok(result.rows_affected())
}

/// Forget a channel's conversation entirely.
pub async fn clear_chat_history(db: &Database, guild_id: u64, channel_id: u64) -> anyhow::Result<u64> {
    let guild_id_i64 = i64::try_from(guild_id).context("guild_id out of i64 range")?;
    let channel_id_i64 = i64::try_from(channel_id).context("channel_id out of i64 range")?;

    let result =
        sqlx::query("DELETE FROM assistant_chat_history WHERE guild_id = $1 AND channel_id = $2")
            .bind(guild_id_i64)
            .bind(channel_id_i64)
            .execute(db.pool())
            .await?;

    Ok(result.rows_affected())
}
