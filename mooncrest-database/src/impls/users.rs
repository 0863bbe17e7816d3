use std::collections::{BTreeMap, HashMap};

use anyhow::{Context as _, bail};
use mooncrest_leveling::{
    LeaderboardEntry, LeaderboardKind, MAX_PAGE_SIZE, Page, PagePlan, rank_from_count,
};

use crate::cache::{TOTAL_USERS_TTL, total_users_key};
use crate::database::Database;
use crate::impls::now_unix_secs;
use crate::model::users::UserRecord;

const USER_COLUMNS: &str =
    "roblox_id, roblox_username, discord_id, is_verified, points, expeditions, summit_guides, achievements";

#[derive(sqlx::FromRow)]
struct UserRow {
    roblox_id: i64,
    roblox_username: String,
    discord_id: Option<i64>,
    is_verified: bool,
    points: i64,
    expeditions: i64,
    summit_guides: i64,
    achievements: Vec<i64>,
}

#[derive(sqlx::FromRow)]
struct DepartmentRow {
    roblox_id: i64,
    department: String,
    points: i64,
}

#[derive(sqlx::FromRow)]
struct LeaderboardRow {
    roblox_username: String,
    sort_value: i64,
}

/// Column backing a leaderboard kind. Only ever interpolated from this match.
fn sort_column(kind: LeaderboardKind) -> &'static str {
    match kind {
        LeaderboardKind::Points => "points",
        LeaderboardKind::Expeditions => "expeditions",
    }
}

impl UserRow {
    fn into_record(self, department_points: BTreeMap<String, i64>) -> anyhow::Result<UserRecord> {
        Ok(UserRecord {
            roblox_id: u64::try_from(self.roblox_id).context("roblox_id row out of u64 range")?,
            roblox_username: self.roblox_username,
            discord_id: self
                .discord_id
                .map(u64::try_from)
                .transpose()
                .context("discord_id row out of u64 range")?,
            is_verified: self.is_verified,
            points: self.points.max(0),
            expeditions: self.expeditions.max(0),
            summit_guides: self.summit_guides.max(0),
            department_points,
            achievements: self.achievements.into_iter().collect(),
        })
    }
}

async fn load_department_points(
    db: &Database,
    roblox_id_i64: i64,
) -> anyhow::Result<BTreeMap<String, i64>> {
    let rows: Vec<DepartmentRow> = sqlx::query_as(
        "SELECT roblox_id, department, points FROM user_department_points WHERE roblox_id = $1",
    )
    .bind(roblox_id_i64)
    .fetch_all(db.pool())
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.department, row.points))
        .collect())
}

/// Department points grouped per user.
fn group_department_rows(rows: Vec<DepartmentRow>) -> HashMap<i64, BTreeMap<String, i64>> {
    let mut by_user: HashMap<i64, BTreeMap<String, i64>> = HashMap::new();
    for row in rows {
        by_user
            .entry(row.roblox_id)
            .or_default()
            .insert(row.department, row.points);
    }
    by_user
}

async fn hydrate_many(db: &Database, rows: Vec<UserRow>) -> anyhow::Result<Vec<UserRecord>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = rows.iter().map(|row| row.roblox_id).collect();
    let departments: Vec<DepartmentRow> = sqlx::query_as(
        "SELECT roblox_id, department, points FROM user_department_points WHERE roblox_id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(db.pool())
    .await?;

    let mut by_user = group_department_rows(departments);

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let department_points = by_user.remove(&row.roblox_id).unwrap_or_default();
        out.push(row.into_record(department_points)?);
    }

    Ok(out)
}

pub async fn find_user(db: &Database, roblox_id: u64) -> anyhow::Result<Option<UserRecord>> {
    let roblox_id_i64 = i64::try_from(roblox_id).context("roblox_id out of i64 range")?;

    let row: Option<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM community_users WHERE roblox_id = $1"
    ))
    .bind(roblox_id_i64)
    .fetch_optional(db.pool())
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let department_points = load_department_points(db, row.roblox_id).await?;
    row.into_record(department_points).map(Some)
}

pub async fn find_user_by_discord_id(
    db: &Database,
    discord_id: u64,
) -> anyhow::Result<Option<UserRecord>> {
    let discord_id_i64 = i64::try_from(discord_id).context("discord_id out of i64 range")?;

    let row: Option<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM community_users WHERE discord_id = $1 LIMIT 1"
    ))
    .bind(discord_id_i64)
    .fetch_optional(db.pool())
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let department_points = load_department_points(db, row.roblox_id).await?;
    row.into_record(department_points).map(Some)
}

/// Case-insensitive lookup by the stored Roblox username.
pub async fn find_user_by_username(
    db: &Database,
    roblox_username: &str,
) -> anyhow::Result<Option<UserRecord>> {
    let row: Option<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM community_users
         WHERE LOWER(roblox_username) = LOWER($1)
         ORDER BY roblox_id
         LIMIT 1"
    ))
    .bind(roblox_username)
    .fetch_optional(db.pool())
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let department_points = load_department_points(db, row.roblox_id).await?;
    row.into_record(department_points).map(Some)
}

/// Upsert a user and replace their department points in one transaction.
/// Last write wins; there is no optimistic locking.
pub async fn save_user(db: &Database, user: &UserRecord) -> anyhow::Result<()> {
    let roblox_id_i64 = i64::try_from(user.roblox_id).context("roblox_id out of i64 range")?;
    let discord_id_i64 = user
        .discord_id
        .map(i64::try_from)
        .transpose()
        .context("discord_id out of i64 range")?;
    let updated_at_i64 = i64::try_from(now_unix_secs()).context("updated_at out of i64 range")?;
    let achievements: Vec<i64> = user.achievements.iter().copied().collect();

    let mut tx = db.pool().begin().await?;

    let inserted: bool = sqlx::query_scalar(
        "INSERT INTO community_users
            (roblox_id, roblox_username, discord_id, is_verified, points, expeditions, summit_guides, achievements, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT (roblox_id) DO UPDATE SET
            roblox_username = EXCLUDED.roblox_username,
            discord_id = EXCLUDED.discord_id,
            is_verified = EXCLUDED.is_verified,
            points = EXCLUDED.points,
            expeditions = EXCLUDED.expeditions,
            summit_guides = EXCLUDED.summit_guides,
            achievements = EXCLUDED.achievements,
            updated_at = EXCLUDED.updated_at
         RETURNING (xmax = 0)",
    )
    .bind(roblox_id_i64)
    .bind(&user.roblox_username)
    .bind(discord_id_i64)
    .bind(user.is_verified)
    .bind(user.points.max(0))
    .bind(user.expeditions.max(0))
    .bind(user.summit_guides.max(0))
    .bind(&achievements)
    .bind(updated_at_i64)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM user_department_points WHERE roblox_id = $1")
        .bind(roblox_id_i64)
        .execute(&mut *tx)
        .await?;

    for (department, points) in &user.department_points {
        sqlx::query(
            "INSERT INTO user_department_points (roblox_id, department, points) VALUES ($1, $2, $3)",
        )
        .bind(roblox_id_i64)
        .bind(department)
        .bind((*points).max(0))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    if inserted {
        let cache = db.cache();
        cache.invalidate(&total_users_key(cache)).await;
    }

    Ok(())
}

pub async fn delete_user(db: &Database, roblox_id: u64) -> anyhow::Result<bool> {
    let roblox_id_i64 = i64::try_from(roblox_id).context("roblox_id out of i64 range")?;

    let result = sqlx::query("DELETE FROM community_users WHERE roblox_id = $1")
        .bind(roblox_id_i64)
        .execute(db.pool())
        .await?;

    let cache = db.cache();
    cache.invalidate(&total_users_key(cache)).await;

    Ok(result.rows_affected() > 0)
}

/// Number of users whose `kind` field is strictly greater than `value`.
pub async fn count_users_above(
    db: &Database,
    kind: LeaderboardKind,
    value: i64,
) -> anyhow::Result<u64> {
    let count: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM community_users WHERE {} > $1",
        sort_column(kind)
    ))
    .bind(value)
    .fetch_one(db.pool())
    .await?;

    u64::try_from(count).context("user count out of u64 range")
}

/// Global rank for a value on the `kind` leaderboard. Ties share a rank.
pub async fn rank_for(db: &Database, kind: LeaderboardKind, value: i64) -> anyhow::Result<u64> {
    let above = count_users_above(db, kind, value).await?;
    Ok(rank_from_count(above))
}

pub async fn count_total_users(db: &Database) -> anyhow::Result<u64> {
    let cache = db.cache();
    let key = total_users_key(cache);

    cache
        .get_or_load_json(&key, TOTAL_USERS_TTL, || async {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM community_users")
                .fetch_one(db.pool())
                .await?;
            u64::try_from(count).context("user count out of u64 range")
        })
        .await
}

/// One slice of a leaderboard, ordered by the field descending and then by
/// `roblox_id` ascending so pages stay stable across calls.
pub async fn fetch_leaderboard_slice(
    db: &Database,
    kind: LeaderboardKind,
    limit: u64,
    offset: u64,
) -> anyhow::Result<Vec<LeaderboardEntry>> {
    if limit == 0 || limit > MAX_PAGE_SIZE {
        bail!("leaderboard slice limit must be between 1 and {MAX_PAGE_SIZE}, got {limit}");
    }
    let limit_i64 = i64::try_from(limit).context("limit out of i64 range")?;
    let offset_i64 = i64::try_from(offset).context("offset out of i64 range")?;
    let column = sort_column(kind);

    let rows: Vec<LeaderboardRow> = sqlx::query_as(&format!(
        "SELECT roblox_username, {column} AS sort_value
         FROM community_users
         ORDER BY {column} DESC, roblox_id ASC
         LIMIT $1 OFFSET $2"
    ))
    .bind(limit_i64)
    .bind(offset_i64)
    .fetch_all(db.pool())
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| LeaderboardEntry {
            display_name: row.roblox_username,
            sort_value: row.sort_value,
        })
        .collect())
}

pub async fn leaderboard_page(
    db: &Database,
    kind: LeaderboardKind,
    page_number: i64,
    page_size: u64,
) -> anyhow::Result<Page<LeaderboardEntry>> {
    let total = count_total_users(db).await?;
    let plan = PagePlan::new(page_number, page_size, total)?;
    let entries = fetch_leaderboard_slice(db, kind, plan.page_size, plan.offset).await?;

    Ok(Page { entries, plan })
}

pub async fn list_linked_users(db: &Database) -> anyhow::Result<Vec<UserRecord>> {
    let rows: Vec<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM community_users
         WHERE discord_id IS NOT NULL AND is_verified
         ORDER BY roblox_id"
    ))
    .fetch_all(db.pool())
    .await?;

    hydrate_many(db, rows).await
}

pub async fn list_all_users(db: &Database) -> anyhow::Result<Vec<UserRecord>> {
    let rows: Vec<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM community_users ORDER BY roblox_id"
    ))
    .fetch_all(db.pool())
    .await?;

    hydrate_many(db, rows).await
}

#[cfg(test)]
mod tests {
    use super::{DepartmentRow, UserRow, group_department_rows};

    fn department(roblox_id: i64, name: &str, points: i64) -> DepartmentRow {
        DepartmentRow {
            roblox_id,
            department: name.to_owned(),
            points,
        }
    }

    #[test]
    fn department_rows_are_grouped_per_user() {
        let mut grouped = group_department_rows(vec![
            department(1, "guide", 40),
            department(2, "sar", 5),
            department(1, "sar", 12),
        ]);

        let first = grouped.remove(&1).unwrap();
        assert_eq!(first.get("guide"), Some(&40));
        assert_eq!(first.get("sar"), Some(&12));
        assert_eq!(grouped.remove(&2).unwrap().len(), 1);
        assert!(grouped.is_empty());
    }

    #[test]
    fn negative_columns_are_floored_on_read() {
        let row = UserRow {
            roblox_id: 9,
            roblox_username: "climber".to_owned(),
            discord_id: None,
            is_verified: false,
            points: -3,
            expeditions: 2,
            summit_guides: -1,
            achievements: vec![4],
        };

        let record = row.into_record(Default::default()).unwrap();
        assert_eq!(record.points, 0);
        assert_eq!(record.expeditions, 2);
        assert_eq!(record.summit_guides, 0);
        assert!(record.achievements.contains(&4));
    }
}
