use std::collections::BTreeMap;

use poise::serenity_prelude as serenity;

use mooncrest_core::config::Achievement;
use mooncrest_core::{BotConfig, Context, Error};
use mooncrest_database::impls::users::list_all_users;
use mooncrest_database::model::users::UserRecord;
use mooncrest_leveling::resolve_level;

use crate::CommandMeta;
use crate::access::ensure_manager;
use crate::points::POINTS_NAME;
use crate::replies::{escape_markdown, guild_only_message};

pub const META: CommandMeta = CommandMeta {
    name: "stats",
    desc: "Community statistics dashboard for staff.",
    category: "profile",
    usage: "!stats",
};

/// Aggregates over every stored user.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct CommunityStats<'a> {
    pub total_users: usize,
    pub verified_users: usize,
    pub total_points: i64,
    pub total_expeditions: i64,
    pub top_points: Option<&'a UserRecord>,
    pub top_expeditions: Option<&'a UserRecord>,
    /// Configured levels that have at least one user, in ladder order.
    pub level_distribution: Vec<(&'a str, usize)>,
    /// Least-owned achievement among those held by anyone.
    pub rarest_achievement: Option<(&'a Achievement, usize)>,
}

/// Highest `field`, earliest `roblox_id` on ties.
fn top_by<'a>(users: &'a [UserRecord], field: fn(&UserRecord) -> i64) -> Option<&'a UserRecord> {
    users
        .iter()
        .max_by(|a, b| field(a).cmp(&field(b)).then(b.roblox_id.cmp(&a.roblox_id)))
}

pub(crate) fn compute_stats<'a>(users: &'a [UserRecord], config: &'a BotConfig) -> CommunityStats<'a> {
    let mut per_level: BTreeMap<usize, usize> = BTreeMap::new();
    let mut owners: BTreeMap<i64, usize> = BTreeMap::new();

    for user in users {
        if let Some(index) = resolve_level(user.points, &config.levels).index() {
            *per_level.entry(index).or_default() += 1;
        }
        for id in &user.achievements {
            *owners.entry(*id).or_default() += 1;
        }
    }

    let thresholds = config.levels.thresholds();
    let level_distribution = per_level
        .into_iter()
        .map(|(index, count)| (thresholds[index].name.as_str(), count))
        .collect();

    let rarest_achievement = config
        .achievements
        .iter()
        .filter_map(|achievement| owners.get(&achievement.id).map(|count| (achievement, *count)))
        .min_by_key(|(_, count)| *count);

    CommunityStats {
        total_users: users.len(),
        verified_users: users.iter().filter(|user| user.is_linked()).count(),
        total_points: users.iter().fold(0i64, |acc, user| acc.saturating_add(user.points)),
        total_expeditions: users
            .iter()
            .fold(0i64, |acc, user| acc.saturating_add(user.expeditions)),
        top_points: top_by(users, |user| user.points),
        top_expeditions: top_by(users, |user| user.expeditions),
        level_distribution,
        rarest_achievement,
    }
}

impl CommunityStats<'_> {
    fn level_distribution_field(&self) -> String {
        if self.level_distribution.is_empty() {
            return "N/A".to_owned();
        }
        self.level_distribution
            .iter()
            .map(|(name, count)| format!("**{name}**: {count} users"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn rarest_field(&self) -> String {
        match self.rarest_achievement {
            Some((achievement, owners)) => format!("**{}** ({owners} owners)", achievement.name),
            None => "N/A (No achievements given)".to_owned(),
        }
    }

    fn embed(&self, color: u32) -> serenity::CreateEmbed {
        let top_points = self.top_points.map_or_else(
            || "N/A".to_owned(),
            |user| format!("**{}** ({} {POINTS_NAME})", escape_markdown(&user.roblox_username), user.points),
        );
        let top_expeditions = self.top_expeditions.map_or_else(
            || "N/A".to_owned(),
            |user| {
                format!(
                    "**{}** ({} expeditions)",
                    escape_markdown(&user.roblox_username),
                    user.expeditions
                )
            },
        );

        serenity::CreateEmbed::new()
            .title("📈 Community Statistics")
            .color(color)
            .description(format!(
                "Summary of **{}** users in the database.",
                self.total_users
            ))
            .field(
                "Verified Users",
                format!("**{}** / {} users", self.verified_users, self.total_users),
                true,
            )
            .field(
                format!("Total {POINTS_NAME}"),
                format!("**{}**", self.total_points),
                true,
            )
            .field(
                "Total Expeditions",
                format!("**{}** expeditions", self.total_expeditions),
                true,
            )
            .field(format!("Top {POINTS_NAME}"), top_points, false)
            .field("Most Expeditions", top_expeditions, false)
            .field("Level Distribution", self.level_distribution_field(), true)
            .field("Rarest Achievement", self.rarest_field(), true)
            .footer(serenity::CreateEmbedFooter::new("These statistics are for staff only."))
            .timestamp(serenity::Timestamp::now())
    }
}

#[poise::command(prefix_command, slash_command, category = "Profile")]
pub async fn stats(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    let data = ctx.data();
    if !ensure_manager(ctx, guild_id, &data.config.stats_roles).await? {
        return Ok(());
    }

    ctx.defer_ephemeral().await?;

    let users = list_all_users(&data.db).await?;
    if users.is_empty() {
        ctx.say("⚠️ No users found in the database yet.").await?;
        return Ok(());
    }

    let stats = compute_stats(&users, &data.config);
    ctx.send(
        poise::CreateReply::default()
            .ephemeral(true)
            .embed(stats.embed(data.config.embed_color)),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use mooncrest_core::BotConfig;
    use mooncrest_database::model::users::UserRecord;

    use super::compute_stats;

    fn config() -> BotConfig {
        BotConfig::from_json(
            r#"{
                "group_id": 1,
                "levels": [
                    {"name": "Novice", "min_points": 0},
                    {"name": "Explorer", "min_points": 100},
                    {"name": "Summiteer", "min_points": 500}
                ],
                "achievements": [
                    {"id": 1, "name": "First Summit"},
                    {"id": 2, "name": "Night Climber"},
                    {"id": 3, "name": "Never Given"}
                ]
            }"#,
        )
        .unwrap()
    }

    fn user(id: u64, points: i64, expeditions: i64, achievements: &[i64]) -> UserRecord {
        let mut record = UserRecord::new(id, format!("climber{id}"));
        record.points = points;
        record.expeditions = expeditions;
        record.achievements.extend(achievements.iter().copied());
        record
    }

    #[test]
    fn aggregates_totals_and_leaders() {
        let config = config();
        let mut linked = user(3, 40, 9, &[]);
        linked.link_discord(42);
        let users = vec![user(1, 600, 2, &[1, 2]), user(2, 150, 5, &[1]), linked];

        let stats = compute_stats(&users, &config);

        assert_eq!(stats.total_users, 3);
        assert_eq!(stats.verified_users, 1);
        assert_eq!(stats.total_points, 790);
        assert_eq!(stats.total_expeditions, 16);
        assert_eq!(stats.top_points.map(|u| u.roblox_id), Some(1));
        assert_eq!(stats.top_expeditions.map(|u| u.roblox_id), Some(3));
        assert_eq!(
            stats.level_distribution,
            vec![("Novice", 1), ("Explorer", 1), ("Summiteer", 1)]
        );
    }

    #[test]
    fn rarest_skips_unowned_achievements() {
        let config = config();
        let users = vec![user(1, 0, 0, &[1, 2]), user(2, 0, 0, &[1])];

        let stats = compute_stats(&users, &config);
        let (achievement, owners) = stats.rarest_achievement.unwrap();

        assert_eq!(achievement.name, "Night Climber");
        assert_eq!(owners, 1);
        assert_eq!(stats.level_distribution, vec![("Novice", 2)]);
    }

    #[test]
    fn ties_prefer_the_lowest_id() {
        let config = config();
        let users = vec![user(5, 10, 0, &[]), user(4, 10, 0, &[])];

        assert_eq!(compute_stats(&users, &config).top_points.map(|u| u.roblox_id), Some(4));
    }
}
