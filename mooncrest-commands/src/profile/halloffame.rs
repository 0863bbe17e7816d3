use mooncrest_core::{BotConfig, Context, Error};
use mooncrest_database::impls::users::list_all_users;
use mooncrest_database::model::users::UserRecord;
use mooncrest_utils::pagination::paginate_embed_pages;

use crate::CommandMeta;
use crate::profile::achievement_names;
use crate::replies::escape_markdown;

pub const META: CommandMeta = CommandMeta {
    name: "halloffame",
    desc: "List every climber holding an achievement.",
    category: "profile",
    usage: "!halloffame [page]",
};

const HALL_OF_FAME_PER_PAGE: usize = 10;

/// One line per user with a known achievement, most points first.
fn hall_of_fame_lines(users: &[UserRecord], config: &BotConfig) -> Vec<String> {
    let mut honoured: Vec<(&UserRecord, Vec<&str>)> = users
        .iter()
        .map(|user| (user, achievement_names(config, user)))
        .filter(|(_, names)| !names.is_empty())
        .collect();

    honoured.sort_by(|(a, _), (b, _)| b.points.cmp(&a.points).then(a.roblox_id.cmp(&b.roblox_id)));

    honoured
        .into_iter()
        .map(|(user, names)| {
            format!(
                "🏅 **{}** (XP: {}) → {}",
                escape_markdown(&user.roblox_username),
                user.points,
                names.join(", ")
            )
        })
        .collect()
}

#[poise::command(prefix_command, slash_command, category = "Profile")]
pub async fn halloffame(
    ctx: Context<'_>,
    #[description = "Page number"] page: Option<usize>,
) -> Result<(), Error> {
    ctx.defer().await?;

    let data = ctx.data();
    let users = list_all_users(&data.db).await?;
    let lines = hall_of_fame_lines(&users, &data.config);

    if lines.is_empty() {
        ctx.say("⚠️ No climbers with achievements yet.").await?;
        return Ok(());
    }

    let pages: Vec<String> = lines
        .chunks(HALL_OF_FAME_PER_PAGE)
        .map(|chunk| chunk.join("\n"))
        .collect();

    paginate_embed_pages(
        ctx,
        "🏆 Hall of Fame",
        data.config.embed_color,
        &pages,
        page.unwrap_or(1),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use mooncrest_core::BotConfig;
    use mooncrest_database::model::users::UserRecord;

    use super::hall_of_fame_lines;

    #[test]
    fn lists_only_honoured_users_by_points() {
        let config = BotConfig::from_json(
            r#"{"group_id": 1, "achievements": [
                {"id": 1, "name": "First Summit"},
                {"id": 2, "name": "Night Climber"}
            ]}"#,
        )
        .unwrap();

        let mut low = UserRecord::new(1, "low");
        low.points = 10;
        low.achievements.insert(2);
        let mut high = UserRecord::new(2, "high");
        high.points = 90;
        high.achievements.extend([1, 2]);
        let mut unknown_only = UserRecord::new(3, "ghost");
        unknown_only.achievements.insert(99);
        let plain = UserRecord::new(4, "plain");

        let lines = hall_of_fame_lines(&[low, high, unknown_only, plain], &config);

        assert_eq!(
            lines,
            vec![
                "🏅 **high** (XP: 90) → First Summit, Night Climber".to_owned(),
                "🏅 **low** (XP: 10) → Night Climber".to_owned(),
            ]
        );
    }
}
