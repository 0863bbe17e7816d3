use poise::serenity_prelude as serenity;

use mooncrest_core::config::Achievement;
use mooncrest_core::{Context, Error};

use crate::CommandMeta;

pub const META: CommandMeta = CommandMeta {
    name: "listreward",
    desc: "Show every achievement that can be awarded.",
    category: "rewards",
    usage: "!listreward",
};

fn achievement_list(achievements: &[Achievement]) -> String {
    achievements
        .iter()
        .map(|achievement| {
            let description = if achievement.description.is_empty() {
                "No description provided."
            } else {
                achievement.description.as_str()
            };
            format!("**🎖️ {}**\n↳ *{description}*", achievement.name)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[poise::command(prefix_command, slash_command, category = "Rewards")]
pub async fn listreward(ctx: Context<'_>) -> Result<(), Error> {
    let config = &ctx.data().config;

    if config.achievements.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .ephemeral(true)
                .content("⚠️ No achievements are configured."),
        )
        .await?;
        return Ok(());
    }

    let embed = serenity::CreateEmbed::new()
        .title("List of All Achievements")
        .color(config.embed_color)
        .description(achievement_list(&config.achievements))
        .timestamp(serenity::Timestamp::now());
    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use mooncrest_core::config::Achievement;

    use super::achievement_list;

    #[test]
    fn missing_descriptions_get_a_placeholder() {
        let achievements = vec![
            Achievement {
                id: 1,
                name: "First Summit".to_owned(),
                description: "Reach the peak".to_owned(),
            },
            Achievement {
                id: 2,
                name: "Night Climber".to_owned(),
                description: String::new(),
            },
        ];

        assert_eq!(
            achievement_list(&achievements),
            "**🎖️ First Summit**\n↳ *Reach the peak*\n**🎖️ Night Climber**\n↳ *No description provided.*"
        );
    }
}
