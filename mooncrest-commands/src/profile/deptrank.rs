use poise::serenity_prelude as serenity;
use tracing::warn;

use mooncrest_core::config::DepartmentConfig;
use mooncrest_core::{Context, Error};
use mooncrest_leveling::{render_progress, resolve_level};
use mooncrest_roblox::profile_url;

use crate::CommandMeta;
use crate::profile::{ProfileLookup, progress_field, resolve_profile};
use crate::replies::guild_only_message;

pub const META: CommandMeta = CommandMeta {
    name: "deptrank",
    desc: "Show department ranks (guide, SAR) for you or someone else.",
    category: "profile",
    usage: "!deptrank [member|discord id|roblox username]",
};

/// Members who never earned department points show "N/A".
fn department_field(department: &DepartmentConfig, points: i64) -> String {
    if points <= 0 {
        return "N/A".to_owned();
    }

    let resolved = resolve_level(points, &department.levels);
    let progress = render_progress(points, &resolved);
    format!(
        "**Rank:** {}\n**Points:** {points}\n{}",
        resolved.name(),
        progress_field(&progress)
    )
}

#[poise::command(prefix_command, slash_command, category = "Profile")]
pub async fn deptrank(
    ctx: Context<'_>,
    #[description = "Discord member, Discord id or Roblox username"]
    #[rest]
    target: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    let data = ctx.data();
    if data.config.departments.is_empty() {
        ctx.say("⚠️ No departments are configured.").await?;
        return Ok(());
    }

    ctx.defer().await?;

    let profile = match resolve_profile(ctx, guild_id, target.as_deref(), false).await? {
        ProfileLookup::Found(profile) => profile,
        ProfileLookup::Missing(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    let mut embed = serenity::CreateEmbed::new()
        .title(format!("Department Ranks for {}", profile.roblox.nickname()))
        .url(profile_url(profile.roblox.id))
        .color(data.config.embed_color);

    for (key, department) in &data.config.departments {
        embed = embed.field(
            format!("{} Department", department.label),
            department_field(department, profile.record.department_points(key)),
            true,
        );
    }

    match data.roblox.avatar_headshot(profile.roblox.id).await {
        Ok(Some(url)) => embed = embed.thumbnail(url),
        Ok(None) => {}
        Err(err) => warn!(?err, roblox_id = profile.roblox.id, "headshot lookup failed"),
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use mooncrest_core::config::DepartmentConfig;
    use mooncrest_leveling::{LevelTable, LevelThreshold};

    use super::department_field;

    fn guides() -> DepartmentConfig {
        DepartmentConfig {
            label: "Guide".to_owned(),
            levels: LevelTable::new(vec![
                LevelThreshold::new("Trainee", 0),
                LevelThreshold::new("Guide I", 100),
            ])
            .unwrap(),
            manager_roles: Vec::new(),
        }
    }

    #[test]
    fn zero_points_are_not_ranked() {
        assert_eq!(department_field(&guides(), 0), "N/A");
    }

    #[test]
    fn ranked_members_show_progress() {
        let field = department_field(&guides(), 150);
        assert!(field.starts_with("**Rank:** Guide I\n**Points:** 150\n"));
        assert!(field.ends_with("(100%)"));
    }
}
