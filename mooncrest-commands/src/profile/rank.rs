use poise::serenity_prelude as serenity;
use tracing::warn;

use mooncrest_core::{Context, Data, Error};
use mooncrest_database::impls::users::rank_for;
use mooncrest_leveling::{LeaderboardKind, render_progress, resolve_level};
use mooncrest_roblox::profile_url;

use crate::CommandMeta;
use crate::points::POINTS_NAME;
use crate::profile::{
    NO_ACHIEVEMENTS, Profile, ProfileLookup, achievement_names, progress_field, resolve_profile,
};
use crate::replies::guild_only_message;

pub const META: CommandMeta = CommandMeta {
    name: "rank",
    desc: "Show your level, Lunar Points and achievements, or someone else's.",
    category: "profile",
    usage: "!rank [member|discord id|roblox username]",
};

async fn rank_embed(data: &Data, profile: &Profile) -> Result<serenity::CreateEmbed, Error> {
    let record = &profile.record;
    let levels = &data.config.levels;

    let global_rank = rank_for(&data.db, LeaderboardKind::Points, record.points).await?;
    let resolved = resolve_level(record.points, levels);
    let progress = render_progress(record.points, &resolved);

    let achievements = achievement_names(&data.config, record);
    let achievements = if achievements.is_empty() {
        NO_ACHIEVEMENTS.to_owned()
    } else {
        achievements.join("\n")
    };

    let mut embed = serenity::CreateEmbed::new()
        .title(profile.roblox.nickname())
        .url(profile_url(profile.roblox.id))
        .color(data.config.embed_color)
        .field("Global Rank", format!("#{global_rank}"), true)
        .field("Level", resolved.name(), true)
        .field(POINTS_NAME, record.points.to_string(), true)
        .field("Expeditions", record.expeditions.to_string(), true)
        .field("Progress", progress_field(&progress), false)
        .field("Next Level", progress.message.clone(), false)
        .field("🏅 Achievements", achievements, false);

    match data.roblox.avatar_headshot(profile.roblox.id).await {
        Ok(Some(url)) => embed = embed.thumbnail(url),
        Ok(None) => {}
        Err(err) => warn!(?err, roblox_id = profile.roblox.id, "headshot lookup failed"),
    }

    Ok(embed)
}

#[poise::command(prefix_command, slash_command, category = "Profile")]
pub async fn rank(
    ctx: Context<'_>,
    #[description = "Discord member, Discord id or Roblox username"]
    #[rest]
    target: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    ctx.defer().await?;

    let profile = match resolve_profile(ctx, guild_id, target.as_deref(), true).await? {
        ProfileLookup::Found(profile) => profile,
        ProfileLookup::Missing(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    let embed = rank_embed(ctx.data(), &profile).await?;
    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}
