pub mod deptrank;
pub mod halloffame;
pub mod leaderboard;
pub mod rank;
pub mod stats;

use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use mooncrest_core::{BotConfig, Context, Error};
use mooncrest_database::impls::users::{find_user, find_user_by_discord_id, save_user};
use mooncrest_database::model::users::UserRecord;
use mooncrest_leveling::Progress;
use mooncrest_roblox::RobloxUser;
use mooncrest_utils::parse::{ProfileTarget, parse_profile_target};

use crate::linking::apply_verification;
use crate::replies::{escape_markdown, roblox_user_not_found_message};

pub(crate) const NO_ACHIEVEMENTS: &str = "— None —";

/// A stored (or zeroed) record plus the live Roblox account behind it.
pub(crate) struct Profile {
    pub record: UserRecord,
    pub roblox: RobloxUser,
}

pub(crate) enum ProfileLookup {
    Found(Profile),
    /// Reply to send instead of a profile.
    Missing(String),
}

pub(crate) fn not_verified_message(target: Option<&str>) -> String {
    let who = match target {
        Some(target) => format!("**{}** is", escape_markdown(target)),
        None => "You are".to_owned(),
    };
    format!("❌ {who} not verified with this bot or RoVer in this server.")
}

pub(crate) fn progress_field(progress: &Progress) -> String {
    format!("{} ({}%)", progress.bar(), progress.percent)
}

/// Configured names of the achievements a record holds, in id order.
pub(crate) fn achievement_names<'a>(config: &'a BotConfig, record: &UserRecord) -> Vec<&'a str> {
    record
        .achievements
        .iter()
        .filter_map(|id| config.achievement(*id))
        .map(|achievement| achievement.name.as_str())
        .collect()
}

/// Resolve whom a profile command is about: a Discord mention or id, a
/// Roblox username, or the caller. Discord users missing from the database
/// fall back to RoVer; with `link_from_rover` a RoVer hit with no stored
/// record is saved as a linked record and verified in the guild.
pub(crate) async fn resolve_profile(
    ctx: Context<'_>,
    guild_id: serenity::GuildId,
    target: Option<&str>,
    link_from_rover: bool,
) -> Result<ProfileLookup, Error> {
    let data = ctx.data();
    let target = target.map(str::trim).filter(|raw| !raw.is_empty());

    let discord_id = match target.and_then(parse_profile_target) {
        Some(ProfileTarget::Roblox(username)) => {
            let Some(roblox) = data.roblox.user_by_username(&username).await? else {
                return Ok(ProfileLookup::Missing(roblox_user_not_found_message(&username)));
            };
            let record = find_user(&data.db, roblox.id)
                .await?
                .unwrap_or_else(|| UserRecord::new(roblox.id, roblox.name.clone()));
            return Ok(ProfileLookup::Found(Profile { record, roblox }));
        }
        Some(ProfileTarget::Discord(discord_id)) => discord_id,
        None => ctx.author().id.get(),
    };

    let record = match find_user_by_discord_id(&data.db, discord_id).await? {
        Some(record) => record,
        None => {
            let link = match data.roblox.rover_link(guild_id.get(), discord_id).await {
                Ok(link) => link,
                Err(err) => {
                    warn!(?err, discord_id, "rover lookup failed");
                    None
                }
            };
            let Some(link) = link else {
                return Ok(ProfileLookup::Missing(not_verified_message(target)));
            };

            match find_user(&data.db, link.roblox_id).await? {
                Some(record) => record,
                None => {
                    let Some(roblox) = data.roblox.user_by_id(link.roblox_id).await? else {
                        return Ok(ProfileLookup::Missing(not_verified_message(target)));
                    };
                    let mut record = UserRecord::new(roblox.id, roblox.name.clone());
                    if link_from_rover {
                        auto_link(ctx, guild_id, discord_id, &mut record, &roblox).await?;
                    }
                    return Ok(ProfileLookup::Found(Profile { record, roblox }));
                }
            }
        }
    };

    let Some(roblox) = data.roblox.user_by_id(record.roblox_id).await? else {
        return Ok(ProfileLookup::Missing(format!(
            "⚠️ Could not fetch data for Roblox user **{}**. Their username might have changed.",
            escape_markdown(&record.roblox_username)
        )));
    };

    Ok(ProfileLookup::Found(Profile { record, roblox }))
}

async fn auto_link(
    ctx: Context<'_>,
    guild_id: serenity::GuildId,
    discord_id: u64,
    record: &mut UserRecord,
    roblox: &RobloxUser,
) -> Result<(), Error> {
    let data = ctx.data();
    record.link_discord(discord_id);
    save_user(&data.db, record).await?;
    info!(discord_id, roblox_id = roblox.id, "linked account from rover");

    if let Err(err) = apply_verification(
        ctx.http(),
        guild_id,
        serenity::UserId::new(discord_id),
        roblox,
        data.config.verified_role_id,
    )
    .await
    {
        warn!(?err, discord_id, "could not apply verification during auto-link");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use mooncrest_core::BotConfig;
    use mooncrest_database::model::users::UserRecord;
    use mooncrest_leveling::{LevelTable, LevelThreshold, render_progress, resolve_level};

    use super::{achievement_names, not_verified_message, progress_field};

    #[test]
    fn not_verified_names_the_target() {
        assert_eq!(
            not_verified_message(None),
            "❌ You are not verified with this bot or RoVer in this server."
        );
        assert_eq!(
            not_verified_message(Some("moon_walker")),
            "❌ **moon\\_walker** is not verified with this bot or RoVer in this server."
        );
    }

    #[test]
    fn progress_shows_bar_and_percent() {
        let table = LevelTable::new(vec![
            LevelThreshold::new("Novice", 0),
            LevelThreshold::new("Explorer", 100),
        ])
        .unwrap();
        let progress = render_progress(50, &resolve_level(50, &table));

        assert_eq!(progress_field(&progress), "⬜⬜⬜⬜⬜🔳🔳🔳🔳🔳 (50%)");
    }

    #[test]
    fn unknown_achievement_ids_are_hidden() {
        let config = BotConfig::from_json(
            r#"{"group_id": 1, "achievements": [
                {"id": 1, "name": "First Summit"},
                {"id": 2, "name": "Night Climber"}
            ]}"#,
        )
        .unwrap();
        let mut record = UserRecord::new(1, "climber");
        record.achievements.extend([2, 9, 1]);

        assert_eq!(achievement_names(&config, &record), vec!["First Summit", "Night Climber"]);
    }
}
