pub mod listreward;
pub mod reward;

use poise::serenity_prelude as serenity;
use tracing::info;

use mooncrest_core::config::Achievement;
use mooncrest_core::{BotConfig, Data};
use mooncrest_database::impls::users::{find_user_by_discord_id, save_user};
use mooncrest_database::model::users::UserRecord;
use mooncrest_utils::permissions::has_manager_access;

use crate::points::logging::publish_log;
use crate::replies::{escape_markdown, no_permission_message};

/// Custom id prefix of the reward select menus.
pub const SELECT_PREFIX: &str = "reward";

/// Discord's cap on options in one select menu.
const MAX_SELECT_OPTIONS: usize = 25;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RewardAction {
    Add,
    Remove,
}

impl RewardAction {
    fn as_str(self) -> &'static str {
        match self {
            RewardAction::Add => "add",
            RewardAction::Remove => "remove",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "add" | "give" => Some(RewardAction::Add),
            "remove" | "take" => Some(RewardAction::Remove),
            _ => None,
        }
    }
}

/// `reward:<add|remove>:<discord id>`
pub fn select_id(action: RewardAction, discord_id: u64) -> String {
    format!("{SELECT_PREFIX}:{}:{discord_id}", action.as_str())
}

pub fn parse_select_id(custom_id: &str) -> Option<(RewardAction, u64)> {
    let mut parts = custom_id.split(':');
    if parts.next()? != SELECT_PREFIX {
        return None;
    }
    let action = RewardAction::parse(parts.next()?)?;
    let discord_id = parts.next()?.parse::<u64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((action, discord_id))
}

/// Achievements that `action` could apply to `record`: missing ones for add,
/// held ones for remove. Capped to one select menu.
pub fn selectable_achievements<'a>(
    config: &'a BotConfig,
    record: &UserRecord,
    action: RewardAction,
) -> Vec<&'a Achievement> {
    config
        .achievements
        .iter()
        .filter(|achievement| {
            let held = record.achievements.contains(&achievement.id);
            match action {
                RewardAction::Add => !held,
                RewardAction::Remove => held,
            }
        })
        .take(MAX_SELECT_OPTIONS)
        .collect()
}

/// Returns whether the record changed.
pub fn apply_reward(record: &mut UserRecord, action: RewardAction, achievement_id: i64) -> bool {
    match action {
        RewardAction::Add => record.achievements.insert(achievement_id),
        RewardAction::Remove => record.achievements.remove(&achievement_id),
    }
}

async fn update_message(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    content: String,
) -> anyhow::Result<()> {
    interaction
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::UpdateMessage(
                serenity::CreateInteractionResponseMessage::new()
                    .content(content)
                    .components(vec![]),
            ),
        )
        .await?;
    Ok(())
}

/// Component handler for the menus sent by `reward`.
pub async fn handle_reward_select(
    ctx: &serenity::Context,
    data: &Data,
    interaction: &serenity::ComponentInteraction,
) -> anyhow::Result<()> {
    let Some((action, discord_id)) = parse_select_id(&interaction.data.custom_id) else {
        return Ok(());
    };
    let Some(guild_id) = interaction.guild_id else {
        return Ok(());
    };

    if !has_manager_access(
        &ctx.http,
        guild_id,
        interaction.user.id,
        &data.config.reward_manager_roles,
    )
    .await?
    {
        interaction
            .create_response(
                &ctx.http,
                serenity::CreateInteractionResponse::Message(
                    serenity::CreateInteractionResponseMessage::new()
                        .ephemeral(true)
                        .content(no_permission_message()),
                ),
            )
            .await?;
        return Ok(());
    }

    let serenity::ComponentInteractionDataKind::StringSelect { values } = &interaction.data.kind
    else {
        return Ok(());
    };

    let achievement = values
        .first()
        .and_then(|raw| raw.parse::<i64>().ok())
        .and_then(|id| data.config.achievement(id));
    let Some(achievement) = achievement else {
        return update_message(ctx, interaction, "⚠️ Achievement not found.".to_owned()).await;
    };

    let record = find_user_by_discord_id(&data.db, discord_id)
        .await?
        .filter(|record| record.is_linked());
    let Some(mut record) = record else {
        return update_message(
            ctx,
            interaction,
            format!("❌ <@{discord_id}> is no longer linked to a Roblox account."),
        )
        .await;
    };

    let changed = apply_reward(&mut record, action, achievement.id);
    if changed {
        save_user(&data.db, &record).await?;
        info!(
            discord_id,
            achievement_id = achievement.id,
            action = action.as_str(),
            by = interaction.user.id.get(),
            "achievement updated"
        );

        let log = serenity::CreateEmbed::new()
            .title("🎖️ Reward Log")
            .color(data.config.embed_color)
            .field(
                "Action",
                match action {
                    RewardAction::Add => "Add",
                    RewardAction::Remove => "Remove",
                },
                true,
            )
            .field("Achievement", achievement.name.clone(), true)
            .field(
                "Target",
                format!(
                    "{} (<@{discord_id}>)",
                    escape_markdown(&record.roblox_username)
                ),
                true,
            )
            .field("By", format!("<@{}>", interaction.user.id.get()), true)
            .timestamp(serenity::Timestamp::now());
        publish_log(&ctx.http, data.config.reward_log_channel_id, log).await;
    }

    let name = escape_markdown(&record.roblox_username);
    let content = match (action, changed) {
        (RewardAction::Add, true) => format!("✅ Added **{}** to **{name}**", achievement.name),
        (RewardAction::Remove, true) => format!("🗑 Removed **{}** from **{name}**", achievement.name),
        (RewardAction::Add, false) => format!("ℹ️ **{name}** already has **{}**", achievement.name),
        (RewardAction::Remove, false) => {
            format!("ℹ️ **{name}** does not have **{}**", achievement.name)
        }
    };
    update_message(ctx, interaction, content).await
}

#[cfg(test)]
mod tests {
    use mooncrest_core::BotConfig;
    use mooncrest_database::model::users::UserRecord;

    use super::{
        RewardAction, apply_reward, parse_select_id, select_id, selectable_achievements,
    };

    fn config() -> BotConfig {
        BotConfig::from_json(
            r#"{"group_id": 1, "achievements": [
                {"id": 1, "name": "First Summit"},
                {"id": 2, "name": "Night Climber"},
                {"id": 3, "name": "Rescuer"}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn select_ids_round_trip() {
        let id = select_id(RewardAction::Remove, 123_456_789_012_345_678);
        assert_eq!(id, "reward:remove:123456789012345678");
        assert_eq!(
            parse_select_id(&id),
            Some((RewardAction::Remove, 123_456_789_012_345_678))
        );
        assert_eq!(parse_select_id("lb:next:points:1"), None);
        assert_eq!(parse_select_id("reward:grant:1"), None);
    }

    #[test]
    fn options_depend_on_the_action() {
        let config = config();
        let mut record = UserRecord::new(1, "climber");
        record.achievements.insert(2);

        let addable: Vec<i64> = selectable_achievements(&config, &record, RewardAction::Add)
            .iter()
            .map(|a| a.id)
            .collect();
        let removable: Vec<i64> = selectable_achievements(&config, &record, RewardAction::Remove)
            .iter()
            .map(|a| a.id)
            .collect();

        assert_eq!(addable, vec![1, 3]);
        assert_eq!(removable, vec![2]);
    }

    #[test]
    fn applying_twice_is_a_no_op() {
        let mut record = UserRecord::new(1, "climber");

        assert!(apply_reward(&mut record, RewardAction::Add, 3));
        assert!(!apply_reward(&mut record, RewardAction::Add, 3));
        assert!(apply_reward(&mut record, RewardAction::Remove, 3));
        assert!(!apply_reward(&mut record, RewardAction::Remove, 3));
    }
}
