use poise::serenity_prelude as serenity;

use mooncrest_core::{Context, Error};
use mooncrest_database::impls::users::find_user_by_discord_id;

use crate::CommandMeta;
use crate::access::ensure_manager;
use crate::replies::{escape_markdown, guild_only_message, not_linked_message, usage_message};
use crate::rewards::{RewardAction, select_id, selectable_achievements};

pub const META: CommandMeta = CommandMeta {
    name: "reward",
    desc: "Give or remove an achievement through a selection menu.",
    category: "rewards",
    usage: "!reward <add|remove> <member>",
};

#[poise::command(prefix_command, slash_command, category = "Rewards")]
pub async fn reward(
    ctx: Context<'_>,
    #[description = "add or remove"] action: Option<String>,
    #[description = "Linked member"] member: Option<serenity::User>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    let data = ctx.data();
    if !ensure_manager(ctx, guild_id, &data.config.reward_manager_roles).await? {
        return Ok(());
    }

    let (Some(action), Some(member)) = (action.as_deref().and_then(RewardAction::parse), member)
    else {
        ctx.say(usage_message(META.usage)).await?;
        return Ok(());
    };

    ctx.defer_ephemeral().await?;

    let record = find_user_by_discord_id(&data.db, member.id.get())
        .await?
        .filter(|record| record.is_linked());
    let Some(record) = record else {
        ctx.say(not_linked_message(member.id.get())).await?;
        return Ok(());
    };

    let name = escape_markdown(&record.roblox_username);
    let choices = selectable_achievements(&data.config, &record, action);
    if choices.is_empty() {
        let message = match action {
            RewardAction::Add => format!("✅ **{name}** already has all available achievements."),
            RewardAction::Remove => format!("⚠️ **{name}** has no achievements to remove."),
        };
        ctx.say(message).await?;
        return Ok(());
    }

    let options = choices
        .into_iter()
        .map(|achievement| {
            let description = if achievement.description.is_empty() {
                "—".to_owned()
            } else {
                achievement.description.chars().take(100).collect()
            };
            serenity::CreateSelectMenuOption::new(achievement.name.clone(), achievement.id.to_string())
                .description(description)
        })
        .collect();

    let (placeholder, prompt) = match action {
        RewardAction::Add => (
            "Select achievement to add",
            format!("🎖 Select achievement to give to **{name}** (<@{}>)", member.id.get()),
        ),
        RewardAction::Remove => (
            "Select achievement to remove",
            format!("🗑 Select achievement to remove from **{name}** (<@{}>)", member.id.get()),
        ),
    };

    let menu = serenity::CreateSelectMenu::new(
        select_id(action, member.id.get()),
        serenity::CreateSelectMenuKind::String { options },
    )
    .placeholder(placeholder);

    ctx.send(
        poise::CreateReply::default()
            .ephemeral(true)
            .content(prompt)
            .components(vec![serenity::CreateActionRow::SelectMenu(menu)]),
    )
    .await?;

    Ok(())
}
