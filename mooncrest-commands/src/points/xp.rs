use mooncrest_core::{Context, Error};
use mooncrest_database::impls::users::find_user;
use mooncrest_database::model::users::UserRecord;

use crate::CommandMeta;
use crate::access::ensure_manager;
use crate::points::{commit_main_points, parse_action};
use crate::replies::{
    guild_only_message, negative_amount_message, roblox_user_not_found_message, usage_message,
};

pub const META: CommandMeta = CommandMeta {
    name: "xp",
    desc: "Add, remove, set or give bonus Lunar Points by Roblox username.",
    category: "points",
    usage: "!xp <add|remove|set|bonus> <roblox username> <amount> [reason]",
};

#[poise::command(prefix_command, slash_command, category = "Points")]
pub async fn xp(
    ctx: Context<'_>,
    #[description = "add, remove, set or bonus"] action: Option<String>,
    #[description = "Roblox username"] username: Option<String>,
    #[description = "Lunar Points amount"] amount: Option<i64>,
    #[description = "Optional reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    if !ensure_manager(ctx, guild_id, &ctx.data().config.xp_manager_roles).await? {
        return Ok(());
    }

    let (Some(action), Some(username), Some(amount)) =
        (parse_action(action.as_deref()), username, amount)
    else {
        ctx.say(usage_message(META.usage)).await?;
        return Ok(());
    };

    if amount < 0 {
        ctx.say(negative_amount_message()).await?;
        return Ok(());
    }

    ctx.defer().await?;

    let data = ctx.data();
    let Some(roblox_user) = data.roblox.user_by_username(&username).await? else {
        ctx.say(roblox_user_not_found_message(&username)).await?;
        return Ok(());
    };

    if !data.roblox.is_in_group(roblox_user.id).await? {
        ctx.say("❌ User is not in the community group.").await?;
        return Ok(());
    }

    let mut record = find_user(&data.db, roblox_user.id)
        .await?
        .unwrap_or_else(|| UserRecord::new(roblox_user.id, roblox_user.name.clone()));
    record.roblox_username = roblox_user.name;

    let reason = reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
    let reply = commit_main_points(ctx, guild_id, record, action, amount, reason).await?;
    ctx.say(reply).await?;

    Ok(())
}
