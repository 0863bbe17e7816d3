use poise::serenity_prelude as serenity;

use mooncrest_core::{Context, Error};
use mooncrest_database::impls::users::find_user_by_discord_id;

use crate::CommandMeta;
use crate::access::ensure_manager;
use crate::points::{commit_main_points, parse_action};
use crate::replies::{guild_only_message, negative_amount_message, not_linked_message, usage_message};

pub const META: CommandMeta = CommandMeta {
    name: "xpd",
    desc: "Add, remove, set or give bonus Lunar Points to a linked Discord member.",
    category: "points",
    usage: "!xpd <add|remove|set|bonus> <member> <amount> [reason]",
};

#[poise::command(prefix_command, slash_command, category = "Points")]
pub async fn xpd(
    ctx: Context<'_>,
    #[description = "add, remove, set or bonus"] action: Option<String>,
    #[description = "Linked Discord member"] member: Option<serenity::User>,
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

    let (Some(action), Some(member), Some(amount)) =
        (parse_action(action.as_deref()), member, amount)
    else {
        ctx.say(usage_message(META.usage)).await?;
        return Ok(());
    };

    if amount < 0 {
        ctx.say(negative_amount_message()).await?;
        return Ok(());
    }

    ctx.defer().await?;

    let record = find_user_by_discord_id(&ctx.data().db, member.id.get())
        .await?
        .filter(|record| record.is_linked());
    let Some(record) = record else {
        ctx.say(not_linked_message(member.id.get())).await?;
        return Ok(());
    };

    let reason = reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
    let reply = commit_main_points(ctx, guild_id, record, action, amount, reason).await?;
    ctx.say(format!("{reply}\nLinked to <@{}>.", member.id.get()))
        .await?;

    Ok(())
}
