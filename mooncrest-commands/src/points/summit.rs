use poise::serenity_prelude as serenity;

use mooncrest_core::{Context, Error};
use mooncrest_database::impls::users::{find_user, find_user_by_discord_id, save_user};
use mooncrest_database::model::users::UserRecord;
use mooncrest_leveling::{PointsAction, apply_points};

use crate::CommandMeta;
use crate::access::ensure_manager;
use crate::points::logging::{LadderLog, publish_log};
use crate::points::parse_ladder_action;
use crate::replies::{
    escape_markdown, guild_only_message, negative_amount_message, not_linked_message,
    roblox_user_not_found_message, usage_message,
};

pub const META: CommandMeta = CommandMeta {
    name: "summit",
    desc: "Add, remove or set how many summits a climber has guided.",
    category: "points",
    usage: "!summit <add|remove|set> <roblox username> <amount>",
};

pub const MEMBER_META: CommandMeta = CommandMeta {
    name: "summitd",
    desc: "Add, remove or set the summit guide count of a linked Discord member.",
    category: "points",
    usage: "!summitd <add|remove|set> <member> <amount>",
};

fn summit_reply(
    action: PointsAction,
    amount: i64,
    name: &str,
    total: i64,
    linked_to: Option<u64>,
) -> String {
    let linked = linked_to.map_or_else(String::new, |id| format!(" (linked to <@{id}>)"));
    format!(
        "✅ {} {amount} Summit Guide count for **{name}**{linked}. Total: **{total}**",
        action.display_name()
    )
}

/// Event managers edit this counter, not point managers.
async fn ensure_event_manager(
    ctx: Context<'_>,
    guild_id: serenity::GuildId,
) -> Result<bool, Error> {
    ensure_manager(ctx, guild_id, &ctx.data().config.event_manager_roles).await
}

async fn commit_summit_guides(
    ctx: Context<'_>,
    mut record: UserRecord,
    action: PointsAction,
    amount: i64,
    linked_to: Option<u64>,
) -> Result<String, Error> {
    let data = ctx.data();
    let old_value = record.summit_guides;
    record.summit_guides = apply_points(old_value, action, amount)?;
    save_user(&data.db, &record).await?;

    let name = escape_markdown(&record.roblox_username);
    let mut target = format!("{name} ({})", record.roblox_id);
    if let Some(discord_id) = linked_to {
        target.push_str(&format!("\n<@{discord_id}>"));
    }

    let log = LadderLog {
        title: if linked_to.is_some() {
            "🏔️ Summit Guide Log (Event - Discord)".to_owned()
        } else {
            "🏔️ Summit Guide Log (Event)".to_owned()
        },
        action,
        amount,
        target,
        old_value,
        new_value: record.summit_guides,
    };
    publish_log(
        ctx.http(),
        data.config.event_log_channel(),
        log.embed(data.config.embed_color, ctx.author().id),
    )
    .await;

    Ok(summit_reply(action, amount, &name, record.summit_guides, linked_to))
}

#[poise::command(prefix_command, slash_command, category = "Points")]
pub async fn summit(
    ctx: Context<'_>,
    #[description = "add, remove or set"] action: Option<String>,
    #[description = "Roblox username"] username: Option<String>,
    #[description = "Number of guided summits"] amount: Option<i64>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    if !ensure_event_manager(ctx, guild_id).await? {
        return Ok(());
    }

    let (Some(action), Some(username), Some(amount)) =
        (parse_ladder_action(action.as_deref()), username, amount)
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

    let reply = commit_summit_guides(ctx, record, action, amount, None).await?;
    ctx.say(reply).await?;

    Ok(())
}

#[poise::command(prefix_command, slash_command, category = "Points")]
pub async fn summitd(
    ctx: Context<'_>,
    #[description = "add, remove or set"] action: Option<String>,
    #[description = "Linked Discord member"] member: Option<serenity::User>,
    #[description = "Number of guided summits"] amount: Option<i64>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    if !ensure_event_manager(ctx, guild_id).await? {
        return Ok(());
    }

    let (Some(action), Some(member), Some(amount)) =
        (parse_ladder_action(action.as_deref()), member, amount)
    else {
        ctx.say(usage_message(MEMBER_META.usage)).await?;
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

    let reply = commit_summit_guides(ctx, record, action, amount, Some(member.id.get())).await?;
    ctx.send(
        poise::CreateReply::default()
            .content(reply)
            .allowed_mentions(serenity::CreateAllowedMentions::new()),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use mooncrest_database::model::users::UserRecord;
    use mooncrest_leveling::{PointsAction, apply_points};

    use super::summit_reply;

    #[test]
    fn replies_carry_the_total() {
        assert_eq!(
            summit_reply(PointsAction::Add, 3, "climber", 5, None),
            "✅ Add 3 Summit Guide count for **climber**. Total: **5**"
        );
        assert_eq!(
            summit_reply(PointsAction::Set, 2, "climber", 2, Some(9)),
            "✅ Set 2 Summit Guide count for **climber** (linked to <@9>). Total: **2**"
        );
    }

    #[test]
    fn guide_count_floors_at_zero_and_leaves_points_alone() {
        let mut record = UserRecord::new(1, "climber");
        record.points = 80;
        record.summit_guides = 2;

        record.summit_guides =
            apply_points(record.summit_guides, PointsAction::Remove, 5).unwrap();

        assert_eq!(record.summit_guides, 0);
        assert_eq!(record.points, 80);
        assert_eq!(record.expeditions, 0);
    }
}
