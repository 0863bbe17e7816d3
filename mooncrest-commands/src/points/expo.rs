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
    name: "expo",
    desc: "Add, remove or set a climber's expedition count without touching points.",
    category: "points",
    usage: "!expo <add|remove|set> <roblox username> <amount>",
};

pub const MEMBER_META: CommandMeta = CommandMeta {
    name: "expod",
    desc: "Add, remove or set the expedition count of a linked Discord member.",
    category: "points",
    usage: "!expod <add|remove|set> <member> <amount>",
};

fn expo_reply(
    action: PointsAction,
    amount: i64,
    name: &str,
    total: i64,
    linked_to: Option<u64>,
) -> String {
    let verb = match action {
        PointsAction::Add => format!("Added **{amount}** expeditions to"),
        PointsAction::Remove => format!("Removed **{amount}** expeditions from"),
        _ => "Set the expeditions of".to_owned(),
    };
    let linked = linked_to.map_or_else(String::new, |id| format!(" (linked to <@{id}>)"));
    format!("✅ {verb} **{name}**{linked}. They now have **{total}** expeditions.")
}

/// Apply, persist and log one expedition change. Returns the reply.
async fn commit_expeditions(
    ctx: Context<'_>,
    mut record: UserRecord,
    action: PointsAction,
    amount: i64,
    linked_to: Option<u64>,
) -> Result<String, Error> {
    let data = ctx.data();
    let old_value = record.expeditions;
    record.expeditions = apply_points(old_value, action, amount)?;
    save_user(&data.db, &record).await?;

    let name = escape_markdown(&record.roblox_username);
    let mut target = format!("{name} ({})", record.roblox_id);
    if let Some(discord_id) = linked_to {
        target.push_str(&format!("\n<@{discord_id}>"));
    }

    let log = LadderLog {
        title: if linked_to.is_some() {
            "🧗 Expeditions Log (Discord Target)".to_owned()
        } else {
            "🧗 Expeditions Log".to_owned()
        },
        action,
        amount,
        target,
        old_value,
        new_value: record.expeditions,
    };
    publish_log(
        ctx.http(),
        data.config.xp_log_channel_id,
        log.embed(data.config.embed_color, ctx.author().id),
    )
    .await;

    Ok(expo_reply(action, amount, &name, record.expeditions, linked_to))
}

#[poise::command(prefix_command, slash_command, category = "Points")]
pub async fn expo(
    ctx: Context<'_>,
    #[description = "add, remove or set"] action: Option<String>,
    #[description = "Roblox username"] username: Option<String>,
    #[description = "Number of expeditions"] amount: Option<i64>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    if !ensure_manager(ctx, guild_id, &ctx.data().config.xp_manager_roles).await? {
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

    let mut record = find_user(&data.db, roblox_user.id)
        .await?
        .unwrap_or_else(|| UserRecord::new(roblox_user.id, roblox_user.name.clone()));
    record.roblox_username = roblox_user.name;

    let reply = commit_expeditions(ctx, record, action, amount, None).await?;
    ctx.say(reply).await?;

    Ok(())
}

#[poise::command(prefix_command, slash_command, category = "Points")]
pub async fn expod(
    ctx: Context<'_>,
    #[description = "add, remove or set"] action: Option<String>,
    #[description = "Linked Discord member"] member: Option<serenity::User>,
    #[description = "Number of expeditions"] amount: Option<i64>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    if !ensure_manager(ctx, guild_id, &ctx.data().config.xp_manager_roles).await? {
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

    let data = ctx.data();
    let record = find_user_by_discord_id(&data.db, member.id.get())
        .await?
        .filter(|record| record.is_linked());
    let Some(mut record) = record else {
        ctx.say(not_linked_message(member.id.get())).await?;
        return Ok(());
    };

    // Usernames change; the stored name is refreshed from Roblox first.
    let Some(roblox_user) = data.roblox.user_by_id(record.roblox_id).await? else {
        ctx.say("⚠️ Could not find the linked Roblox user. The account may have been deleted.")
            .await?;
        return Ok(());
    };
    if !data.roblox.is_in_group(roblox_user.id).await? {
        ctx.say("❌ The linked user is not in the community group.")
            .await?;
        return Ok(());
    }
    record.roblox_username = roblox_user.name;

    let reply = commit_expeditions(ctx, record, action, amount, Some(member.id.get())).await?;
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
    use mooncrest_leveling::PointsAction;

    use super::expo_reply;

    #[test]
    fn replies_state_the_new_total() {
        assert_eq!(
            expo_reply(PointsAction::Add, 2, "climber", 7, None),
            "✅ Added **2** expeditions to **climber**. They now have **7** expeditions."
        );
        assert!(
            expo_reply(PointsAction::Set, 0, "climber", 0, None)
                .starts_with("✅ Set the expeditions of")
        );
    }

    #[test]
    fn member_replies_name_the_discord_account() {
        assert_eq!(
            expo_reply(PointsAction::Remove, 1, "climber", 0, Some(42)),
            "✅ Removed **1** expeditions from **climber** (linked to <@42>). They now have **0** expeditions."
        );
    }
}
