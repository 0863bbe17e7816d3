use poise::serenity_prelude as serenity;
use tracing::warn;

use mooncrest_core::{Context, Error};
use mooncrest_database::impls::users::{find_user_by_discord_id, save_user};
use mooncrest_leveling::{PointsAction, TierChange, resolve_level};

use crate::CommandMeta;
use crate::access::ensure_manager;
use crate::points::logging::{LadderLog, publish_log};
use crate::points::parse_ladder_action;
use crate::ranks::{apply_department_points, sync_ladder_role, tier_change_message};
use crate::replies::{
    escape_markdown, guild_only_message, negative_amount_message, not_linked_message,
    usage_message,
};

pub const GUIDE_META: CommandMeta = CommandMeta {
    name: "guide",
    desc: "Add, remove or set guide department points for a linked member.",
    category: "points",
    usage: "!guide <add|remove|set> <member> <amount>",
};

pub const SAR_META: CommandMeta = CommandMeta {
    name: "sar",
    desc: "Add, remove or set search-and-rescue department points for a linked member.",
    category: "points",
    usage: "!sar <add|remove|set> <member> <amount>",
};

fn department_reply(
    action: PointsAction,
    amount: i64,
    label: &str,
    name: &str,
    change: &TierChange,
) -> String {
    format!(
        "✅ Successfully performed '{action}' action with {amount} {label} Points for **{name}**.{}",
        tier_change_message(name, change)
    )
}

#[poise::command(prefix_command, slash_command, category = "Points")]
pub async fn guide(
    ctx: Context<'_>,
    #[description = "add, remove or set"] action: Option<String>,
    #[description = "Linked member"] member: Option<serenity::User>,
    #[description = "Guide points amount"] amount: Option<i64>,
) -> Result<(), Error> {
    run_department(ctx, &GUIDE_META, action, member, amount).await
}

#[poise::command(prefix_command, slash_command, category = "Points")]
pub async fn sar(
    ctx: Context<'_>,
    #[description = "add, remove or set"] action: Option<String>,
    #[description = "Linked member"] member: Option<serenity::User>,
    #[description = "SAR points amount"] amount: Option<i64>,
) -> Result<(), Error> {
    run_department(ctx, &SAR_META, action, member, amount).await
}

/// Shared body of the department ladder commands; the department key is the
/// command name.
async fn run_department(
    ctx: Context<'_>,
    meta: &CommandMeta,
    action: Option<String>,
    member: Option<serenity::User>,
    amount: Option<i64>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    let data = ctx.data();
    let key = meta.name;
    let Some(department) = data.config.department(key) else {
        ctx.say(format!("❌ The `{key}` department is not configured."))
            .await?;
        return Ok(());
    };

    if !ensure_manager(ctx, guild_id, &department.manager_roles).await? {
        return Ok(());
    }

    let (Some(action), Some(member), Some(amount)) =
        (parse_ladder_action(action.as_deref()), member, amount)
    else {
        ctx.say(usage_message(meta.usage)).await?;
        return Ok(());
    };

    if amount < 0 {
        ctx.say(negative_amount_message()).await?;
        return Ok(());
    }

    ctx.defer().await?;

    let record = find_user_by_discord_id(&data.db, member.id.get())
        .await?
        .filter(|record| record.is_linked());
    let Some(mut record) = record else {
        ctx.say(not_linked_message(member.id.get())).await?;
        return Ok(());
    };

    let old_value = record.department_points(key);
    let change = apply_department_points(&mut record, key, &department.levels, action, amount)?;
    save_user(&data.db, &record).await?;

    let new_value = record.department_points(key);
    let name = escape_markdown(&record.roblox_username);
    let mut reply = department_reply(action, amount, &department.label, &name, &change);

    if change.is_changed() {
        let resolved = resolve_level(new_value, &department.levels);
        match sync_ladder_role(
            ctx.http(),
            guild_id,
            member.id,
            &department.role_mapping(),
            &resolved,
            "Department tier changed",
        )
        .await
        {
            Ok(outcome) => reply.push_str(&format!(" {}", outcome.note())),
            Err(err) => {
                warn!(?err, user_id = member.id.get(), department = key, "department role sync failed");
                reply.push_str("\n⚠️ Could not update their department role.");
            }
        }
    }

    ctx.say(reply).await?;

    let log = LadderLog {
        title: format!("🧭 {} Points Log", department.label),
        action,
        amount,
        target: format!("{name} (<@{}>)", member.id.get()),
        old_value,
        new_value,
    };
    publish_log(
        ctx.http(),
        data.config.xp_log_channel_id,
        log.embed(data.config.embed_color, ctx.author().id),
    )
    .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use mooncrest_leveling::{PointsAction, TierChange};

    use super::{GUIDE_META, SAR_META, department_reply};

    #[test]
    fn department_keys_are_the_command_names() {
        assert_eq!(GUIDE_META.name, "guide");
        assert_eq!(SAR_META.name, "sar");
    }

    #[test]
    fn reply_names_the_department() {
        let reply = department_reply(
            PointsAction::Set,
            40,
            "Guide",
            "climber",
            &TierChange::Promoted {
                from: "Trainee".to_owned(),
                to: "Guide I".to_owned(),
            },
        );
        assert_eq!(
            reply,
            "✅ Successfully performed 'set' action with 40 Guide Points for **climber**. 🎉 **climber has leveled up to Guide I!**"
        );
    }
}
