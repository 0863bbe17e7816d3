use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use mooncrest_core::{Context, Error};
use mooncrest_database::impls::users::{
    find_user, find_user_by_discord_id, find_user_by_username, save_user,
};
use mooncrest_database::model::users::UserRecord;
use mooncrest_roblox::{group_url, profile_url};
use mooncrest_utils::parse::{ProfileTarget, parse_profile_target};

use crate::CommandMeta;
use crate::access::ensure_manager;
use crate::linking::{NICKNAME_WARNING, apply_verification, remove_verification};
use crate::points::logging::publish_log;
use crate::ranks::sync_rank_role;
use crate::replies::{
    escape_markdown, guild_only_message, roblox_user_not_found_message, usage_message,
};

pub const META: CommandMeta = CommandMeta {
    name: "link",
    desc: "Manage verification links by hand: link a member, look one up or remove one.",
    category: "linking",
    usage: "!link <member <member> <roblox username> | status <member or username> | remove <member>>",
};

const MEMBER_USAGE: &str = "!link member <member> <roblox username>";
const STATUS_USAGE: &str = "!link status <member or roblox username>";
const REMOVE_USAGE: &str = "!link remove <member>";

fn ephemeral(content: impl Into<String>) -> poise::CreateReply {
    poise::CreateReply::default()
        .ephemeral(true)
        .content(content)
        .allowed_mentions(serenity::CreateAllowedMentions::new())
}

/// Why a manual link between `discord_id` and a Roblox account cannot go
/// ahead, given the current link of each side.
fn manual_link_conflict(
    discord_id: u64,
    linked_discord: Option<&UserRecord>,
    roblox_record: Option<&UserRecord>,
) -> Option<String> {
    if let Some(linked) = linked_discord {
        return Some(format!(
            "❌ This Discord account is already linked to **{}**.",
            escape_markdown(&linked.roblox_username)
        ));
    }

    roblox_record
        .filter(|record| record.is_linked())
        .and_then(|record| record.discord_id)
        .filter(|owner| *owner != discord_id)
        .map(|owner| {
            format!("❌ This Roblox account is already linked to another Discord user (<@{owner}>).")
        })
}

fn status_embed(record: &UserRecord, color: u32) -> serenity::CreateEmbed {
    let discord = record
        .discord_id
        .map_or_else(|| "Unknown".to_owned(), |id| format!("<@{id}>"));

    serenity::CreateEmbed::new()
        .title("🔗 Verification Status")
        .color(color)
        .field("Discord Account", discord, true)
        .field(
            "Roblox Account",
            format!(
                "[{}]({})",
                escape_markdown(&record.roblox_username),
                profile_url(record.roblox_id)
            ),
            true,
        )
        .field("Status", "✅ Linked", true)
        .timestamp(serenity::Timestamp::now())
}

fn link_log_embed(
    title: &str,
    color: u32,
    discord_id: u64,
    record: &UserRecord,
    moderator: serenity::UserId,
) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title)
        .color(color)
        .field("Discord User", format!("<@{discord_id}>"), true)
        .field(
            "Roblox User",
            format!("{} ({})", escape_markdown(&record.roblox_username), record.roblox_id),
            true,
        )
        .field("Admin/Mod", format!("<@{}>", moderator.get()), true)
        .timestamp(serenity::Timestamp::now())
}

/// Manual verification links.
#[poise::command(
    prefix_command,
    slash_command,
    category = "Linking",
    subcommands("member", "status", "remove")
)]
pub async fn link(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say(usage_message(META.usage)).await?;
    Ok(())
}

/// Link a Discord member to a Roblox account on their behalf.
#[poise::command(prefix_command, slash_command, category = "Linking")]
pub async fn member(
    ctx: Context<'_>,
    #[description = "Discord member to link"] member: Option<serenity::User>,
    #[description = "Roblox username"] username: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    let data = ctx.data();
    if !ensure_manager(ctx, guild_id, &data.config.link_manager_roles).await? {
        return Ok(());
    }

    let username = username
        .as_deref()
        .map(|raw| raw.trim().trim_start_matches('@'))
        .filter(|raw| !raw.is_empty())
        .map(str::to_owned);
    let (Some(member), Some(username)) = (member, username) else {
        ctx.say(usage_message(MEMBER_USAGE)).await?;
        return Ok(());
    };

    ctx.defer_ephemeral().await?;

    let Some(roblox_user) = data.roblox.user_by_username(&username).await? else {
        ctx.send(ephemeral(roblox_user_not_found_message(&username)))
            .await?;
        return Ok(());
    };

    let previous = find_user_by_discord_id(&data.db, member.id.get()).await?;
    let existing = find_user(&data.db, roblox_user.id).await?;
    if let Some(conflict) = manual_link_conflict(
        member.id.get(),
        previous.as_ref().filter(|record| record.is_linked()),
        existing.as_ref(),
    ) {
        ctx.send(ephemeral(conflict)).await?;
        return Ok(());
    }

    if !data.roblox.is_in_group(roblox_user.id).await? {
        ctx.send(ephemeral(format!(
            "❌ **Manual Link Failed:** The user **{}** is not in the Roblox group. Ask them to join first: {}",
            escape_markdown(&roblox_user.name),
            group_url(data.config.group_id)
        )))
        .await?;
        return Ok(());
    }

    let outcome = apply_verification(
        ctx.http(),
        guild_id,
        member.id,
        &roblox_user,
        data.config.verified_role_id,
    )
    .await?;

    if let Some(mut stale) = previous.filter(|record| record.roblox_id != roblox_user.id) {
        stale.unlink_discord();
        save_user(&data.db, &stale).await?;
    }

    let mut record =
        existing.unwrap_or_else(|| UserRecord::new(roblox_user.id, roblox_user.name.clone()));
    record.roblox_username = roblox_user.name.clone();
    record.link_discord(member.id.get());
    save_user(&data.db, &record).await?;

    info!(
        user_id = member.id.get(),
        roblox_id = record.roblox_id,
        by = ctx.author().id.get(),
        "manually linked roblox account"
    );

    if let Err(err) = sync_rank_role(
        ctx.http(),
        guild_id,
        &record,
        &data.config.levels,
        "Manually verified rank role",
    )
    .await
    {
        warn!(?err, user_id = member.id.get(), "rank role sync after manual link failed");
    }

    let mut reply = format!(
        "✅ Successfully linked <@{}> to **{}**.",
        member.id.get(),
        escape_markdown(&record.roblox_username)
    );
    if !outcome.nickname_applied {
        reply.push_str(&format!("\n\n{NICKNAME_WARNING}"));
    }
    ctx.send(ephemeral(reply)).await?;

    publish_log(
        ctx.http(),
        data.config.verification_log_channel_id,
        link_log_embed(
            "✅ Manual Verification Log",
            data.config.embed_color,
            member.id.get(),
            &record,
            ctx.author().id,
        ),
    )
    .await;

    Ok(())
}

/// Show who a member or Roblox username is linked to.
#[poise::command(prefix_command, slash_command, category = "Linking")]
pub async fn status(
    ctx: Context<'_>,
    #[description = "Discord member or Roblox username"]
    #[rest]
    identifier: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    let data = ctx.data();
    if !ensure_manager(ctx, guild_id, &data.config.link_manager_roles).await? {
        return Ok(());
    }

    let Some(target) = identifier.as_deref().and_then(parse_profile_target) else {
        ctx.say(usage_message(STATUS_USAGE)).await?;
        return Ok(());
    };

    let (record, shown) = match &target {
        ProfileTarget::Discord(user_id) => (
            find_user_by_discord_id(&data.db, *user_id).await?,
            format!("<@{user_id}>"),
        ),
        ProfileTarget::Roblox(name) => (
            find_user_by_username(&data.db, name).await?,
            escape_markdown(name),
        ),
    };

    let Some(record) = record.filter(|record| record.is_linked()) else {
        ctx.send(ephemeral(format!(
            "ℹ️ No active verification link found for **{shown}**."
        )))
        .await?;
        return Ok(());
    };

    ctx.send(
        poise::CreateReply::default()
            .ephemeral(true)
            .embed(status_embed(&record, data.config.embed_color)),
    )
    .await?;

    Ok(())
}

/// Remove a member's verification link.
#[poise::command(prefix_command, slash_command, category = "Linking")]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Discord member to unlink"] member: Option<serenity::User>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    let data = ctx.data();
    if !ensure_manager(ctx, guild_id, &data.config.link_manager_roles).await? {
        return Ok(());
    }

    let Some(member) = member else {
        ctx.say(usage_message(REMOVE_USAGE)).await?;
        return Ok(());
    };

    let record = find_user_by_discord_id(&data.db, member.id.get())
        .await?
        .filter(|record| record.is_linked());
    let Some(mut record) = record else {
        ctx.send(ephemeral(format!(
            "⚠️ <@{}> is not linked to any Roblox account.",
            member.id.get()
        )))
        .await?;
        return Ok(());
    };

    record.unlink_discord();
    save_user(&data.db, &record).await?;
    remove_verification(ctx.http(), guild_id, member.id, data.config.verified_role_id).await;

    info!(
        user_id = member.id.get(),
        roblox_id = record.roblox_id,
        by = ctx.author().id.get(),
        "manually unlinked roblox account"
    );

    publish_log(
        ctx.http(),
        data.config.verification_log_channel_id,
        link_log_embed(
            "🗑️ Unlink Log",
            data.config.embed_color,
            member.id.get(),
            &record,
            ctx.author().id,
        ),
    )
    .await;

    ctx.send(ephemeral(format!(
        "✅ Successfully unlinked <@{}> from **{}**.",
        member.id.get(),
        escape_markdown(&record.roblox_username)
    )))
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use mooncrest_database::model::users::UserRecord;

    use super::manual_link_conflict;

    fn linked(roblox_id: u64, name: &str, discord_id: u64) -> UserRecord {
        let mut record = UserRecord::new(roblox_id, name);
        record.link_discord(discord_id);
        record
    }

    #[test]
    fn a_linked_discord_account_blocks_a_new_link() {
        let current = linked(1, "old_climber", 10);
        assert_eq!(
            manual_link_conflict(10, Some(&current), None).as_deref(),
            Some("❌ This Discord account is already linked to **old\\_climber**.")
        );
    }

    #[test]
    fn roblox_accounts_owned_by_someone_else_are_refused() {
        let owned = linked(2, "climber", 20);
        assert_eq!(
            manual_link_conflict(10, None, Some(&owned)).as_deref(),
            Some("❌ This Roblox account is already linked to another Discord user (<@20>).")
        );
    }

    #[test]
    fn unlinked_or_own_records_are_free() {
        let mut released = linked(2, "climber", 20);
        released.unlink_discord();
        assert_eq!(manual_link_conflict(10, None, Some(&released)), None);
        assert_eq!(manual_link_conflict(20, None, Some(&linked(2, "climber", 20))), None);
        assert_eq!(manual_link_conflict(10, None, None), None);
    }
}
