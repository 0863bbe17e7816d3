use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use mooncrest_core::{Context, Error};
use mooncrest_database::impls::users::{find_user, find_user_by_discord_id, save_user};
use mooncrest_database::model::users::UserRecord;
use mooncrest_roblox::group_url;
use mooncrest_utils::embed::error_embed;

use crate::CommandMeta;
use crate::linking::{NICKNAME_WARNING, apply_verification};
use crate::ranks::{RoleSyncOutcome, sync_rank_role};
use crate::replies::{escape_markdown, guild_only_message, usage_message};

pub const META: CommandMeta = CommandMeta {
    name: "verify",
    desc: "Link your Discord account to your Roblox account.",
    category: "linking",
    usage: "!verify <roblox username>",
};

fn ephemeral(content: impl Into<String>) -> poise::CreateReply {
    poise::CreateReply::default().ephemeral(true).content(content)
}

#[poise::command(prefix_command, slash_command, category = "Linking")]
pub async fn verify(
    ctx: Context<'_>,
    #[description = "Your Roblox username"] username: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    let Some(username) = username
        .as_deref()
        .map(|raw| raw.trim().trim_start_matches('@'))
        .filter(|raw| !raw.is_empty())
        .map(str::to_owned)
    else {
        ctx.say(usage_message(META.usage)).await?;
        return Ok(());
    };

    let data = ctx.data();
    let author_id = ctx.author().id;

    let previous = find_user_by_discord_id(&data.db, author_id.get()).await?;
    if let Some(linked) = previous.as_ref().filter(|record| record.is_linked()) {
        ctx.send(ephemeral(format!(
            "✅ Your account is already linked to the Roblox user **{}**.",
            escape_markdown(&linked.roblox_username)
        )))
        .await?;
        return Ok(());
    }

    ctx.defer_ephemeral().await?;

    let Some(roblox_user) = data.roblox.user_by_username(&username).await? else {
        ctx.send(ephemeral(
            "⚠️ Roblox user not found. Please check the spelling and try again.",
        ))
        .await?;
        return Ok(());
    };

    let existing = find_user(&data.db, roblox_user.id).await?;
    if existing
        .as_ref()
        .and_then(|record| record.discord_id)
        .is_some_and(|discord_id| discord_id != author_id.get())
    {
        ctx.send(ephemeral(
            "❌ This Roblox account is already linked to another Discord user.",
        ))
        .await?;
        return Ok(());
    }

    if !data.roblox.is_in_group(roblox_user.id).await? {
        let embed = error_embed(
            "❌ Verification Failed: Group Membership Required",
            "To verify, you must be a member of our Roblox group.\n\n**Please join the group and try again.**",
        )
        .field(
            "Group Link",
            format!("[Click here to join]({})", group_url(data.config.group_id)),
            false,
        );
        ctx.send(poise::CreateReply::default().ephemeral(true).embed(embed))
            .await?;
        return Ok(());
    }

    let outcome = apply_verification(
        ctx.http(),
        guild_id,
        author_id,
        &roblox_user,
        data.config.verified_role_id,
    )
    .await?;

    // A stale, unverified claim on another account is released.
    if let Some(mut stale) = previous.filter(|record| record.roblox_id != roblox_user.id) {
        stale.unlink_discord();
        save_user(&data.db, &stale).await?;
    }

    let mut record =
        existing.unwrap_or_else(|| UserRecord::new(roblox_user.id, roblox_user.name.clone()));
    record.roblox_username = roblox_user.name.clone();
    record.link_discord(author_id.get());
    save_user(&data.db, &record).await?;

    info!(
        user_id = author_id.get(),
        roblox_id = roblox_user.id,
        "linked roblox account"
    );

    let mut reply = format!(
        "🎉 **Verification Complete!** Your account has been linked to **{}**.",
        escape_markdown(&roblox_user.nickname())
    );
    if outcome.nickname_applied {
        reply.push_str(&format!(
            " Your nickname has been set to `{}`.",
            outcome.nickname
        ));
    } else {
        reply.push_str(&format!("\n\n{NICKNAME_WARNING}"));
    }

    match sync_rank_role(
        ctx.http(),
        guild_id,
        &record,
        &data.config.levels,
        "Verified rank role",
    )
    .await
    {
        Ok(Some(RoleSyncOutcome::Updated {
            granted: Some(role_id),
        })) => reply.push_str(&format!(
            "\n👑 Your rank role <@&{role_id}> has been applied!"
        )),
        Ok(_) => {}
        Err(err) => warn!(?err, user_id = author_id.get(), "rank role sync after verify failed"),
    }

    ctx.send(ephemeral(reply).allowed_mentions(serenity::CreateAllowedMentions::new()))
        .await?;

    Ok(())
}
