use poise::serenity_prelude as serenity;
use tracing::info;

use mooncrest_core::{Context, Error};
use mooncrest_database::impls::users::{find_user_by_discord_id, save_user};

use crate::CommandMeta;
use crate::access::ensure_manager;
use crate::linking::remove_verification;
use crate::replies::{escape_markdown, guild_only_message};

pub const META: CommandMeta = CommandMeta {
    name: "unverify",
    desc: "Unlink your Roblox account, or a member's when you manage points.",
    category: "linking",
    usage: "!unverify [member]",
};

#[poise::command(prefix_command, slash_command, category = "Linking")]
pub async fn unverify(
    ctx: Context<'_>,
    #[description = "Member to unlink (managers only)"] member: Option<serenity::User>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    let data = ctx.data();
    let author_id = ctx.author().id;
    let target_id = member.as_ref().map_or(author_id, |user| user.id);

    if target_id != author_id
        && !ensure_manager(ctx, guild_id, &data.config.xp_manager_roles).await?
    {
        return Ok(());
    }

    let record = find_user_by_discord_id(&data.db, target_id.get())
        .await?
        .filter(|record| record.is_linked());
    let Some(mut record) = record else {
        let who = if target_id == author_id {
            "Your account is".to_owned()
        } else {
            format!("<@{}> is", target_id.get())
        };
        ctx.send(
            poise::CreateReply::default()
                .ephemeral(true)
                .content(format!("❌ {who} not linked to a Roblox account.")),
        )
        .await?;
        return Ok(());
    };

    record.unlink_discord();
    save_user(&data.db, &record).await?;

    remove_verification(ctx.http(), guild_id, target_id, data.config.verified_role_id).await;

    info!(
        user_id = target_id.get(),
        roblox_id = record.roblox_id,
        by = author_id.get(),
        "unlinked roblox account"
    );

    ctx.send(
        poise::CreateReply::default().ephemeral(true).content(format!(
            "✅ Unlinked <@{}> from the Roblox user **{}**.",
            target_id.get(),
            escape_markdown(&record.roblox_username)
        )),
    )
    .await?;

    Ok(())
}
