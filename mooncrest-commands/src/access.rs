use poise::serenity_prelude as serenity;

use mooncrest_core::{Context, Error};
use mooncrest_utils::permissions::has_manager_access;

use crate::replies::no_permission_message;

/// Check administrator-or-manager access and tell the caller when it fails.
pub async fn ensure_manager(
    ctx: Context<'_>,
    guild_id: serenity::GuildId,
    manager_roles: &[u64],
) -> Result<bool, Error> {
    if has_manager_access(ctx.http(), guild_id, ctx.author().id, manager_roles).await? {
        return Ok(true);
    }

    ctx.send(
        poise::CreateReply::default()
            .ephemeral(true)
            .content(no_permission_message()),
    )
    .await?;
    Ok(false)
}
