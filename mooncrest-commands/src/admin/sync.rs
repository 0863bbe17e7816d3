use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use mooncrest_core::{BotConfig, Context, Error};
use mooncrest_database::impls::users::list_linked_users;
use mooncrest_utils::confirmation::confirm_bulk_action;
use mooncrest_utils::permissions::has_user_permission;

use crate::CommandMeta;
use crate::ranks::{RoleSyncOutcome, sync_rank_role};
use crate::replies::{guild_only_message, no_permission_message};

pub const META: CommandMeta = CommandMeta {
    name: "sync",
    desc: "Reconcile the rank role of every linked member with their Lunar Points.",
    category: "admin",
    usage: "!sync",
};

#[derive(Debug, Default, PartialEq, Eq)]
struct SyncReport {
    updated: usize,
    already_correct: usize,
    failed: usize,
    not_found: usize,
}

impl SyncReport {
    fn record(&mut self, outcome: &anyhow::Result<Option<RoleSyncOutcome>>) {
        match outcome {
            Ok(Some(RoleSyncOutcome::Updated { .. })) => self.updated += 1,
            Ok(Some(RoleSyncOutcome::AlreadyCorrect)) => self.already_correct += 1,
            Ok(Some(RoleSyncOutcome::NotInGuild) | None) => self.not_found += 1,
            Err(_) => self.failed += 1,
        }
    }

    fn total(&self) -> usize {
        self.updated + self.already_correct + self.failed + self.not_found
    }

    fn embed(&self, color: u32) -> serenity::CreateEmbed {
        serenity::CreateEmbed::new()
            .title("✅ Bulk Role Sync Complete")
            .color(color)
            .field("Successfully Updated", self.updated.to_string(), true)
            .field("Already Correct", self.already_correct.to_string(), true)
            .field("Failed", self.failed.to_string(), true)
            .field("Not Found", self.not_found.to_string(), true)
            .field("Total Linked Users", self.total().to_string(), true)
            .timestamp(serenity::Timestamp::now())
    }
}

/// Refusal shown before anything is fetched or confirmed.
fn sync_blocked_reason(config: &BotConfig) -> Option<&'static str> {
    config.rank_roles().is_empty().then_some(
        "❌ No rank roles are configured. Add a `role_id` to the levels in the bot config first.",
    )
}

#[poise::command(prefix_command, slash_command, category = "Admin")]
pub async fn sync(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    if !has_user_permission(
        ctx.http(),
        guild_id,
        ctx.author().id,
        serenity::Permissions::ADMINISTRATOR,
    )
    .await?
    {
        ctx.send(
            poise::CreateReply::default()
                .ephemeral(true)
                .content(no_permission_message()),
        )
        .await?;
        return Ok(());
    }

    let data = ctx.data();
    if let Some(reason) = sync_blocked_reason(&data.config) {
        warn!(guild_id = guild_id.get(), "sync requested without rank roles");
        ctx.say(reason).await?;
        return Ok(());
    }

    let users = list_linked_users(&data.db).await?;
    if users.is_empty() {
        ctx.say("⚠️ No linked users to sync.").await?;
        return Ok(());
    }

    let prompt = serenity::CreateEmbed::new()
        .title("Bulk Role Sync")
        .color(data.config.embed_color)
        .description(format!(
            "Reconcile the rank role of **{}** linked users with their Lunar Points?",
            users.len()
        ));
    let Some(confirmation) =
        confirm_bulk_action(ctx, prompt, "🔄 Syncing rank roles, this can take a while...")
            .await?
    else {
        return Ok(());
    };

    let mut report = SyncReport::default();
    for user in &users {
        let outcome = sync_rank_role(
            ctx.http(),
            guild_id,
            user,
            &data.config.levels,
            "Bulk rank role sync",
        )
        .await;
        if let Err(err) = &outcome {
            warn!(?err, roblox_id = user.roblox_id, "rank role sync failed");
        }
        report.record(&outcome);
    }

    info!(
        guild_id = guild_id.get(),
        updated = report.updated,
        already_correct = report.already_correct,
        failed = report.failed,
        not_found = report.not_found,
        "bulk role sync finished"
    );

    confirmation
        .edit_response(
            ctx.http(),
            serenity::EditInteractionResponse::new()
                .content("")
                .embed(report.embed(data.config.embed_color)),
        )
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use mooncrest_core::BotConfig;

    use super::{SyncReport, sync_blocked_reason};
    use crate::ranks::RoleSyncOutcome;

    #[test]
    fn tallies_every_outcome() {
        let mut report = SyncReport::default();
        report.record(&Ok(Some(RoleSyncOutcome::Updated { granted: Some(1) })));
        report.record(&Ok(Some(RoleSyncOutcome::Updated { granted: None })));
        report.record(&Ok(Some(RoleSyncOutcome::AlreadyCorrect)));
        report.record(&Ok(Some(RoleSyncOutcome::NotInGuild)));
        report.record(&Err(anyhow!("missing permissions")));

        assert_eq!(
            report,
            SyncReport {
                updated: 2,
                already_correct: 1,
                failed: 1,
                not_found: 1,
            }
        );
        assert_eq!(report.total(), 5);
    }

    #[test]
    fn refuses_without_rank_roles() {
        let bare = BotConfig::from_json(r#"{"group_id": 1}"#).unwrap();
        assert!(sync_blocked_reason(&bare).is_some());

        let unmapped = BotConfig::from_json(
            r#"{"group_id": 1, "levels": [{ "name": "Scout", "min_points": 0 }]}"#,
        )
        .unwrap();
        assert!(sync_blocked_reason(&unmapped).is_some());

        let mapped = BotConfig::from_json(
            r#"{"group_id": 1, "levels": [{ "name": "Scout", "min_points": 0, "role_id": 5 }]}"#,
        )
        .unwrap();
        assert_eq!(sync_blocked_reason(&mapped), None);
    }
}
