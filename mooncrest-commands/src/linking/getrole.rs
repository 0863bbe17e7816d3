use poise::serenity_prelude as serenity;
use tracing::info;

use mooncrest_core::{Context, Error};
use mooncrest_database::impls::users::find_user_by_discord_id;
use mooncrest_leveling::TierRoleMapping;
use mooncrest_utils::permissions::has_user_permission;

use crate::CommandMeta;
use crate::ranks::{RoleSyncOutcome, sync_mapped_role};
use crate::replies::{escape_markdown, guild_only_message};

pub const META: CommandMeta = CommandMeta {
    name: "getrole",
    desc: "Give yourself, or a member, the Discord role for their Roblox group rank.",
    category: "linking",
    usage: "!getrole [member]",
};

/// Roblox's placeholder rank for accounts outside the group.
const GUEST_RANK: &str = "Guest";

#[derive(Debug, PartialEq, Eq)]
enum GroupRolePlan {
    NoRank,
    Unmapped(String),
    Grant { rank: String, role_id: u64 },
}

fn plan_group_role(rank_name: Option<&str>, mapping: &TierRoleMapping) -> GroupRolePlan {
    let Some(rank) = rank_name.filter(|rank| *rank != GUEST_RANK) else {
        return GroupRolePlan::NoRank;
    };

    match mapping.role_for_tier(rank) {
        Some(role_id) => GroupRolePlan::Grant {
            rank: rank.to_owned(),
            role_id,
        },
        None => GroupRolePlan::Unmapped(rank.to_owned()),
    }
}

/// Second-person wording for the caller, mentions for anyone else.
#[derive(Clone, Copy)]
struct Subject {
    user_id: u64,
    is_self: bool,
}

impl Subject {
    fn not_verified(self) -> String {
        if self.is_self {
            "❌ You are not verified yet. Use `/verify` first.".to_owned()
        } else {
            format!(
                "❌ <@{}> is not verified yet. They need to use `/verify` first.",
                self.user_id
            )
        }
    }

    fn no_rank(self) -> String {
        if self.is_self {
            "❌ Could not retrieve your rank, or you are not in the Roblox group.".to_owned()
        } else {
            format!(
                "❌ Could not retrieve the rank for <@{}>, or they are not in the Roblox group.",
                self.user_id
            )
        }
    }

    fn unmapped(self, rank: &str) -> String {
        let owner = if self.is_self { "Your" } else { "Their" };
        format!(
            "ℹ️ {owner} Roblox rank is **{}**, but there is no corresponding Discord role configured for it.",
            escape_markdown(rank)
        )
    }

    fn already_has(self, role_id: u64) -> String {
        if self.is_self {
            format!("✅ You already have the <@&{role_id}> role for your rank.")
        } else {
            format!(
                "✅ <@{}> already has the <@&{role_id}> role for their rank.",
                self.user_id
            )
        }
    }
}

fn ephemeral(content: impl Into<String>) -> poise::CreateReply {
    poise::CreateReply::default()
        .ephemeral(true)
        .content(content)
        .allowed_mentions(serenity::CreateAllowedMentions::new())
}

#[poise::command(prefix_command, slash_command, category = "Linking")]
pub async fn getrole(
    ctx: Context<'_>,
    #[description = "Member to sync (administrators only)"] member: Option<serenity::User>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    let author_id = ctx.author().id;
    let target_id = member.as_ref().map_or(author_id, |user| user.id);
    let subject = Subject {
        user_id: target_id.get(),
        is_self: target_id == author_id,
    };

    if !subject.is_self
        && !has_user_permission(
            ctx.http(),
            guild_id,
            author_id,
            serenity::Permissions::ADMINISTRATOR,
        )
        .await?
    {
        ctx.send(ephemeral(
            "❌ You must be an administrator to sync roles for other users.",
        ))
        .await?;
        return Ok(());
    }

    ctx.defer_ephemeral().await?;

    let data = ctx.data();
    let record = find_user_by_discord_id(&data.db, target_id.get())
        .await?
        .filter(|record| record.is_linked());
    let Some(record) = record else {
        ctx.send(ephemeral(subject.not_verified())).await?;
        return Ok(());
    };

    let membership = data.roblox.group_membership(record.roblox_id).await?;
    let mapping = data.config.group_rank_roles();
    let (rank, role_id) = match plan_group_role(
        membership.as_ref().map(|membership| membership.role_name.as_str()),
        &mapping,
    ) {
        GroupRolePlan::NoRank => {
            ctx.send(ephemeral(subject.no_rank())).await?;
            return Ok(());
        }
        GroupRolePlan::Unmapped(rank) => {
            ctx.send(ephemeral(subject.unmapped(&rank))).await?;
            return Ok(());
        }
        GroupRolePlan::Grant { rank, role_id } => (rank, role_id),
    };

    let outcome = sync_mapped_role(
        ctx.http(),
        guild_id,
        target_id,
        &mapping,
        Some(role_id),
        "Roblox group rank sync",
    )
    .await?;

    match outcome {
        RoleSyncOutcome::NotInGuild => {
            ctx.send(ephemeral(format!(
                "❌ <@{}> is not in this server.",
                target_id.get()
            )))
            .await?;
        }
        RoleSyncOutcome::AlreadyCorrect => {
            ctx.send(ephemeral(subject.already_has(role_id))).await?;
        }
        RoleSyncOutcome::Updated { .. } => {
            info!(
                user_id = target_id.get(),
                roblox_id = record.roblox_id,
                role_id,
                by = author_id.get(),
                "synced group rank role"
            );

            let embed = serenity::CreateEmbed::new()
                .title("✅ Role Synchronized!")
                .color(data.config.embed_color)
                .description(format!("Updated the group rank role for <@{}>.", target_id.get()))
                .field("Roblox Rank", escape_markdown(&rank), true)
                .field("Discord Role", format!("<@&{role_id}>"), true)
                .timestamp(serenity::Timestamp::now());
            ctx.send(
                poise::CreateReply::default()
                    .ephemeral(true)
                    .embed(embed)
                    .allowed_mentions(serenity::CreateAllowedMentions::new()),
            )
            .await?;
        }
    }

    Ok(())
}
