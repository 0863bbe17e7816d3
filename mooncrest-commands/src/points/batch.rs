use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use mooncrest_core::{Context, Error};
use mooncrest_database::impls::users::{find_user_by_discord_id, save_user};
use mooncrest_leveling::PointsAction;
use mooncrest_utils::parse::parse_mention_targets;
use mooncrest_utils::roles::members_with_role;

use crate::CommandMeta;
use crate::access::ensure_manager;
use crate::points::logging::publish_log;
use crate::points::{POINTS_NAME, change_summary, parse_action};
use crate::ranks::{apply_main_points, sync_rank_role, tier_change_message};
use crate::replies::{guild_only_message, negative_amount_message, usage_message};

pub const META: CommandMeta = CommandMeta {
    name: "batch",
    desc: "Apply one Lunar Points action to several members or whole roles.",
    category: "points",
    usage: "!batch <add|remove|set|bonus> \"<@member> <@&role> ...\" <amount> [reason]",
};

/// Skipped names shown before the list is summarised.
const SKIPPED_SHOWN: usize = 15;

#[derive(Debug, Default)]
struct BatchReport {
    processed: usize,
    skipped: Vec<String>,
    level_ups: Vec<String>,
}

impl BatchReport {
    fn skip(&mut self, user_id: serenity::UserId, why: &str) {
        self.skipped.push(format!("<@{}> ({why})", user_id.get()));
    }

    fn skipped_field(&self) -> String {
        if self.skipped.is_empty() {
            return "0".to_owned();
        }

        let mut out = format!("{}\n", self.skipped.len());
        out.push_str(
            &self
                .skipped
                .iter()
                .take(SKIPPED_SHOWN)
                .cloned()
                .collect::<Vec<_>>()
                .join("\n"),
        );
        if self.skipped.len() > SKIPPED_SHOWN {
            out.push_str(&format!("\n…and {} more", self.skipped.len() - SKIPPED_SHOWN));
        }
        out
    }

    fn embed(
        &self,
        color: u32,
        action: PointsAction,
        amount: i64,
        reason: Option<&str>,
    ) -> serenity::CreateEmbed {
        let mut embed = serenity::CreateEmbed::new()
            .title(format!("✅ Batch {} Complete", action.display_name()))
            .color(color)
            .field("Successfully Processed", self.processed.to_string(), true)
            .field("Skipped", self.skipped_field(), true)
            .field("Amount", format!("{amount} {POINTS_NAME}"), true)
            .field("Changes (Each)", change_summary(action, amount), false)
            .timestamp(serenity::Timestamp::now());

        if let Some(reason) = reason {
            embed = embed.field("Reason", reason, false);
        }

        if !self.level_ups.is_empty() {
            embed = embed.description(truncate_lines(&self.level_ups, 4000));
        }

        embed
    }
}

/// Join lines, dropping whole lines once `limit` bytes would be exceeded.
fn truncate_lines(lines: &[String], limit: usize) -> String {
    let mut out = String::new();
    for (shown, line) in lines.iter().enumerate() {
        if out.len() + line.len() + 1 > limit {
            out.push_str(&format!("…and {} more", lines.len() - shown));
            break;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line.trim());
    }
    out
}

/// Direct mentions first, then members of every mentioned role.
async fn collect_targets(
    ctx: Context<'_>,
    guild_id: serenity::GuildId,
    raw: &str,
) -> Result<Vec<serenity::UserId>, Error> {
    let targets = parse_mention_targets(raw);
    let mut out: Vec<serenity::UserId> =
        targets.users.iter().copied().map(serenity::UserId::new).collect();

    for role_id in targets.roles {
        let members = members_with_role(ctx.http(), guild_id, serenity::RoleId::new(role_id)).await?;
        for user_id in members {
            if !out.contains(&user_id) {
                out.push(user_id);
            }
        }
    }

    Ok(out)
}

#[poise::command(prefix_command, slash_command, category = "Points")]
pub async fn batch(
    ctx: Context<'_>,
    #[description = "add, remove, set or bonus"] action: Option<String>,
    #[description = "Member and role mentions"] targets: Option<String>,
    #[description = "Lunar Points amount for each member"] amount: Option<i64>,
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

    let (Some(action), Some(targets), Some(amount)) =
        (parse_action(action.as_deref()), targets, amount)
    else {
        ctx.say(usage_message(META.usage)).await?;
        return Ok(());
    };

    if amount < 0 {
        ctx.say(negative_amount_message()).await?;
        return Ok(());
    }

    if parse_mention_targets(&targets).is_empty() {
        ctx.say("❌ Mention at least one member or role.").await?;
        return Ok(());
    }

    ctx.defer().await?;

    let data = ctx.data();
    let reason = reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
    let user_ids = collect_targets(ctx, guild_id, &targets).await?;
    let mut report = BatchReport::default();

    for user_id in user_ids {
        if guild_id.member(ctx.http(), user_id).await.is_err() {
            report.skip(user_id, "not in server");
            continue;
        }

        let record = match find_user_by_discord_id(&data.db, user_id.get()).await {
            Ok(Some(record)) if record.is_linked() => record,
            Ok(_) => {
                report.skip(user_id, "not verified");
                continue;
            }
            Err(err) => {
                warn!(?err, user_id = user_id.get(), "batch lookup failed");
                report.skip(user_id, "lookup failed");
                continue;
            }
        };

        let mut record = record;
        let change = match apply_main_points(&mut record, &data.config.levels, action, amount) {
            Ok(change) => change,
            Err(err) => {
                warn!(?err, user_id = user_id.get(), "batch mutation rejected");
                report.skip(user_id, "invalid amount");
                continue;
            }
        };

        if let Err(err) = save_user(&data.db, &record).await {
            warn!(?err, user_id = user_id.get(), "batch save failed");
            report.skip(user_id, "save failed");
            continue;
        }

        report.processed += 1;

        if change.is_changed() {
            let mut line = tier_change_message(&record.roblox_username, &change);
            match sync_rank_role(
                ctx.http(),
                guild_id,
                &record,
                &data.config.levels,
                "Lunar Points tier changed",
            )
            .await
            {
                Ok(Some(outcome)) => line.push_str(&format!(" {}", outcome.note())),
                Ok(None) => {}
                Err(err) => {
                    warn!(?err, user_id = user_id.get(), "batch role sync failed");
                    line.push_str(" (Role update failed)");
                }
            }
            report.level_ups.push(line);
        }
    }

    info!(
        guild_id = guild_id.get(),
        action = action.as_str(),
        amount,
        processed = report.processed,
        skipped = report.skipped.len(),
        "batch points applied"
    );

    let embed = report.embed(data.config.embed_color, action, amount, reason);
    publish_log(
        ctx.http(),
        data.config.xp_log_channel_id,
        embed
            .clone()
            .field("By", format!("<@{}>", ctx.author().id.get()), true),
    )
    .await;
    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude as serenity;

    use super::{BatchReport, SKIPPED_SHOWN, truncate_lines};

    #[test]
    fn skipped_list_is_summarised() {
        let mut report = BatchReport::default();
        assert_eq!(report.skipped_field(), "0");

        for id in 1..=(SKIPPED_SHOWN as u64 + 2) {
            report.skip(serenity::UserId::new(id), "not verified");
        }
        let field = report.skipped_field();

        assert!(field.starts_with(&format!("{}\n<@1> (not verified)", SKIPPED_SHOWN + 2)));
        assert!(field.ends_with("…and 2 more"));
    }

    #[test]
    fn level_up_lines_are_bounded() {
        let lines: Vec<String> = (0..10).map(|i| format!(" 🎉 **user{i}**")).collect();

        assert_eq!(truncate_lines(&lines[..2], 4000), "🎉 **user0**\n🎉 **user1**");

        let short = truncate_lines(&lines, 40);
        assert!(short.len() <= 40 + "…and 10 more".len());
        assert!(short.contains("…and"));
    }
}
