pub mod batch;
pub mod department;
pub mod expo;
pub mod logging;
pub mod summit;
pub mod xp;
pub mod xpd;

use poise::serenity_prelude as serenity;
use tracing::warn;

use mooncrest_core::{Context, Error};
use mooncrest_database::impls::users::save_user;
use mooncrest_database::model::users::UserRecord;
use mooncrest_leveling::{PointsAction, TierChange};

use crate::points::logging::{main_points_log_embed, publish_log};
use crate::ranks::{apply_main_points, sync_rank_role, tier_change_message};

pub const POINTS_NAME: &str = "Lunar Points";

pub(crate) fn parse_action(raw: Option<&str>) -> Option<PointsAction> {
    raw?.parse::<PointsAction>().ok()
}

/// Department ladders and the expedition counter have no bonus action.
pub(crate) fn parse_ladder_action(raw: Option<&str>) -> Option<PointsAction> {
    parse_action(raw).filter(|action| *action != PointsAction::Bonus)
}

/// Per-user effect of an action, e.g. `+50 Lunar Points, +1 Expedition`.
pub(crate) fn change_summary(action: PointsAction, amount: i64) -> String {
    match action {
        PointsAction::Add => format!("+{amount} {POINTS_NAME}, +1 Expedition"),
        PointsAction::Remove => format!("-{amount} {POINTS_NAME}, -1 Expedition"),
        PointsAction::Set => format!("{POINTS_NAME} set to {amount}"),
        PointsAction::Bonus => format!("+{amount} Bonus {POINTS_NAME}"),
    }
}

pub(crate) fn points_reply(
    action: PointsAction,
    amount: i64,
    name: &str,
    change: &TierChange,
    reason: Option<&str>,
) -> String {
    let level_message = tier_change_message(name, change);

    match action {
        PointsAction::Bonus => {
            let mut reply =
                format!("✅ Gave **{amount}** bonus {POINTS_NAME} to **{name}**.{level_message}");
            if let Some(reason) = reason {
                reply.push_str(&format!("\n*Reason: {reason}*"));
            }
            reply
        }
        _ => format!(
            "✅ Successfully performed '{action}' action with {amount} {POINTS_NAME} for **{name}**.{level_message}"
        ),
    }
}

/// Apply, persist, re-role and log one main-ladder change. Returns the reply.
pub(crate) async fn commit_main_points(
    ctx: Context<'_>,
    guild_id: serenity::GuildId,
    mut record: UserRecord,
    action: PointsAction,
    amount: i64,
    reason: Option<&str>,
) -> Result<String, Error> {
    let data = ctx.data();
    let change = apply_main_points(&mut record, &data.config.levels, action, amount)?;
    save_user(&data.db, &record).await?;

    let mut reply = points_reply(action, amount, &record.roblox_username, &change, reason);

    if change.is_changed() {
        match sync_rank_role(
            ctx.http(),
            guild_id,
            &record,
            &data.config.levels,
            "Lunar Points tier changed",
        )
        .await
        {
            Ok(Some(outcome)) => reply.push_str(&format!(" {}", outcome.note())),
            Ok(None) => {}
            Err(err) => {
                warn!(?err, roblox_id = record.roblox_id, "rank role sync failed");
                reply.push_str("\n⚠️ Could not update their rank role.");
            }
        }
    }

    publish_log(
        ctx.http(),
        data.config.xp_log_channel_id,
        main_points_log_embed(
            data.config.embed_color,
            action,
            amount,
            &record,
            ctx.author().id,
            reason,
        ),
    )
    .await;

    Ok(reply)
}

#[cfg(test)]
mod tests {
    use mooncrest_leveling::{PointsAction, TierChange};

    use super::{change_summary, parse_action, parse_ladder_action, points_reply};

    #[test]
    fn parses_actions_case_insensitively() {
        assert_eq!(parse_action(Some("ADD")), Some(PointsAction::Add));
        assert_eq!(parse_action(Some("gift")), None);
        assert_eq!(parse_action(None), None);
        assert_eq!(parse_ladder_action(Some("bonus")), None);
        assert_eq!(parse_ladder_action(Some("set")), Some(PointsAction::Set));
    }

    #[test]
    fn summaries_match_the_mutator() {
        assert_eq!(change_summary(PointsAction::Add, 50), "+50 Lunar Points, +1 Expedition");
        assert_eq!(change_summary(PointsAction::Set, 10), "Lunar Points set to 10");
    }

    #[test]
    fn bonus_reply_carries_reason() {
        let reply = points_reply(
            PointsAction::Bonus,
            25,
            "climber",
            &TierChange::Unchanged,
            Some("helped at camp"),
        );
        assert_eq!(
            reply,
            "✅ Gave **25** bonus Lunar Points to **climber**.\n*Reason: helped at camp*"
        );
    }

    #[test]
    fn reply_mentions_level_up() {
        let reply = points_reply(
            PointsAction::Add,
            100,
            "climber",
            &TierChange::Promoted {
                from: "Scout".to_owned(),
                to: "Ranger".to_owned(),
            },
            None,
        );
        assert!(reply.starts_with("✅ Successfully performed 'add' action with 100 Lunar Points"));
        assert!(reply.ends_with("🎉 **climber has leveled up to Ranger!**"));
    }
}
