use poise::serenity_prelude as serenity;
use tracing::error;

use mooncrest_database::model::users::UserRecord;
use mooncrest_leveling::PointsAction;

use crate::points::POINTS_NAME;
use crate::replies::escape_markdown;

/// Post an audit embed to a configured log channel. Failures are logged and
/// never fail the command that triggered them.
pub async fn publish_log(
    http: &serenity::Http,
    channel_id: Option<u64>,
    embed: serenity::CreateEmbed,
) {
    let Some(channel_id) = channel_id else {
        return;
    };

    if let Err(source) = serenity::ChannelId::new(channel_id)
        .send_message(http, serenity::CreateMessage::new().embed(embed))
        .await
    {
        error!(?source, channel_id, "failed to publish to log channel");
    }
}

pub fn main_points_log_embed(
    color: u32,
    action: PointsAction,
    amount: i64,
    record: &UserRecord,
    moderator: serenity::UserId,
    reason: Option<&str>,
) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(format!("📊 {POINTS_NAME} Log ({})", action.display_name()))
        .color(color)
        .field("Action", action.display_name(), true)
        .field("Amount", amount.to_string(), true)
        .field(
            "Target",
            format!("{} ({})", escape_markdown(&record.roblox_username), record.roblox_id),
            true,
        )
        .field("By", format!("<@{}>", moderator.get()), true)
        .field(format!("New {POINTS_NAME}"), record.points.to_string(), true)
        .timestamp(serenity::Timestamp::now());

    if action.expedition_delta() != 0 {
        embed = embed.field("Total Expeditions", record.expeditions.to_string(), true);
    }

    if let Some(reason) = reason {
        embed = embed.field("Reason", escape_markdown(reason), false);
    }

    embed
}

/// Audit entry for a single-counter ladder (departments, expeditions).
pub struct LadderLog {
    pub title: String,
    pub action: PointsAction,
    pub amount: i64,
    pub target: String,
    pub old_value: i64,
    pub new_value: i64,
}

impl LadderLog {
    pub fn embed(&self, color: u32, moderator: serenity::UserId) -> serenity::CreateEmbed {
        serenity::CreateEmbed::new()
            .title(self.title.clone())
            .color(color)
            .field("Action", self.action.display_name(), true)
            .field("Amount", self.amount.to_string(), true)
            .field("Target", self.target.clone(), true)
            .field("By", format!("<@{}>", moderator.get()), true)
            .field("Old", self.old_value.to_string(), true)
            .field("New", self.new_value.to_string(), true)
            .timestamp(serenity::Timestamp::now())
    }
}
