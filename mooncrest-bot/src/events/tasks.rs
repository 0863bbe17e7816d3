use std::time::Duration;

use poise::serenity_prelude as serenity;
use tracing::{debug, info, warn};

use mooncrest_core::{BotConfig, Data};
use mooncrest_database::impls::metadata::{
    get_last_announced_milestone, set_last_announced_milestone,
};

const PRESENCE_INTERVAL: Duration = Duration::from_secs(10 * 60);
const MILESTONE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Start the presence and milestone loops. Call once per process.
pub fn spawn_background_tasks(ctx: serenity::Context, data: Data) {
    let presence_ctx = ctx.clone();
    let presence_data = data.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRESENCE_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(err) = refresh_presence(&presence_ctx, &presence_data).await {
                warn!(?err, "failed to refresh presence");
            }
        }
    });

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(MILESTONE_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(err) = check_milestones(&ctx, &data).await {
                warn!(?err, "milestone check failed");
            }
        }
    });
}

async fn refresh_presence(ctx: &serenity::Context, data: &Data) -> anyhow::Result<()> {
    let group = data.roblox.group_info().await?;
    let status = format!(
        "{} with {} Members",
        group.name,
        group_thousands(group.member_count)
    );
    debug!(%status, "presence refreshed");
    ctx.set_activity(Some(serenity::ActivityData::watching(status)));
    Ok(())
}

async fn check_milestones(ctx: &serenity::Context, data: &Data) -> anyhow::Result<()> {
    let Some(channel_id) = data.config.milestone_channel_id else {
        return Ok(());
    };

    let group = data.roblox.group_info().await?;
    let last = get_last_announced_milestone(&data.db).await?;
    let Some(milestone) = milestone_due(&data.config, last, group.member_count) else {
        return Ok(());
    };

    let embed = serenity::CreateEmbed::new()
        .title("🎉 Community Milestone Reached! 🎉")
        .description(format!(
            "## We've just hit **{}** members in our Roblox Group!",
            group_thousands(milestone)
        ))
        .field(
            "Thank You!",
            "Thank you to everyone who has joined and supported us on this journey!",
            false,
        )
        .color(data.config.embed_color);

    serenity::ChannelId::new(channel_id)
        .send_message(&ctx.http, serenity::CreateMessage::new().embed(embed))
        .await?;

    set_last_announced_milestone(&data.db, milestone).await?;
    info!(milestone, members = group.member_count, "announced member milestone");
    Ok(())
}

/// The milestone to announce now, if the group has reached one that has not
/// been announced yet.
fn milestone_due(config: &BotConfig, last_announced: u64, member_count: u64) -> Option<u64> {
    config
        .next_milestone(last_announced)
        .filter(|milestone| member_count >= *milestone)
}

/// `12345` -> `12,345`.
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use mooncrest_core::BotConfig;

    use super::{group_thousands, milestone_due};

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn milestones_fire_once_reached() {
        let config = BotConfig::from_json(
            r#"{"group_id": 1, "member_count_milestones": [1000, 500, 2000]}"#,
        )
        .unwrap();

        assert_eq!(milestone_due(&config, 0, 499), None);
        assert_eq!(milestone_due(&config, 0, 750), Some(500));
        assert_eq!(milestone_due(&config, 500, 2500), Some(1000));
        assert_eq!(milestone_due(&config, 2000, 10_000), None);
    }
}
