use poise::serenity_prelude as serenity;
use tracing::{debug, error, info};

use mooncrest_core::{BotConfig, Data, Error};
use mooncrest_database::impls::assistant_chat::{insert_chat_turn, prune_chat_history};
use mooncrest_database::impls::assistant_settings::get_llm_enabled;
use mooncrest_database::impls::rate_limit::assistant_mention_within_limit;
use mooncrest_database::impls::users::{find_user, leaderboard_page, rank_for};
use mooncrest_database::model::assistant_chat::ChatRole;
use mooncrest_leveling::{LeaderboardKind, render_progress, resolve_level};
use mooncrest_llm::{AssistantTool, ToolExecutor};
use mooncrest_roblox::group_url;

/// Discord's message length limit.
const MAX_REPLY_CHARS: usize = 2000;
const TOOL_LEADERBOARD_PAGE_SIZE: u64 = 10;

/// Answers tool calls from the data the bot already owns.
struct CommunityTools<'a> {
    data: &'a Data,
}

impl ToolExecutor for CommunityTools<'_> {
    async fn execute(&self, tool: AssistantTool) -> anyhow::Result<String> {
        let data = self.data;

        match tool {
            AssistantTool::LookupRank { roblox_username } => {
                let Some(roblox) = data.roblox.user_by_username(&roblox_username).await? else {
                    return Ok(format!("No Roblox account is named {roblox_username}."));
                };
                let Some(record) = find_user(&data.db, roblox.id).await? else {
                    return Ok(format!("{} has not earned any points yet.", roblox.name));
                };

                let resolved = resolve_level(record.points, &data.config.levels);
                let progress = render_progress(record.points, &resolved);
                let rank = rank_for(&data.db, LeaderboardKind::Points, record.points).await?;
                let achievements: Vec<&str> = record
                    .achievements
                    .iter()
                    .filter_map(|id| data.config.achievement(*id))
                    .map(|achievement| achievement.name.as_str())
                    .collect();

                Ok(format!(
                    "{}: level {}, {} Lunar Points, {} expeditions, global rank #{rank}, {}% to next level ({}). Achievements: {}.",
                    roblox.nickname(),
                    resolved.name(),
                    record.points,
                    record.expeditions,
                    progress.percent,
                    progress.message.replace("**", ""),
                    if achievements.is_empty() {
                        "none".to_owned()
                    } else {
                        achievements.join(", ")
                    }
                ))
            }
            AssistantTool::Leaderboard { kind, page } => {
                let page = leaderboard_page(&data.db, kind, page, TOOL_LEADERBOARD_PAGE_SIZE).await?;
                if page.entries.is_empty() {
                    return Ok("The leaderboard is empty.".to_owned());
                }

                let mut lines: Vec<String> = page
                    .entries
                    .iter()
                    .zip(page.plan.first_rank()..)
                    .map(|(entry, rank)| format!("#{rank} {}: {} {kind}", entry.display_name, entry.sort_value))
                    .collect();
                lines.push(format!(
                    "(page {} of {})",
                    page.plan.page_number, page.plan.total_pages
                ));
                Ok(lines.join("\n"))
            }
            AssistantTool::ListLevels => Ok(levels_summary(&data.config)),
            AssistantTool::ListAchievements => Ok(achievements_summary(&data.config)),
            AssistantTool::GroupInfo => {
                let group = data.roblox.group_info().await?;
                Ok(format!(
                    "{} has {} members. Group page: {}",
                    group.name,
                    group.member_count,
                    group_url(data.roblox.group_id())
                ))
            }
        }
    }
}

fn levels_summary(config: &BotConfig) -> String {
    let thresholds = config.levels.thresholds();
    if thresholds.is_empty() {
        return "No levels are configured.".to_owned();
    }

    thresholds
        .iter()
        .map(|level| format!("{}: {}+ Lunar Points", level.name, level.min_points))
        .collect::<Vec<_>>()
        .join("\n")
}

fn achievements_summary(config: &BotConfig) -> String {
    if config.achievements.is_empty() {
        return "No achievements are configured.".to_owned();
    }

    config
        .achievements
        .iter()
        .map(|achievement| {
            if achievement.description.is_empty() {
                achievement.name.clone()
            } else {
                format!("{}: {}", achievement.name, achievement.description)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove mentions of the bot and collapse what is left.
fn strip_bot_mention(content: &str, bot_id: serenity::UserId) -> String {
    let plain = format!("<@{}>", bot_id.get());
    let nick = format!("<@!{}>", bot_id.get());
    content
        .replace(&plain, " ")
        .replace(&nick, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn clamp_reply(reply: &str) -> String {
    if reply.chars().count() <= MAX_REPLY_CHARS {
        return reply.to_owned();
    }
    let mut out: String = reply.chars().take(MAX_REPLY_CHARS - 1).collect();
    out.push('…');
    out
}

/// Reply to a message that mentions the bot, when the assistant is
/// configured and enabled for the guild.
pub async fn handle_message_mention(
    ctx: &serenity::Context,
    data: &Data,
    message: &serenity::Message,
) -> Result<(), Error> {
    if message.author.bot || message.webhook_id.is_some() {
        return Ok(());
    }

    let Some(guild_id) = message.guild_id else {
        return Ok(());
    };
    let Some(llm) = data.llm.as_ref() else {
        return Ok(());
    };

    let bot_id = ctx.cache.current_user().id;
    if !message.mentions_user_id(bot_id) {
        return Ok(());
    }

    if !get_llm_enabled(&data.db, guild_id.get()).await? {
        debug!(guild_id = guild_id.get(), "assistant disabled for guild");
        return Ok(());
    }

    let channel_id = message.channel_id;
    let author_id = message.author.id;
    if !assistant_mention_within_limit(&data.db, guild_id.get(), channel_id.get(), author_id.get())
        .await?
    {
        return Ok(());
    }

    let prompt = strip_bot_mention(&message.content, bot_id);
    let prompt = if prompt.is_empty() { "Hi!".to_owned() } else { prompt };
    let display_name = message.author.display_name().to_owned();

    let typing = channel_id.start_typing(&ctx.http);
    let tools = CommunityTools { data };
    let reply = llm
        .generate_channel_reply(
            &data.db,
            guild_id.get(),
            channel_id.get(),
            &prompt,
            &display_name,
            &tools,
        )
        .await;
    typing.stop();

    let reply = match reply {
        Ok(reply) if !reply.trim().is_empty() => clamp_reply(reply.trim()),
        Ok(_) => return Ok(()),
        Err(source) => {
            error!(?source, guild_id = guild_id.get(), "assistant reply failed");
            return Ok(());
        }
    };

    message
        .channel_id
        .send_message(
            &ctx.http,
            serenity::CreateMessage::new()
                .content(&reply)
                .reference_message(message)
                .allowed_mentions(serenity::CreateAllowedMentions::new()),
        )
        .await?;

    insert_chat_turn(
        &data.db,
        guild_id.get(),
        channel_id.get(),
        author_id.get(),
        Some(&display_name),
        ChatRole::User,
        &prompt,
    )
    .await?;
    insert_chat_turn(
        &data.db,
        guild_id.get(),
        channel_id.get(),
        bot_id.get(),
        None,
        ChatRole::Assistant,
        &reply,
    )
    .await?;

    let pruned = prune_chat_history(&data.db, guild_id.get(), channel_id.get()).await?;
    if pruned > 0 {
        info!(guild_id = guild_id.get(), channel_id = channel_id.get(), pruned, "pruned assistant history");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude as serenity;

    use mooncrest_core::BotConfig;

    use super::{MAX_REPLY_CHARS, achievements_summary, clamp_reply, levels_summary, strip_bot_mention};

    #[test]
    fn strips_both_mention_forms() {
        let bot = serenity::UserId::new(42);
        assert_eq!(strip_bot_mention("<@42> what's my rank?", bot), "what's my rank?");
        assert_eq!(strip_bot_mention("hey <@!42>  there", bot), "hey there");
        assert_eq!(strip_bot_mention("<@42>", bot), "");
    }

    #[test]
    fn long_replies_fit_in_one_message() {
        let long = "a".repeat(MAX_REPLY_CHARS + 10);
        let clamped = clamp_reply(&long);
        assert_eq!(clamped.chars().count(), MAX_REPLY_CHARS);
        assert!(clamped.ends_with('…'));
        assert_eq!(clamp_reply("short"), "short");
    }

    #[test]
    fn summaries_describe_the_config() {
        let config = BotConfig::from_json(
            r#"{
                "group_id": 1,
                "levels": [
                    {"name": "Novice", "min_points": 0},
                    {"name": "Explorer", "min_points": 100}
                ],
                "achievements": [{"id": 1, "name": "First Summit", "description": "Reach the peak"}]
            }"#,
        )
        .unwrap();

        assert_eq!(
            levels_summary(&config),
            "Novice: 0+ Lunar Points\nExplorer: 100+ Lunar Points"
        );
        assert_eq!(achievements_summary(&config), "First Summit: Reach the peak");

        let empty = BotConfig::from_json(r#"{"group_id": 1}"#).unwrap();
        assert_eq!(levels_summary(&empty), "No levels are configured.");
    }
}
