use poise::serenity_prelude as serenity;

use crate::CommandMeta;
use crate::replies::{guild_only_message, no_permission_message, usage_message};
use mooncrest_core::{Context, Error};
use mooncrest_database::impls::assistant_chat::clear_chat_history;
use mooncrest_database::impls::assistant_settings::{get_llm_enabled, set_llm_enabled};
use mooncrest_utils::permissions::has_user_permission;

pub const META: CommandMeta = CommandMeta {
    name: "aitoggle",
    desc: "Enable or disable assistant replies, or forget this channel's chat history.",
    category: "admin",
    usage: "!aitoggle <on|off|status|reset>",
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AiToggle {
    On,
    Off,
    Status,
    /// Forget the assistant's history in the current channel.
    Reset,
}

impl AiToggle {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "on" | "enable" => Some(AiToggle::On),
            "off" | "disable" => Some(AiToggle::Off),
            "status" => Some(AiToggle::Status),
            "reset" | "clear" => Some(AiToggle::Reset),
            _ => None,
        }
    }
}

fn state_word(enabled: bool) -> &'static str {
    if enabled { "enabled" } else { "disabled" }
}

#[poise::command(prefix_command, slash_command, category = "Admin")]
pub async fn aitoggle(
    ctx: Context<'_>,
    #[description = "on, off, status or reset"] state: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    if !has_user_permission(
        ctx.http(),
        guild_id,
        ctx.author().id,
        serenity::Permissions::MANAGE_GUILD,
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

    let Some(toggle) = state.as_deref().and_then(AiToggle::parse) else {
        ctx.say(usage_message(META.usage)).await?;
        return Ok(());
    };

    let db = &ctx.data().db;
    match toggle {
        AiToggle::Status => {
            let enabled = get_llm_enabled(db, guild_id.get()).await?;
            let model_note = if ctx.data().llm.is_some() {
                ""
            } else {
                "\nNo assistant model is configured, so nothing will reply either way."
            };
            ctx.say(format!(
                "Assistant replies are currently **{}** for this server.{model_note}",
                state_word(enabled)
            ))
            .await?;
        }
        AiToggle::Reset => {
            let removed = clear_chat_history(db, guild_id.get(), ctx.channel_id().get()).await?;
            ctx.say(format!(
                "Forgot **{removed}** assistant messages in this channel."
            ))
            .await?;
        }
        AiToggle::On | AiToggle::Off => {
            let enabled = toggle == AiToggle::On;
            set_llm_enabled(db, guild_id.get(), enabled).await?;
            ctx.say(format!(
                "Assistant replies are now **{}** for this server.",
                state_word(enabled)
            ))
            .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::AiToggle;

    #[test]
    fn parses_states() {
        assert_eq!(AiToggle::parse(" ON "), Some(AiToggle::On));
        assert_eq!(AiToggle::parse("disable"), Some(AiToggle::Off));
        assert_eq!(AiToggle::parse("clear"), Some(AiToggle::Reset));
        assert_eq!(AiToggle::parse("maybe"), None);
    }
}
