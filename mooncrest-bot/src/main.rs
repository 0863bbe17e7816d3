mod bootstrap;
mod events;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use poise::serenity_prelude as serenity;
use tracing::{debug, error, info};

use rustls::crypto::ring::default_provider;

use mooncrest_core::{BotConfig, Data, Error};
use mooncrest_llm::LlmService;
use mooncrest_roblox::RobloxClient;

use crate::bootstrap::{Settings, init_tracing, open_database};

static TASKS_STARTED: AtomicBool = AtomicBool::new(false);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls ring provider"))?;

    dotenvy::dotenv().ok();
    let settings = Settings::from_env()?;

    let config = Arc::new(BotConfig::load(&settings.config_path)?);
    info!(
        path = %settings.config_path,
        group_id = config.group_id,
        levels = config.levels.len(),
        departments = config.departments.len(),
        "Bot config loaded."
    );

    let roblox = RobloxClient::new(config.group_id, settings.rover_api_key.clone())?;
    if !roblox.rover_enabled() {
        info!("RoVer lookups disabled (set ROVER_API_KEY to enable).");
    }

    let db = open_database(&settings).await?;

    let llm = LlmService::from_env_optional()?;
    if llm.is_some() {
        info!("Assistant enabled.");
    } else {
        info!("Assistant disabled (missing/empty OLLAMA_* vars or OLLAMA_ENABLED=false).");
    }

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let guild_id = serenity::GuildId::new(settings.guild_id);

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: mooncrest_commands::commands(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(handle_event(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(mooncrest_utils::COMMAND_PREFIX.to_string()),
                mention_as_prefix: false,
                ..Default::default()
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            let db = db.clone();
            let llm = llm.clone();
            let roblox = roblox.clone();
            let config = config.clone();
            Box::pin(async move {
                info!("Mooncrest has awoken!");

                poise::builtins::register_in_guild(ctx, &framework.options().commands, guild_id)
                    .await?;

                let data = Data {
                    db,
                    llm,
                    roblox,
                    config,
                };

                // Setup reruns after a full reconnect; the loops must not.
                if !TASKS_STARTED.swap(true, Ordering::SeqCst) {
                    events::tasks::spawn_background_tasks(ctx.clone(), data.clone());
                }

                Ok(data)
            })
        })
        .build();

    info!("Mooncrest is connecting...");

    let mut client = serenity::ClientBuilder::new(&settings.discord_token, intents)
        .framework(framework)
        .await?;

    client.start().await?;
    Ok(())
}

/// Usage line for a failed parse, from the command's own metadata when known.
fn usage_hint(qualified_name: &str) -> String {
    let root = qualified_name.split_whitespace().next().unwrap_or(qualified_name);
    match mooncrest_commands::COMMANDS.iter().find(|meta| meta.name == root) {
        Some(meta) => format!("Usage: `{}`", meta.usage),
        None => format!("Usage: `!{qualified_name}`"),
    }
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(?error, "command error");

            let embed = serenity::CreateEmbed::new()
                .title("Command Error")
                .description("Something went wrong while running this command.")
                .color(mooncrest_utils::embed::DEFAULT_EMBED_COLOR);

            let _ = ctx
                .send(poise::CreateReply::default().ephemeral(true).embed(embed))
                .await;
        }
        poise::FrameworkError::ArgumentParse { ctx, input, .. } => {
            let usage = usage_hint(&ctx.command().qualified_name);
            let description = if let Some(input) = input {
                format!("Invalid argument: `{}`\n{}", input, usage)
            } else {
                format!("Missing required argument.\n{}", usage)
            };

            let _ = ctx.say(description).await;
        }
        poise::FrameworkError::UnknownCommand { .. } => {
            debug!("unknown command invocation");
        }
        other => {
            error!(?other, "framework error");
        }
    }
}

async fn handle_event(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            events::assistant::handle_message_mention(ctx, data, new_message).await?;
        }
        serenity::FullEvent::InteractionCreate { interaction } => {
            events::components::handle_interaction(ctx, data, interaction).await;
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::usage_hint;

    #[test]
    fn usage_hints_come_from_command_metadata() {
        assert_eq!(
            usage_hint("expod"),
            "Usage: `!expod <add|remove|set> <member> <amount>`"
        );
        assert!(usage_hint("link status").starts_with("Usage: `!link <member"));
        assert_eq!(usage_hint("nothing"), "Usage: `!nothing`");
    }
}
