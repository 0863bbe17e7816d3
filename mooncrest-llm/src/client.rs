use std::env;

use anyhow::Context as _;
use mooncrest_database::{
    Database,
    impls::assistant_chat::list_recent_chat_turns,
    model::assistant_chat::{ChatRole, ChatTurn},
};
use ollama_rs::{
    Ollama,
    generation::chat::{ChatMessage, request::ChatMessageRequest},
    models::ModelOptions,
};
use tracing::{debug, warn};

use crate::tools::{MAX_TOOL_ROUNDS, ToolExecutor, ToolParse, parse_tool_call};

/// Prior channel turns given to the model as context.
pub const HISTORY_CONTEXT_MESSAGES: u32 = 20;

const GAVE_UP_REPLY: &str =
    "I couldn't finish looking that up right now. Try asking again in a moment!";

#[derive(Clone, Debug)]
pub struct LlmService {
    client: Ollama,
    model: String,
}

impl LlmService {
    pub fn from_env_optional() -> anyhow::Result<Option<Self>> {
        let enabled = env::var("OLLAMA_ENABLED")
            .ok()
            .map(|value| {
                matches!(
                    value.trim().to_ascii_lowercase().as_str(),
                    "1" | "true" | "yes" | "on"
                )
            })
            .unwrap_or(true);

        if !enabled {
            return Ok(None);
        }

        let configured = ["OLLAMA_HOST", "OLLAMA_PORT", "OLLAMA_MODEL"]
            .iter()
            .filter_map(|key| env::var(key).ok())
            .any(|value| !value.trim().is_empty());

        if !configured {
            return Ok(None);
        }

        Ok(Some(Self::from_env()?))
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let host = env::var("OLLAMA_HOST")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "http://127.0.0.1".to_owned());
        let port = match env::var("OLLAMA_PORT") {
            Ok(raw) if !raw.trim().is_empty() => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("OLLAMA_PORT `{raw}` is not a port number"))?,
            _ => 11434,
        };
        let model = env::var("OLLAMA_MODEL")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "gpt-oss:20b-cloud".to_owned());

        let client = Ollama::new(host, port);
        Ok(Self { client, model })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Answer the latest mention in a channel, letting the model call tools
    /// through `executor` for up to [`MAX_TOOL_ROUNDS`] rounds.
    pub async fn generate_channel_reply<E>(
        &self,
        db: &Database,
        guild_id: u64,
        channel_id: u64,
        user_prompt: &str,
        author_display_name: &str,
        executor: &E,
    ) -> anyhow::Result<String>
    where
        E: ToolExecutor,
    {
        let history =
            list_recent_chat_turns(db, guild_id, channel_id, HISTORY_CONTEXT_MESSAGES).await?;

        let mut messages = Vec::with_capacity(history.len() + 2 + MAX_TOOL_ROUNDS * 2);
        messages.push(ChatMessage::system(crate::prompt::system_prompt()));
        messages.extend(history.into_iter().rev().map(history_message));
        messages.push(ChatMessage::user(format!(
            "--- LATEST MESSAGE TO REPLY TO ---\n{}: {}",
            single_line(author_display_name),
            user_prompt
        )));

        for round in 0..=MAX_TOOL_ROUNDS {
            let reply = self.chat(messages.clone()).await?;

            let call = match parse_tool_call(&reply) {
                ToolParse::Answer => return Ok(reply),
                _ if round == MAX_TOOL_ROUNDS => break,
                ToolParse::Rejected(err) => {
                    debug!(%err, guild_id, channel_id, "assistant tool call rejected");
                    messages.push(ChatMessage::assistant(reply));
                    messages.push(ChatMessage::user(format!("[tool error] {err}")));
                    continue;
                }
                ToolParse::Call(call) => call,
            };

            let tool_name = call.name();
            debug!(tool = tool_name, round, guild_id, channel_id, "assistant tool call");

            let result = match executor.execute(call).await {
                Ok(output) => format!("[tool result: {tool_name}]\n{output}"),
                Err(err) => {
                    warn!(?err, tool = tool_name, "assistant tool failed");
                    format!("[tool error: {tool_name}] lookup failed, tell the user you could not check")
                }
            };

            messages.push(ChatMessage::assistant(reply));
            messages.push(ChatMessage::user(result));
        }

        warn!(guild_id, channel_id, "assistant exhausted tool rounds");
        Ok(GAVE_UP_REPLY.to_owned())
    }

    async fn chat(&self, messages: Vec<ChatMessage>) -> anyhow::Result<String> {
        let request = ChatMessageRequest::new(self.model.clone(), messages).options(
            ModelOptions::default()
                .temperature(0.75)
                .repeat_penalty(1.2),
        );
        let response = self
            .client
            .send_chat_messages(request)
            .await
            .context("failed to get ollama chat response")?;

        Ok(response.message.content.trim().to_owned())
    }
}

fn history_message(turn: ChatTurn) -> ChatMessage {
    match turn.role {
        ChatRole::User => {
            let name = turn
                .display_name
                .as_deref()
                .map(single_line)
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "unknown".to_owned());
            ChatMessage::user(format!("{name}: {}", turn.content))
        }
        ChatRole::Assistant => ChatMessage::assistant(turn.content),
    }
}

fn single_line(value: &str) -> String {
    value.trim().replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use mooncrest_database::model::assistant_chat::{ChatRole, ChatTurn};

    use super::{history_message, single_line};

    fn turn(role: ChatRole, display_name: Option<&str>, content: &str) -> ChatTurn {
        ChatTurn {
            user_id: 1,
            display_name: display_name.map(str::to_owned),
            role,
            content: content.to_owned(),
            created_at: 0,
        }
    }

    #[test]
    fn user_turns_carry_the_speaker() {
        let message = history_message(turn(ChatRole::User, Some("Luna\nMoth"), "what's my rank?"));
        assert_eq!(message.content, "Luna Moth: what's my rank?");

        let anonymous = history_message(turn(ChatRole::User, Some("  "), "hi"));
        assert_eq!(anonymous.content, "unknown: hi");
    }

    #[test]
    fn assistant_turns_are_verbatim() {
        let message = history_message(turn(ChatRole::Assistant, None, "You're a Ranger!"));
        assert_eq!(message.content, "You're a Ranger!");
    }

    #[test]
    fn names_are_flattened() {
        assert_eq!(single_line(" a\nb "), "a b");
    }
}
