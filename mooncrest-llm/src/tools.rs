use std::future::Future;

use mooncrest_leveling::LeaderboardKind;
use serde::Deserialize;
use thiserror::Error;

/// Tool calls the model may chain before it has to answer in prose.
pub const MAX_TOOL_ROUNDS: usize = 3;

const MAX_LEADERBOARD_PAGE: i64 = 1_000;

/// Every action the assistant can take. Anything else the model asks for is
/// rejected before it reaches an executor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssistantTool {
    LookupRank { roblox_username: String },
    Leaderboard { kind: LeaderboardKind, page: i64 },
    ListLevels,
    ListAchievements,
    GroupInfo,
}

impl AssistantTool {
    pub fn name(&self) -> &'static str {
        match self {
            AssistantTool::LookupRank { .. } => "lookup_rank",
            AssistantTool::Leaderboard { .. } => "leaderboard",
            AssistantTool::ListLevels => "list_levels",
            AssistantTool::ListAchievements => "list_achievements",
            AssistantTool::GroupInfo => "group_info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolCallError {
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("bad arguments for `{tool}`: {reason}")]
    BadArguments { tool: &'static str, reason: String },
}

/// Implemented by whoever owns the data the tools read.
pub trait ToolExecutor: Send + Sync {
    fn execute(
        &self,
        tool: AssistantTool,
    ) -> impl Future<Output = anyhow::Result<String>> + Send;
}

/// Outcome of inspecting one model reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolParse {
    /// Plain prose; send it to the channel.
    Answer,
    Call(AssistantTool),
    Rejected(ToolCallError),
}

#[derive(Deserialize)]
struct RawToolCall {
    tool: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LookupRankArgs {
    roblox_username: String,
}

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LeaderboardArgs {
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    page: Option<i64>,
}

/// A reply is a tool call only when the whole reply (optionally fenced as a
/// code block) is a JSON object with a `tool` field.
pub fn parse_tool_call(reply: &str) -> ToolParse {
    let body = strip_code_fence(reply.trim());
    if !body.starts_with('{') {
        return ToolParse::Answer;
    }

    let Ok(raw) = serde_json::from_str::<RawToolCall>(body) else {
        return ToolParse::Answer;
    };

    match validate(raw) {
        Ok(tool) => ToolParse::Call(tool),
        Err(err) => ToolParse::Rejected(err),
    }
}

fn strip_code_fence(body: &str) -> &str {
    let Some(inner) = body.strip_prefix("```") else {
        return body;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn arguments<T: for<'de> Deserialize<'de> + Default>(
    tool: &'static str,
    value: serde_json::Value,
) -> Result<T, ToolCallError> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|err| ToolCallError::BadArguments {
        tool,
        reason: err.to_string(),
    })
}

fn validate(raw: RawToolCall) -> Result<AssistantTool, ToolCallError> {
    match raw.tool.trim() {
        "lookup_rank" => {
            let args: LookupRankArgs = serde_json::from_value(raw.arguments).map_err(|err| {
                ToolCallError::BadArguments {
                    tool: "lookup_rank",
                    reason: err.to_string(),
                }
            })?;
            let username = args.roblox_username.trim().trim_start_matches('@');
            let well_formed = (3..=20).contains(&username.len())
                && username
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
            if !well_formed {
                return Err(ToolCallError::BadArguments {
                    tool: "lookup_rank",
                    reason: format!("`{username}` is not a Roblox username"),
                });
            }
            Ok(AssistantTool::LookupRank {
                roblox_username: username.to_owned(),
            })
        }
        "leaderboard" => {
            let args: LeaderboardArgs = arguments("leaderboard", raw.arguments)?;
            let kind = match args.kind.as_deref() {
                Some(raw_kind) => {
                    raw_kind
                        .parse::<LeaderboardKind>()
                        .map_err(|err| ToolCallError::BadArguments {
                            tool: "leaderboard",
                            reason: err.to_string(),
                        })?
                }
                None => LeaderboardKind::Points,
            };
            let page = args.page.unwrap_or(1);
            if !(1..=MAX_LEADERBOARD_PAGE).contains(&page) {
                return Err(ToolCallError::BadArguments {
                    tool: "leaderboard",
                    reason: format!("page must be between 1 and {MAX_LEADERBOARD_PAGE}"),
                });
            }
            Ok(AssistantTool::Leaderboard { kind, page })
        }
        "list_levels" => Ok(AssistantTool::ListLevels),
        "list_achievements" => Ok(AssistantTool::ListAchievements),
        "group_info" => Ok(AssistantTool::GroupInfo),
        other => Err(ToolCallError::UnknownTool(other.to_owned())),
    }
}

/// Tool protocol appended to the system prompt.
pub fn tool_catalog() -> &'static str {
    "You can look things up. To use a tool, reply with ONLY a JSON object and nothing else:\n\
{\"tool\": \"<name>\", \"arguments\": { ... }}\n\
Tools:\n\
- lookup_rank {\"roblox_username\": string}: level, points, expeditions and global rank of one climber\n\
- leaderboard {\"kind\": \"points\" | \"expeditions\", \"page\": number}: one page of the leaderboard\n\
- list_levels {}: every level and the points it needs\n\
- list_achievements {}: every achievement that can be awarded\n\
- group_info {}: the Roblox group's name and member count\n\
You will get the result in the next message. Then answer the user in plain text."
}

#[cfg(test)]
mod tests {
    use mooncrest_leveling::LeaderboardKind;

    use super::{AssistantTool, ToolCallError, ToolParse, parse_tool_call};

    #[test]
    fn prose_is_an_answer() {
        assert_eq!(parse_tool_call("Hello climber!"), ToolParse::Answer);
        assert_eq!(parse_tool_call("{not json"), ToolParse::Answer);
        assert_eq!(parse_tool_call(r#"{"text": "hi"}"#), ToolParse::Answer);
    }

    #[test]
    fn parses_lookup_rank() {
        assert_eq!(
            parse_tool_call(r#"{"tool":"lookup_rank","arguments":{"roblox_username":"@builderman"}}"#),
            ToolParse::Call(AssistantTool::LookupRank {
                roblox_username: "builderman".to_owned()
            })
        );
    }

    #[test]
    fn leaderboard_defaults_and_fences() {
        let reply = "```json\n{\"tool\":\"leaderboard\",\"arguments\":{\"kind\":\"expo\"}}\n```";
        assert_eq!(
            parse_tool_call(reply),
            ToolParse::Call(AssistantTool::Leaderboard {
                kind: LeaderboardKind::Expeditions,
                page: 1
            })
        );
        assert_eq!(
            parse_tool_call(r#"{"tool":"leaderboard"}"#),
            ToolParse::Call(AssistantTool::Leaderboard {
                kind: LeaderboardKind::Points,
                page: 1
            })
        );
    }

    #[test]
    fn argument_free_tools_ignore_missing_arguments() {
        assert_eq!(
            parse_tool_call(r#"{"tool":"list_levels","arguments":{}}"#),
            ToolParse::Call(AssistantTool::ListLevels)
        );
        assert_eq!(
            parse_tool_call(r#"{"tool":"group_info"}"#),
            ToolParse::Call(AssistantTool::GroupInfo)
        );
    }

    #[test]
    fn rejects_unknown_tools_and_bad_arguments() {
        assert_eq!(
            parse_tool_call(r#"{"tool":"ban_user","arguments":{"id":1}}"#),
            ToolParse::Rejected(ToolCallError::UnknownTool("ban_user".to_owned()))
        );
        assert!(matches!(
            parse_tool_call(r#"{"tool":"lookup_rank","arguments":{"roblox_username":"a b"}}"#),
            ToolParse::Rejected(ToolCallError::BadArguments { tool: "lookup_rank", .. })
        ));
        assert!(matches!(
            parse_tool_call(r#"{"tool":"leaderboard","arguments":{"page":0}}"#),
            ToolParse::Rejected(ToolCallError::BadArguments { tool: "leaderboard", .. })
        ));
        assert!(matches!(
            parse_tool_call(r#"{"tool":"leaderboard","arguments":{"kind":"summits"}}"#),
            ToolParse::Rejected(ToolCallError::BadArguments { tool: "leaderboard", .. })
        ));
    }
}
