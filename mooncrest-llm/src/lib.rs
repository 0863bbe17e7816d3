mod client;
pub mod prompt;
pub mod tools;

pub use client::{HISTORY_CONTEXT_MESSAGES, LlmService};
pub use tools::{AssistantTool, MAX_TOOL_ROUNDS, ToolCallError, ToolExecutor, ToolParse, parse_tool_call};
