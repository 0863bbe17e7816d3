use std::{fs, path::Path};

use crate::tools::tool_catalog;

const DEFAULT_SYSTEM_PROMPT: &str = "You are Moonie, the friendly guide of the Mooncrest Expedition \
climbing community on Roblox. Keep answers short and warm. Only state ranks, points or \
achievements you got from a tool result; never invent numbers. \
If a question is about something you cannot look up, say so plainly.";

/// Operator override from `SYSTEM_PROMPT.md`, else the built-in persona.
pub fn base_prompt() -> String {
    let prompt_file = Path::new("SYSTEM_PROMPT.md");
    match fs::read_to_string(prompt_file) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => DEFAULT_SYSTEM_PROMPT.to_owned(),
    }
}

pub fn system_prompt() -> String {
    format!("{}\n\n{}", base_prompt().trim_end(), tool_catalog())
}

#[cfg(test)]
mod tests {
    use super::system_prompt;

    #[test]
    fn system_prompt_lists_every_tool() {
        let prompt = system_prompt();
        for name in ["lookup_rank", "leaderboard", "list_levels", "list_achievements", "group_info"] {
            assert!(prompt.contains(name), "missing {name}");
        }
    }
}
