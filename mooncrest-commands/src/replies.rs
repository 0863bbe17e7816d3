//! Reply strings shared by several commands.

pub fn usage_message(usage: &str) -> String {
    format!("Usage: `{usage}`")
}

pub fn guild_only_message() -> &'static str {
    "This command only works in servers."
}

pub fn no_permission_message() -> &'static str {
    "❌ You do not have permission to use this command."
}

pub fn negative_amount_message() -> &'static str {
    "❌ Amount cannot be a negative number."
}

pub fn not_linked_message(discord_id: u64) -> String {
    format!(
        "❌ User <@{discord_id}> is not linked to a Roblox account. They need to use `/verify` first."
    )
}

pub fn roblox_user_not_found_message(username: &str) -> String {
    format!("⚠️ Roblox user **{}** not found.", escape_markdown(username))
}

/// Keep user-supplied text from pinging or breaking formatting.
pub fn escape_markdown(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '*' | '_' | '`' | '~' | '|' | '>') {
            out.push('\\');
        }
        out.push(ch);
        if ch == '@' {
            out.push('\u{200B}');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{escape_markdown, usage_message};

    #[test]
    fn escapes_markdown_and_mentions() {
        assert_eq!(escape_markdown("moon_walker"), "moon\\_walker");
        assert_eq!(escape_markdown("@everyone"), "@\u{200B}everyone");
    }

    #[test]
    fn usage_is_code_formatted() {
        assert_eq!(usage_message("!ping"), "Usage: `!ping`");
    }
}
