/// Discord snowflakes are at least this many digits in practice.
const MIN_SNOWFLAKE_DIGITS: usize = 15;

fn parse_snowflake(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u64>().ok().filter(|id| *id > 0)
}

/// Parse `<@id>`, `<@!id>` or a bare snowflake into a user id.
pub fn parse_user_id(raw: &str) -> Option<u64> {
    let value = raw.trim();

    if let Some(inner) = value.strip_prefix("<@").and_then(|rest| rest.strip_suffix('>')) {
        if inner.starts_with('&') {
            return None;
        }
        return parse_snowflake(inner.trim_start_matches('!'));
    }

    if value.len() >= MIN_SNOWFLAKE_DIGITS {
        return parse_snowflake(value);
    }

    None
}

/// Parse `<@&id>` into a role id.
pub fn parse_role_id(raw: &str) -> Option<u64> {
    raw.trim()
        .strip_prefix("<@&")
        .and_then(|rest| rest.strip_suffix('>'))
        .and_then(parse_snowflake)
}

/// Users and roles named in a free-form target list such as
/// `<@1> <@&2><@!3>`. Duplicates are dropped, first occurrence wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MentionTargets {
    pub users: Vec<u64>,
    pub roles: Vec<u64>,
}

impl MentionTargets {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.roles.is_empty()
    }
}

pub fn parse_mention_targets(raw: &str) -> MentionTargets {
    let mut targets = MentionTargets::default();
    let mut rest = raw;

    while let Some(start) = rest.find("<@") {
        let after = &rest[start..];
        let Some(end) = after.find('>') else {
            break;
        };
        let token = &after[..=end];

        if let Some(role_id) = parse_role_id(token) {
            if !targets.roles.contains(&role_id) {
                targets.roles.push(role_id);
            }
        } else if let Some(user_id) = parse_user_id(token)
            && !targets.users.contains(&user_id)
        {
            targets.users.push(user_id);
        }

        rest = &after[end + 1..];
    }

    for word in raw.split_whitespace() {
        if word.len() >= MIN_SNOWFLAKE_DIGITS
            && let Some(user_id) = parse_snowflake(word)
            && !targets.users.contains(&user_id)
        {
            targets.users.push(user_id);
        }
    }

    targets
}

/// Whom a profile command is about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProfileTarget {
    Discord(u64),
    Roblox(String),
}

/// A mention or snowflake is a Discord user; anything else is taken as a
/// Roblox username. Blank input means "the invoking user".
pub fn parse_profile_target(raw: &str) -> Option<ProfileTarget> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    Some(match parse_user_id(value) {
        Some(user_id) => ProfileTarget::Discord(user_id),
        None => ProfileTarget::Roblox(value.trim_start_matches('@').to_owned()),
    })
}

/// Roblox usernames are 3-20 characters of letters, digits and at most one
/// underscore, which may not lead or trail.
pub fn is_valid_roblox_username(raw: &str) -> bool {
    let len = raw.chars().count();
    (3..=20).contains(&len)
        && raw.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        && raw.matches('_').count() <= 1
        && !raw.starts_with('_')
        && !raw.ends_with('_')
}

#[cfg(test)]
mod tests {
    use super::{
        MentionTargets, ProfileTarget, is_valid_roblox_username, parse_mention_targets,
        parse_profile_target, parse_role_id, parse_user_id,
    };

    const ALICE: u64 = 111_111_111_111_111_111;
    const BOB: u64 = 222_222_222_222_222_222;
    const RANGERS: u64 = 333_333_333_333_333_333;

    #[test]
    fn parses_user_mentions_and_snowflakes() {
        assert_eq!(parse_user_id("<@111111111111111111>"), Some(ALICE));
        assert_eq!(parse_user_id("<@!111111111111111111>"), Some(ALICE));
        assert_eq!(parse_user_id("111111111111111111"), Some(ALICE));
        assert_eq!(parse_user_id("<@&111111111111111111>"), None);
        assert_eq!(parse_user_id("1234"), None);
        assert_eq!(parse_user_id("builderman"), None);
    }

    #[test]
    fn parses_role_mentions_only() {
        assert_eq!(parse_role_id("<@&333333333333333333>"), Some(RANGERS));
        assert_eq!(parse_role_id("<@333333333333333333>"), None);
    }

    #[test]
    fn collects_mixed_targets_without_duplicates() {
        let targets = parse_mention_targets(
            "<@111111111111111111><@&333333333333333333> <@!222222222222222222> <@111111111111111111>",
        );
        assert_eq!(
            targets,
            MentionTargets {
                users: vec![ALICE, BOB],
                roles: vec![RANGERS],
            }
        );
    }

    #[test]
    fn garbage_yields_no_targets() {
        assert!(parse_mention_targets("everyone here <@ unfinished").is_empty());
    }

    #[test]
    fn profile_targets_split_discord_and_roblox() {
        assert_eq!(
            parse_profile_target("<@222222222222222222>"),
            Some(ProfileTarget::Discord(BOB))
        );
        assert_eq!(
            parse_profile_target(" @builderman "),
            Some(ProfileTarget::Roblox("builderman".to_owned()))
        );
        assert_eq!(parse_profile_target("   "), None);
    }

    #[test]
    fn validates_roblox_usernames() {
        assert!(is_valid_roblox_username("builderman"));
        assert!(is_valid_roblox_username("Moon_Walker99"));
        assert!(!is_valid_roblox_username("ab"));
        assert!(!is_valid_roblox_username("_leading"));
        assert!(!is_valid_roblox_username("two__under"));
        assert!(!is_valid_roblox_username("has space"));
    }
}
