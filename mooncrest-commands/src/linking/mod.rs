pub mod getrole;
pub mod link;
pub mod unverify;
pub mod verify;

use poise::serenity_prelude as serenity;
use tracing::warn;

use mooncrest_roblox::RobloxUser;

/// Discord's nickname length limit.
const NICKNAME_MAX_CHARS: usize = 32;

pub(crate) const NICKNAME_WARNING: &str = "⚠️ Could not change the nickname. This might be because the member is the server owner or has a higher role than the bot.";

/// `Display (@name)`, cut to Discord's limit on a character boundary.
pub(crate) fn verified_nickname(user: &RobloxUser) -> String {
    let full = user.nickname();
    if full.chars().count() <= NICKNAME_MAX_CHARS {
        return full;
    }
    full.chars().take(NICKNAME_MAX_CHARS).collect()
}

pub(crate) struct VerificationOutcome {
    pub nickname: String,
    pub nickname_applied: bool,
}

/// Set the linked nickname and grant the verified role when one is configured.
/// A nickname the bot may not change is reported, not raised.
pub(crate) async fn apply_verification(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    roblox_user: &RobloxUser,
    verified_role_id: Option<u64>,
) -> anyhow::Result<VerificationOutcome> {
    let nickname = verified_nickname(roblox_user);

    let nickname_applied = match guild_id
        .edit_member(http, user_id, serenity::EditMember::new().nickname(&nickname))
        .await
    {
        Ok(_) => true,
        Err(err) => {
            warn!(?err, user_id = user_id.get(), "failed to set verified nickname");
            false
        }
    };

    if let Some(role_id) = verified_role_id {
        http.add_member_role(
            guild_id,
            user_id,
            serenity::RoleId::new(role_id),
            Some("Roblox account verified"),
        )
        .await?;
    }

    Ok(VerificationOutcome {
        nickname,
        nickname_applied,
    })
}

/// Take the verified role away and reset the nickname. Failures are logged;
/// the link itself is already gone by the time this runs.
pub(crate) async fn remove_verification(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    verified_role_id: Option<u64>,
) {
    if let Some(role_id) = verified_role_id
        && let Err(err) = http
            .remove_member_role(
                guild_id,
                user_id,
                serenity::RoleId::new(role_id),
                Some("Roblox account unlinked"),
            )
            .await
    {
        warn!(?err, user_id = user_id.get(), "failed to remove verified role");
    }

    if let Err(err) = guild_id
        .edit_member(http, user_id, serenity::EditMember::new().nickname(""))
        .await
    {
        warn!(?err, user_id = user_id.get(), "failed to reset nickname");
    }
}

#[cfg(test)]
mod tests {
    use mooncrest_roblox::RobloxUser;

    use super::{NICKNAME_MAX_CHARS, verified_nickname};

    fn user(display_name: &str, name: &str) -> RobloxUser {
        RobloxUser {
            id: 1,
            name: name.to_owned(),
            display_name: display_name.to_owned(),
        }
    }

    #[test]
    fn short_nicknames_are_kept() {
        assert_eq!(verified_nickname(&user("Luna", "luna_moth")), "Luna (@luna_moth)");
    }

    #[test]
    fn long_nicknames_are_cut_on_characters() {
        let nickname = verified_nickname(&user("🌙🌙🌙🌙🌙🌙🌙🌙🌙🌙", "a_very_long_username"));
        assert_eq!(nickname.chars().count(), NICKNAME_MAX_CHARS);
        assert!(nickname.starts_with("🌙🌙🌙"));
    }
}
