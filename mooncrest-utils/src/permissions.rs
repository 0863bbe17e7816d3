use poise::serenity_prelude as serenity;

/// Resolve a member's effective guild permissions from their roles.
pub async fn resolve_user_permissions(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
) -> anyhow::Result<serenity::Permissions> {
    let guild = guild_id.to_partial_guild(http).await?;
    if guild.owner_id == user_id {
        return Ok(serenity::Permissions::all());
    }

    let member = guild_id.member(http, user_id).await?;
    let everyone_role_id = serenity::RoleId::new(guild_id.get());

    let resolved = guild
        .roles
        .values()
        .filter(|role| role.id == everyone_role_id || member.roles.contains(&role.id))
        .fold(serenity::Permissions::empty(), |acc, role| acc | role.permissions);

    Ok(resolved)
}

pub async fn has_user_permission(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    required: serenity::Permissions,
) -> anyhow::Result<bool> {
    let perms = resolve_user_permissions(http, guild_id, user_id).await?;

    Ok(perms.contains(serenity::Permissions::ADMINISTRATOR) || perms.contains(required))
}

/// Whether any of `member_roles` appears in `manager_roles`.
pub fn holds_any_role(member_roles: &[serenity::RoleId], manager_roles: &[u64]) -> bool {
    member_roles
        .iter()
        .any(|role_id| manager_roles.contains(&role_id.get()))
}

/// Administrators always pass; everyone else needs one of `manager_roles`.
pub async fn has_manager_access(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    manager_roles: &[u64],
) -> anyhow::Result<bool> {
    if !manager_roles.is_empty() {
        let member = guild_id.member(http, user_id).await?;
        if holds_any_role(&member.roles, manager_roles) {
            return Ok(true);
        }
    }

    has_user_permission(http, guild_id, user_id, serenity::Permissions::ADMINISTRATOR).await
}

#[cfg(test)]
mod tests {
    use poise::serenity_prelude as serenity;

    use super::holds_any_role;

    #[test]
    fn manager_roles_match_by_id() {
        let roles = [serenity::RoleId::new(10), serenity::RoleId::new(20)];
        assert!(holds_any_role(&roles, &[5, 20]));
        assert!(!holds_any_role(&roles, &[5]));
        assert!(!holds_any_role(&roles, &[]));
    }
}
