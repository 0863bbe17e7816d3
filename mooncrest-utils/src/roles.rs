use mooncrest_leveling::RoleReconciliation;
use poise::serenity_prelude as serenity;
use tracing::{debug, warn};

/// Role ids a member currently holds, as plain integers.
pub fn member_role_ids(member: &serenity::Member) -> Vec<u64> {
    member.roles.iter().map(|role_id| role_id.get()).collect()
}

/// Every non-bot member holding `role_id`, fetched page by page.
pub async fn members_with_role(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    role_id: serenity::RoleId,
) -> anyhow::Result<Vec<serenity::UserId>> {
    const PAGE_SIZE: u64 = 1000;

    let mut out = Vec::new();
    let mut after: Option<serenity::UserId> = None;

    loop {
        let page = guild_id.members(http, Some(PAGE_SIZE), after).await?;
        let fetched = page.len();

        out.extend(
            page.iter()
                .filter(|member| !member.user.bot && member.roles.contains(&role_id))
                .map(|member| member.user.id),
        );

        match page.last() {
            Some(last) if fetched as u64 == PAGE_SIZE => after = Some(last.user.id),
            _ => break,
        }
    }

    Ok(out)
}

/// Apply a computed reconciliation to a member: removals first, then the
/// single addition. A no-op plan makes no API calls.
pub async fn apply_role_reconciliation(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    plan: &RoleReconciliation<u64>,
    reason: &str,
) -> anyhow::Result<()> {
    if plan.is_noop() {
        debug!(user_id = user_id.get(), "roles already reconciled");
        return Ok(());
    }

    for role_id in &plan.to_remove {
        if let Err(err) = http
            .remove_member_role(guild_id, user_id, serenity::RoleId::new(*role_id), Some(reason))
            .await
        {
            warn!(?err, user_id = user_id.get(), role_id, "failed to remove tier role");
            return Err(err.into());
        }
    }

    if let Some(role_id) = plan.to_add {
        http.add_member_role(guild_id, user_id, serenity::RoleId::new(role_id), Some(reason))
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use mooncrest_leveling::reconcile_tier_role;

    #[test]
    fn plan_targets_only_the_dimension() {
        let dimension = BTreeSet::from([1_u64, 2, 3]);
        let plan = reconcile_tier_role([1_u64, 99], Some(3), &dimension);

        assert_eq!(plan.to_remove, BTreeSet::from([1]));
        assert_eq!(plan.to_add, Some(3));
    }
}
