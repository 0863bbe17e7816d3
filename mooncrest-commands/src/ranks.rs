use poise::serenity_prelude as serenity;
use tracing::debug;

use mooncrest_database::model::users::UserRecord;
use mooncrest_leveling::{
    LevelResolution, LevelTable, LevelingError, PointsAction, TierChange, TierRoleMapping,
    apply_action, apply_points, reconcile_tier_role, resolve_level,
};
use mooncrest_utils::roles::{apply_role_reconciliation, member_role_ids};

/// Apply a main-ladder action to a record and report the tier movement.
pub fn apply_main_points(
    record: &mut UserRecord,
    levels: &LevelTable,
    action: PointsAction,
    amount: i64,
) -> Result<TierChange, LevelingError> {
    let before = record.tally();
    let after = apply_action(before, action, amount)?;
    record.set_tally(after);

    Ok(TierChange::between(
        &resolve_level(before.points, levels),
        &resolve_level(after.points, levels),
    ))
}

/// Same as [`apply_main_points`] for one department ladder.
pub fn apply_department_points(
    record: &mut UserRecord,
    department: &str,
    levels: &LevelTable,
    action: PointsAction,
    amount: i64,
) -> Result<TierChange, LevelingError> {
    let before = record.department_points(department);
    let after = apply_points(before, action, amount)?;
    record.set_department_points(department, after);

    Ok(TierChange::between(
        &resolve_level(before, levels),
        &resolve_level(after, levels),
    ))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleSyncOutcome {
    NotInGuild,
    AlreadyCorrect,
    /// Roles were changed; `granted` is the role added or kept for the tier.
    Updated { granted: Option<u64> },
}

impl RoleSyncOutcome {
    /// Suffix for level-up messages.
    pub fn note(&self) -> String {
        match self {
            RoleSyncOutcome::NotInGuild => "(Not in this server)".to_owned(),
            RoleSyncOutcome::AlreadyCorrect => "(Role already correct)".to_owned(),
            RoleSyncOutcome::Updated {
                granted: Some(role_id),
            } => format!("(Role: <@&{role_id}>)"),
            RoleSyncOutcome::Updated { granted: None } => "(No role mapped)".to_owned(),
        }
    }
}

/// Discord answered "Unknown Member": the user is not in the guild.
pub fn is_unknown_member_error(source: &serenity::Error) -> bool {
    matches!(
        source,
        serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response))
            if response.status_code.as_u16() == 404 || response.error.code == 10007
    )
}

/// Bring a member's roles for one ladder in line with `resolved`.
pub async fn sync_ladder_role(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    mapping: &TierRoleMapping,
    resolved: &LevelResolution<'_>,
    reason: &str,
) -> anyhow::Result<RoleSyncOutcome> {
    sync_mapped_role(
        http,
        guild_id,
        user_id,
        mapping,
        mapping.desired_role(resolved),
        reason,
    )
    .await
}

/// Leave the member holding exactly `desired` out of the mapping's roles.
pub async fn sync_mapped_role(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    user_id: serenity::UserId,
    mapping: &TierRoleMapping,
    desired: Option<u64>,
    reason: &str,
) -> anyhow::Result<RoleSyncOutcome> {
    let member = match guild_id.member(http, user_id).await {
        Ok(member) => member,
        Err(err) if is_unknown_member_error(&err) => {
            debug!(user_id = user_id.get(), "member left before role sync");
            return Ok(RoleSyncOutcome::NotInGuild);
        }
        Err(err) => return Err(err.into()),
    };

    let plan = reconcile_tier_role(member_role_ids(&member), desired, mapping.dimension());
    if plan.is_noop() {
        return Ok(RoleSyncOutcome::AlreadyCorrect);
    }

    apply_role_reconciliation(http, guild_id, user_id, &plan, reason).await?;

    Ok(RoleSyncOutcome::Updated { granted: desired })
}

/// Reconcile the main rank role of a linked user from their stored points.
pub async fn sync_rank_role(
    http: &serenity::Http,
    guild_id: serenity::GuildId,
    record: &UserRecord,
    levels: &LevelTable,
    reason: &str,
) -> anyhow::Result<Option<RoleSyncOutcome>> {
    let Some(discord_id) = record.discord_id.filter(|_| record.is_verified) else {
        return Ok(None);
    };

    let mapping = TierRoleMapping::from_table(levels);
    let resolved = resolve_level(record.points, levels);
    sync_ladder_role(
        http,
        guild_id,
        serenity::UserId::new(discord_id),
        &mapping,
        &resolved,
        reason,
    )
    .await
    .map(Some)
}

/// ` 🎉 **name** has leveled up to Tier!` style suffix, empty when unchanged.
pub fn tier_change_message(name: &str, change: &TierChange) -> String {
    match change {
        TierChange::Unchanged => String::new(),
        TierChange::Promoted { to, .. } => format!(" 🎉 **{name} has leveled up to {to}!**"),
        TierChange::Demoted { to, .. } => format!(" 📉 **{name} has dropped to {to}.**"),
    }
}

#[cfg(test)]
mod tests {
    use mooncrest_database::model::users::UserRecord;
    use mooncrest_leveling::{LevelTable, LevelThreshold, PointsAction, TierChange};

    use poise::serenity_prelude as serenity;

    use super::{
        RoleSyncOutcome, apply_department_points, apply_main_points, is_unknown_member_error,
        tier_change_message,
    };

    fn ladder() -> LevelTable {
        LevelTable::new(vec![
            LevelThreshold::new("Scout", 0).with_role(1),
            LevelThreshold::new("Ranger", 200).with_role(2),
            LevelThreshold::new("Warden", 500),
        ])
        .unwrap()
    }

    #[test]
    fn main_points_detect_promotion() {
        let mut record = UserRecord::new(1, "climber");
        record.points = 150;

        let change = apply_main_points(&mut record, &ladder(), PointsAction::Add, 100).unwrap();

        assert_eq!(record.points, 250);
        assert_eq!(record.expeditions, 1);
        assert_eq!(
            change,
            TierChange::Promoted {
                from: "Scout".to_owned(),
                to: "Ranger".to_owned()
            }
        );
    }

    #[test]
    fn negative_amounts_leave_the_record_alone() {
        let mut record = UserRecord::new(1, "climber");
        record.points = 40;

        assert!(apply_main_points(&mut record, &ladder(), PointsAction::Bonus, -5).is_err());
        assert_eq!(record.points, 40);
    }

    #[test]
    fn department_points_are_separate_from_main_points() {
        let mut record = UserRecord::new(1, "climber");
        record.points = 999;

        let change =
            apply_department_points(&mut record, "guide", &ladder(), PointsAction::Set, 500)
                .unwrap();

        assert_eq!(record.department_points("guide"), 500);
        assert_eq!(record.points, 999);
        assert_eq!(record.expeditions, 0);
        assert!(change.is_changed());
    }

    #[test]
    fn messages_describe_the_movement() {
        assert_eq!(tier_change_message("climber", &TierChange::Unchanged), "");
        assert!(
            tier_change_message(
                "climber",
                &TierChange::Demoted {
                    from: "Ranger".to_owned(),
                    to: "Scout".to_owned()
                }
            )
            .contains("dropped to Scout")
        );
        assert_eq!(
            RoleSyncOutcome::Updated { granted: None }.note(),
            "(No role mapped)"
        );
        assert_eq!(
            RoleSyncOutcome::Updated { granted: Some(7) }.note(),
            "(Role: <@&7>)"
        );
    }

    #[test]
    fn only_unknown_member_counts_as_absent() {
        assert!(!is_unknown_member_error(&serenity::Error::Other("gateway closed")));
        assert!(!is_unknown_member_error(&serenity::Error::Url(
            "https://discord.com/api".to_owned()
        )));
    }
}
