use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LevelingError;

/// Mutation applied to a point total.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointsAction {
    /// Adds points and counts one expedition.
    Add,
    /// Removes points and one expedition, both floored at zero.
    Remove,
    /// Overwrites the point total.
    Set,
    /// Adds points without counting an expedition.
    Bonus,
}

impl PointsAction {
    pub const ALL: [PointsAction; 4] = [
        PointsAction::Add,
        PointsAction::Remove,
        PointsAction::Set,
        PointsAction::Bonus,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PointsAction::Add => "add",
            PointsAction::Remove => "remove",
            PointsAction::Set => "set",
            PointsAction::Bonus => "bonus",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            PointsAction::Add => "Add",
            PointsAction::Remove => "Remove",
            PointsAction::Set => "Set",
            PointsAction::Bonus => "Bonus",
        }
    }

    /// Expedition counter movement for this action.
    pub fn expedition_delta(self) -> i64 {
        match self {
            PointsAction::Add => 1,
            PointsAction::Remove => -1,
            PointsAction::Set | PointsAction::Bonus => 0,
        }
    }
}

impl fmt::Display for PointsAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PointsAction {
    type Err = LevelingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        PointsAction::ALL
            .into_iter()
            .find(|action| action.as_str() == normalized)
            .ok_or_else(|| LevelingError::invalid(format!("unknown points action `{}`", raw.trim())))
    }
}

/// Point total plus the expedition counter that moves with add/remove.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub points: i64,
    pub expeditions: i64,
}

impl Tally {
    pub fn new(points: i64, expeditions: i64) -> Self {
        Self {
            points,
            expeditions,
        }
    }
}

/// Apply `action` to a points-only ladder (department ladders carry no
/// expedition counter).
pub fn apply_points(points: i64, action: PointsAction, amount: i64) -> Result<i64, LevelingError> {
    if amount < 0 {
        return Err(LevelingError::invalid(format!(
            "amount must not be negative (got {amount})"
        )));
    }

    let points = points.max(0);
    let updated = match action {
        PointsAction::Add | PointsAction::Bonus => points.saturating_add(amount),
        PointsAction::Remove => points.saturating_sub(amount).max(0),
        PointsAction::Set => amount,
    };

    Ok(updated)
}

/// Apply `action` to a full tally. Pure: the caller persists the result.
pub fn apply_action(tally: Tally, action: PointsAction, amount: i64) -> Result<Tally, LevelingError> {
    let points = apply_points(tally.points, action, amount)?;
    let expeditions = tally
        .expeditions
        .max(0)
        .saturating_add(action.expedition_delta())
        .max(0);

    Ok(Tally {
        points,
        expeditions,
    })
}

#[cfg(test)]
mod tests {
    use super::{PointsAction, Tally, apply_action, apply_points};
    use crate::error::LevelingError;

    #[test]
    fn add_counts_an_expedition() {
        let updated = apply_action(Tally::new(10, 2), PointsAction::Add, 15).unwrap();
        assert_eq!(updated, Tally::new(25, 3));
    }

    #[test]
    fn remove_floors_both_counters_at_zero() {
        let updated = apply_action(Tally::new(10, 0), PointsAction::Remove, 50).unwrap();
        assert_eq!(updated, Tally::new(0, 0));
    }

    #[test]
    fn remove_never_goes_negative() {
        for points in 0..20 {
            for expeditions in 0..3 {
                for amount in 0..40 {
                    let updated = apply_action(
                        Tally::new(points, expeditions),
                        PointsAction::Remove,
                        amount,
                    )
                    .unwrap();
                    assert!(updated.points >= 0);
                    assert!(updated.expeditions >= 0);
                }
            }
        }
    }

    #[test]
    fn set_and_bonus_leave_expeditions_alone() {
        let set = apply_action(Tally::new(80, 4), PointsAction::Set, 5).unwrap();
        assert_eq!(set, Tally::new(5, 4));

        let bonus = apply_action(Tally::new(80, 4), PointsAction::Bonus, 20).unwrap();
        assert_eq!(bonus, Tally::new(100, 4));
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let err = apply_action(Tally::new(1, 1), PointsAction::Add, -5).unwrap_err();
        assert!(matches!(err, LevelingError::InvalidArgument(_)));
        assert!(apply_points(1, PointsAction::Set, -1).is_err());
    }

    #[test]
    fn additions_saturate() {
        let updated = apply_points(i64::MAX - 1, PointsAction::Bonus, 10).unwrap();
        assert_eq!(updated, i64::MAX);
    }

    #[test]
    fn parses_actions_and_rejects_typos() {
        assert_eq!("add".parse::<PointsAction>().unwrap(), PointsAction::Add);
        assert_eq!(" Bonus ".parse::<PointsAction>().unwrap(), PointsAction::Bonus);
        assert!("ad".parse::<PointsAction>().is_err());
        assert_eq!(PointsAction::Remove.to_string(), "remove");
    }
}
