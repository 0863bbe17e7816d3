use serde::{Deserialize, Deserializer, Serialize};

use crate::error::LevelingError;

/// Display name used wherever a ladder has no tiers configured.
pub const UNCONFIGURED_LEVEL_NAME: &str = "N/A";

/// One rung of a tier ladder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelThreshold {
    pub name: String,
    pub min_points: i64,
    /// Discord role granted while a member sits on this tier, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<u64>,
}

impl LevelThreshold {
    pub fn new(name: impl Into<String>, min_points: i64) -> Self {
        Self {
            name: name.into(),
            min_points,
            role_id: None,
        }
    }

    pub fn with_role(mut self, role_id: u64) -> Self {
        self.role_id = Some(role_id);
        self
    }
}

/// Ordered threshold table, validated on construction.
///
/// Entries are sorted ascending by `min_points` and names are unique. An
/// empty table is valid and resolves to [`LevelResolution::Unconfigured`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LevelTable {
    thresholds: Vec<LevelThreshold>,
}

impl LevelTable {
    pub fn new(thresholds: Vec<LevelThreshold>) -> Result<Self, LevelingError> {
        for (index, threshold) in thresholds.iter().enumerate() {
            if threshold.name.trim().is_empty() {
                return Err(LevelingError::invalid(format!(
                    "level #{} has an empty name",
                    index + 1
                )));
            }

            if threshold.min_points < 0 {
                return Err(LevelingError::invalid(format!(
                    "level `{}` has negative min_points {}",
                    threshold.name, threshold.min_points
                )));
            }

            if thresholds[..index]
                .iter()
                .any(|earlier| earlier.name == threshold.name)
            {
                return Err(LevelingError::invalid(format!(
                    "level name `{}` appears more than once",
                    threshold.name
                )));
            }

            if let Some(previous) = index.checked_sub(1).map(|prev| &thresholds[prev])
                && previous.min_points > threshold.min_points
            {
                return Err(LevelingError::invalid(format!(
                    "level `{}` ({}) is below the preceding level `{}` ({})",
                    threshold.name, threshold.min_points, previous.name, previous.min_points
                )));
            }
        }

        Ok(Self { thresholds })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn thresholds(&self) -> &[LevelThreshold] {
        &self.thresholds
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.thresholds.iter().position(|entry| entry.name == name)
    }
}

impl<'de> Deserialize<'de> for LevelTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let thresholds = Vec::<LevelThreshold>::deserialize(deserializer)?;
        LevelTable::new(thresholds).map_err(serde::de::Error::custom)
    }
}

/// Outcome of [`resolve_level`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelResolution<'a> {
    /// The table is empty; displayed as "N/A".
    Unconfigured,
    Tier {
        index: usize,
        current: &'a LevelThreshold,
        next: Option<&'a LevelThreshold>,
    },
}

impl<'a> LevelResolution<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            LevelResolution::Unconfigured => UNCONFIGURED_LEVEL_NAME,
            LevelResolution::Tier { current, .. } => current.name.as_str(),
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            LevelResolution::Unconfigured => None,
            LevelResolution::Tier { index, .. } => Some(*index),
        }
    }

    pub fn current(&self) -> Option<&'a LevelThreshold> {
        match self {
            LevelResolution::Unconfigured => None,
            LevelResolution::Tier { current, .. } => Some(current),
        }
    }

    pub fn next(&self) -> Option<&'a LevelThreshold> {
        match self {
            LevelResolution::Unconfigured => None,
            LevelResolution::Tier { next, .. } => *next,
        }
    }

    pub fn role_id(&self) -> Option<u64> {
        self.current().and_then(|threshold| threshold.role_id)
    }

    pub fn is_max(&self) -> bool {
        matches!(self, LevelResolution::Tier { next: None, .. })
    }
}

/// Resolve the tier a point total sits on.
///
/// Single forward pass: the last threshold whose `min_points` is at or below
/// `points` wins and the scan stops at the first one above it. Totals below
/// the first entry still land on the first tier.
pub fn resolve_level(points: i64, table: &LevelTable) -> LevelResolution<'_> {
    let thresholds = table.thresholds();
    if thresholds.is_empty() {
        return LevelResolution::Unconfigured;
    }

    let mut index = 0;
    for (candidate, threshold) in thresholds.iter().enumerate() {
        if threshold.min_points <= points {
            index = candidate;
        } else {
            break;
        }
    }

    LevelResolution::Tier {
        index,
        current: &thresholds[index],
        next: thresholds.get(index + 1),
    }
}

/// Tier movement between two resolutions of the same table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TierChange {
    Unchanged,
    Promoted { from: String, to: String },
    Demoted { from: String, to: String },
}

impl TierChange {
    pub fn between(before: &LevelResolution<'_>, after: &LevelResolution<'_>) -> Self {
        let (Some(old_index), Some(new_index)) = (before.index(), after.index()) else {
            return TierChange::Unchanged;
        };

        let from = before.name().to_owned();
        let to = after.name().to_owned();

        match new_index.cmp(&old_index) {
            std::cmp::Ordering::Equal => TierChange::Unchanged,
            std::cmp::Ordering::Greater => TierChange::Promoted { from, to },
            std::cmp::Ordering::Less => TierChange::Demoted { from, to },
        }
    }

    pub fn is_changed(&self) -> bool {
        !matches!(self, TierChange::Unchanged)
    }

    /// Name of the tier the member ended on, when it changed.
    pub fn new_tier(&self) -> Option<&str> {
        match self {
            TierChange::Unchanged => None,
            TierChange::Promoted { to, .. } | TierChange::Demoted { to, .. } => Some(to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        LevelResolution, LevelTable, LevelThreshold, TierChange, UNCONFIGURED_LEVEL_NAME,
        resolve_level,
    };

    fn summit_table() -> LevelTable {
        LevelTable::new(vec![
            LevelThreshold::new("Novice", 0),
            LevelThreshold::new("Explorer", 100),
            LevelThreshold::new("Summiteer", 500),
        ])
        .unwrap()
    }

    #[test]
    fn resolves_middle_tier_with_next() {
        let table = summit_table();
        let resolved = resolve_level(250, &table);

        assert_eq!(resolved.name(), "Explorer");
        assert_eq!(resolved.index(), Some(1));
        assert_eq!(resolved.next().map(|t| t.name.as_str()), Some("Summiteer"));
        assert!(!resolved.is_max());
    }

    #[test]
    fn exact_threshold_belongs_to_that_tier() {
        let table = summit_table();
        assert_eq!(resolve_level(100, &table).name(), "Explorer");
        assert_eq!(resolve_level(99, &table).name(), "Novice");
        assert_eq!(resolve_level(500, &table).name(), "Summiteer");
    }

    #[test]
    fn last_tier_has_no_next() {
        let table = summit_table();
        let resolved = resolve_level(10_000, &table);
        assert_eq!(resolved.name(), "Summiteer");
        assert!(resolved.next().is_none());
        assert!(resolved.is_max());
    }

    #[test]
    fn empty_table_is_unconfigured() {
        let table = LevelTable::empty();
        let resolved = resolve_level(42, &table);
        assert_eq!(resolved, LevelResolution::Unconfigured);
        assert_eq!(resolved.name(), UNCONFIGURED_LEVEL_NAME);
        assert_eq!(resolved.role_id(), None);
    }

    #[test]
    fn totals_below_first_threshold_use_first_tier() {
        let table = LevelTable::new(vec![
            LevelThreshold::new("Recruit", 10),
            LevelThreshold::new("Ranger", 20),
        ])
        .unwrap();
        assert_eq!(resolve_level(3, &table).name(), "Recruit");
    }

    #[test]
    fn every_total_resolves_to_exactly_one_bracketing_tier() {
        let table = summit_table();
        for points in 0..700 {
            let resolved = resolve_level(points, &table);
            let current = resolved.current().unwrap();
            assert!(current.min_points <= points);
            if let Some(next) = resolved.next() {
                assert!(next.min_points > points);
            }
        }
    }

    #[test]
    fn resolution_is_monotonic() {
        let table = summit_table();
        let mut previous = 0;
        for points in 0..700 {
            let index = resolve_level(points, &table).index().unwrap();
            assert!(index >= previous, "index fell at {points}");
            previous = index;
        }
    }

    #[test]
    fn rejects_unsorted_tables() {
        let result = LevelTable::new(vec![
            LevelThreshold::new("High", 100),
            LevelThreshold::new("Low", 0),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_duplicate_names_and_negative_thresholds() {
        assert!(
            LevelTable::new(vec![
                LevelThreshold::new("Same", 0),
                LevelThreshold::new("Same", 10),
            ])
            .is_err()
        );
        assert!(LevelTable::new(vec![LevelThreshold::new("Below", -1)]).is_err());
        assert!(LevelTable::new(vec![LevelThreshold::new("  ", 0)]).is_err());
    }

    #[test]
    fn deserializes_and_validates_json() {
        let table: LevelTable = serde_json::from_str(
            r#"[{"name":"Novice","min_points":0},{"name":"Explorer","min_points":100,"role_id":42}]"#,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(resolve_level(150, &table).role_id(), Some(42));

        let broken = serde_json::from_str::<LevelTable>(
            r#"[{"name":"B","min_points":50},{"name":"A","min_points":0}]"#,
        );
        assert!(broken.is_err());
    }

    #[test]
    fn tier_change_detects_direction() {
        let table = summit_table();
        let novice = resolve_level(0, &table);
        let explorer = resolve_level(120, &table);

        assert_eq!(TierChange::between(&novice, &novice), TierChange::Unchanged);
        assert_eq!(
            TierChange::between(&novice, &explorer),
            TierChange::Promoted {
                from: "Novice".to_owned(),
                to: "Explorer".to_owned()
            }
        );
        let demoted = TierChange::between(&explorer, &novice);
        assert!(demoted.is_changed());
        assert_eq!(demoted.new_tier(), Some("Novice"));
    }
}
