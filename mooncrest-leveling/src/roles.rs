use std::collections::{BTreeMap, BTreeSet};

use crate::table::{LevelResolution, LevelTable};

/// Tier name to role id for one mutually exclusive ladder, plus the full set
/// of role ids that belong to it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TierRoleMapping {
    by_tier: BTreeMap<String, u64>,
    dimension: BTreeSet<u64>,
}

impl TierRoleMapping {
    pub fn from_table(table: &LevelTable) -> Self {
        Self::from_pairs(table.thresholds().iter().filter_map(|threshold| {
            threshold
                .role_id
                .map(|role_id| (threshold.name.clone(), role_id))
        }))
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, u64)>) -> Self {
        let by_tier: BTreeMap<String, u64> = pairs.into_iter().collect();
        let dimension = by_tier.values().copied().collect();
        Self { by_tier, dimension }
    }

    pub fn role_for_tier(&self, tier_name: &str) -> Option<u64> {
        self.by_tier.get(tier_name).copied()
    }

    /// Role the member should hold for `resolved`; `None` when the tier has
    /// no mapped role or the ladder is unconfigured.
    pub fn desired_role(&self, resolved: &LevelResolution<'_>) -> Option<u64> {
        match resolved {
            LevelResolution::Unconfigured => None,
            LevelResolution::Tier { current, .. } => self.role_for_tier(&current.name),
        }
    }

    pub fn dimension(&self) -> &BTreeSet<u64> {
        &self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.dimension.is_empty()
    }

    pub fn reconcile(
        &self,
        current_role_ids: impl IntoIterator<Item = u64>,
        resolved: &LevelResolution<'_>,
    ) -> RoleReconciliation<u64> {
        reconcile_tier_role(current_role_ids, self.desired_role(resolved), &self.dimension)
    }
}

/// Role operations that bring a member to exactly one role of a dimension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleReconciliation<R: Ord> {
    pub to_remove: BTreeSet<R>,
    pub to_add: Option<R>,
}

impl<R: Ord> RoleReconciliation<R> {
    pub fn is_noop(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_none()
    }
}

/// `to_remove = current ∩ dimension \ {desired}`, `to_add = desired` unless
/// already held. Apply removals first, then the addition.
pub fn reconcile_tier_role<R>(
    current_role_ids: impl IntoIterator<Item = R>,
    desired_role_id: Option<R>,
    dimension_role_ids: &BTreeSet<R>,
) -> RoleReconciliation<R>
where
    R: Ord + Copy,
{
    let current: BTreeSet<R> = current_role_ids.into_iter().collect();

    let to_remove = current
        .iter()
        .filter(|role_id| dimension_role_ids.contains(role_id))
        .filter(|role_id| Some(**role_id) != desired_role_id)
        .copied()
        .collect();

    let to_add = desired_role_id.filter(|role_id| !current.contains(role_id));

    RoleReconciliation { to_remove, to_add }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::{RoleReconciliation, TierRoleMapping, reconcile_tier_role};
    use crate::table::{LevelResolution, LevelTable, LevelThreshold, resolve_level};

    fn set(items: &[&'static str]) -> BTreeSet<&'static str> {
        items.iter().copied().collect()
    }

    fn apply(current: &BTreeSet<&'static str>, ops: &RoleReconciliation<&'static str>) -> BTreeSet<&'static str> {
        let mut next: BTreeSet<_> = current.difference(&ops.to_remove).copied().collect();
        next.extend(ops.to_add);
        next
    }

    #[test]
    fn swaps_stale_tier_roles_for_the_desired_one() {
        let ops = reconcile_tier_role(set(&["A", "B", "X"]), Some("C"), &set(&["A", "B", "C"]));
        assert_eq!(ops.to_remove, set(&["A", "B"]));
        assert_eq!(ops.to_add, Some("C"));
    }

    #[test]
    fn keeps_the_desired_role_when_already_held() {
        let ops = reconcile_tier_role(set(&["B", "C"]), Some("C"), &set(&["A", "B", "C"]));
        assert_eq!(ops.to_remove, set(&["B"]));
        assert_eq!(ops.to_add, None);
    }

    #[test]
    fn no_desired_role_only_removes() {
        let ops = reconcile_tier_role(set(&["A", "X"]), None, &set(&["A", "B"]));
        assert_eq!(ops.to_remove, set(&["A"]));
        assert_eq!(ops.to_add, None);
    }

    #[test]
    fn reconciliation_is_idempotent() {
        let dimension = set(&["A", "B", "C"]);
        let starts = [set(&[]), set(&["A"]), set(&["A", "B", "C", "X"]), set(&["C"])];
        for desired in [None, Some("A"), Some("C"), Some("Z")] {
            for start in &starts {
                let first = reconcile_tier_role(start.iter().copied(), desired, &dimension);
                let after = apply(start, &first);
                let second = reconcile_tier_role(after.iter().copied(), desired, &dimension);
                assert!(second.is_noop(), "not idempotent for {start:?} -> {desired:?}");

                let held = after.intersection(&dimension).count();
                assert!(held <= 1);
            }
        }
    }

    #[test]
    fn mapping_from_table_skips_unmapped_tiers() {
        let table = LevelTable::new(vec![
            LevelThreshold::new("Novice", 0),
            LevelThreshold::new("Explorer", 100).with_role(11),
            LevelThreshold::new("Summiteer", 500).with_role(12),
        ])
        .unwrap();
        let mapping = TierRoleMapping::from_table(&table);

        assert_eq!(mapping.dimension().len(), 2);
        assert_eq!(mapping.desired_role(&resolve_level(50, &table)), None);
        assert_eq!(mapping.desired_role(&resolve_level(600, &table)), Some(12));
        assert_eq!(mapping.desired_role(&LevelResolution::Unconfigured), None);

        let ops = mapping.reconcile([11, 99], &resolve_level(600, &table));
        assert_eq!(ops.to_remove, BTreeSet::from([11]));
        assert_eq!(ops.to_add, Some(12));
    }
}
