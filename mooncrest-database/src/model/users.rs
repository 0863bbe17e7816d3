use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use mooncrest_leveling::Tally;

/// A community member keyed by their Roblox account id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub roblox_id: u64,
    pub roblox_username: String,
    pub discord_id: Option<u64>,
    pub is_verified: bool,
    pub points: i64,
    pub expeditions: i64,
    /// Event counter kept apart from points and expeditions.
    #[serde(default)]
    pub summit_guides: i64,
    pub department_points: BTreeMap<String, i64>,
    pub achievements: BTreeSet<i64>,
}

impl UserRecord {
    /// Fresh record for an account seen for the first time.
    pub fn new(roblox_id: u64, roblox_username: impl Into<String>) -> Self {
        Self {
            roblox_id,
            roblox_username: roblox_username.into(),
            discord_id: None,
            is_verified: false,
            points: 0,
            expeditions: 0,
            summit_guides: 0,
            department_points: BTreeMap::new(),
            achievements: BTreeSet::new(),
        }
    }

    pub fn is_linked(&self) -> bool {
        self.is_verified && self.discord_id.is_some()
    }

    pub fn tally(&self) -> Tally {
        Tally::new(self.points, self.expeditions)
    }

    pub fn set_tally(&mut self, tally: Tally) {
        self.points = tally.points;
        self.expeditions = tally.expeditions;
    }

    pub fn department_points(&self, department: &str) -> i64 {
        self.department_points.get(department).copied().unwrap_or(0)
    }

    pub fn set_department_points(&mut self, department: &str, points: i64) {
        self.department_points.insert(department.to_owned(), points.max(0));
    }

    pub fn link_discord(&mut self, discord_id: u64) {
        self.discord_id = Some(discord_id);
        self.is_verified = true;
    }

    pub fn unlink_discord(&mut self) {
        self.discord_id = None;
        self.is_verified = false;
    }
}
