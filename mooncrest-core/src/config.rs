use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context as _, bail};
use mooncrest_leveling::{LevelTable, TierRoleMapping};
use serde::{Deserialize, Deserializer};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Fallback when `embed_color` is absent.
const DEFAULT_COLOR: u32 = 0x5B_6E_E1;

/// A secondary tier ladder, e.g. the guide or search-and-rescue ranks.
#[derive(Clone, Debug, Deserialize)]
pub struct DepartmentConfig {
    pub label: String,
    #[serde(default)]
    pub levels: LevelTable,
    /// Roles allowed to edit this ladder besides administrators.
    #[serde(default)]
    pub manager_roles: Vec<u64>,
}

impl DepartmentConfig {
    pub fn role_mapping(&self) -> TierRoleMapping {
        TierRoleMapping::from_table(&self.levels)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Achievement {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Static community configuration, loaded once at startup.
#[derive(Clone, Debug, Deserialize)]
pub struct BotConfig {
    pub group_id: u64,
    #[serde(default = "default_color", deserialize_with = "deserialize_color")]
    pub embed_color: u32,
    #[serde(default)]
    pub levels: LevelTable,
    #[serde(default)]
    pub departments: BTreeMap<String, DepartmentConfig>,
    #[serde(default)]
    pub achievements: Vec<Achievement>,
    #[serde(default)]
    pub xp_manager_roles: Vec<u64>,
    #[serde(default)]
    pub reward_manager_roles: Vec<u64>,
    #[serde(default)]
    pub stats_roles: Vec<u64>,
    #[serde(default)]
    pub event_manager_roles: Vec<u64>,
    #[serde(default)]
    pub link_manager_roles: Vec<u64>,
    /// Roblox group role name to Discord role, used by `getrole`.
    #[serde(default)]
    pub rank_to_role_mapping: BTreeMap<String, u64>,
    #[serde(default)]
    pub xp_log_channel_id: Option<u64>,
    #[serde(default)]
    pub reward_log_channel_id: Option<u64>,
    #[serde(default)]
    pub event_log_channel_id: Option<u64>,
    #[serde(default)]
    pub verification_log_channel_id: Option<u64>,
    #[serde(default)]
    pub milestone_channel_id: Option<u64>,
    #[serde(default)]
    pub verified_role_id: Option<u64>,
    #[serde(default)]
    pub member_count_milestones: Vec<u64>,
}

impl BotConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read bot config at {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid bot config at {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let mut config: Self = serde_json::from_str(raw)?;
        config.normalize()?;
        Ok(config)
    }

    fn normalize(&mut self) -> anyhow::Result<()> {
        if self.group_id == 0 {
            bail!("group_id must be set");
        }

        let mut seen = BTreeSet::new();
        for achievement in &self.achievements {
            if !seen.insert(achievement.id) {
                bail!("duplicate achievement id {}", achievement.id);
            }
        }

        for name in self.departments.keys() {
            if name.is_empty() || name.chars().any(|ch| !ch.is_ascii_lowercase()) {
                bail!("department key `{name}` must be lowercase ascii letters");
            }
        }

        self.member_count_milestones.sort_unstable();
        self.member_count_milestones.dedup();
        Ok(())
    }

    pub fn rank_roles(&self) -> TierRoleMapping {
        TierRoleMapping::from_table(&self.levels)
    }

    pub fn group_rank_roles(&self) -> TierRoleMapping {
        TierRoleMapping::from_pairs(
            self.rank_to_role_mapping
                .iter()
                .map(|(name, role_id)| (name.clone(), *role_id)),
        )
    }

    /// Summit guide counts log here, or in the XP log when unset.
    pub fn event_log_channel(&self) -> Option<u64> {
        self.event_log_channel_id.or(self.xp_log_channel_id)
    }

    pub fn department(&self, key: &str) -> Option<&DepartmentConfig> {
        self.departments.get(key)
    }

    pub fn achievement(&self, id: i64) -> Option<&Achievement> {
        self.achievements.iter().find(|achievement| achievement.id == id)
    }

    /// First configured milestone above the last one announced.
    pub fn next_milestone(&self, last_announced: u64) -> Option<u64> {
        self.member_count_milestones
            .iter()
            .copied()
            .find(|milestone| *milestone > last_announced)
    }
}

fn default_color() -> u32 {
    DEFAULT_COLOR
}

/// Accepts `6000097`, `"#5B6EE1"` or `"0x5B6EE1"`.
fn deserialize_color<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => {
            let trimmed = text.trim();
            let hex = trimmed
                .strip_prefix('#')
                .or_else(|| trimmed.strip_prefix("0x"))
                .unwrap_or(trimmed);
            u32::from_str_radix(hex, 16)
                .map_err(|_| serde::de::Error::custom(format!("invalid embed color `{text}`")))
        }
    }
}

#[cfg(test)]
mod tests {
    use mooncrest_leveling::resolve_level;

    use super::BotConfig;

    const SAMPLE: &str = r##"{
        "group_id": 42,
        "embed_color": "#5B6EE1",
        "levels": [
            { "name": "Scout", "min_points": 0, "role_id": 100 },
            { "name": "Ranger", "min_points": 200, "role_id": 101 },
            { "name": "Warden", "min_points": 500 }
        ],
        "departments": {
            "guide": {
                "label": "Summit Guide",
                "levels": [{ "name": "Trainee", "min_points": 0, "role_id": 300 }],
                "manager_roles": [9]
            }
        },
        "achievements": [{ "id": 1, "name": "First Summit" }],
        "member_count_milestones": [1000, 500, 1000],
        "rank_to_role_mapping": { "Explorer": 700, "Captain": 701 },
        "xp_log_channel_id": 55
    }"##;

    #[test]
    fn parses_a_full_config() {
        let config = BotConfig::from_json(SAMPLE).unwrap();

        assert_eq!(config.embed_color, 0x5B6EE1);
        assert_eq!(config.levels.len(), 3);
        assert_eq!(resolve_level(250, &config.levels).name(), "Ranger");
        assert_eq!(config.rank_roles().dimension().len(), 2);
        assert_eq!(config.department("guide").unwrap().label, "Summit Guide");
        assert_eq!(config.achievement(1).unwrap().name, "First Summit");
        assert!(config.verified_role_id.is_none());
    }

    #[test]
    fn group_rank_roles_and_event_log_fallback() {
        let mut config = BotConfig::from_json(SAMPLE).unwrap();

        let mapping = config.group_rank_roles();
        assert_eq!(mapping.role_for_tier("Captain"), Some(701));
        assert_eq!(mapping.role_for_tier("Guest"), None);
        assert_eq!(mapping.dimension().len(), 2);

        assert_eq!(config.event_log_channel(), Some(55));
        config.event_log_channel_id = Some(66);
        assert_eq!(config.event_log_channel(), Some(66));
    }

    #[test]
    fn milestones_are_sorted_and_walked_in_order() {
        let config = BotConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.member_count_milestones, vec![500, 1000]);
        assert_eq!(config.next_milestone(0), Some(500));
        assert_eq!(config.next_milestone(500), Some(1000));
        assert_eq!(config.next_milestone(1000), None);
    }

    #[test]
    fn unordered_levels_fail_to_load() {
        let raw = r#"{"group_id": 1, "levels": [
            { "name": "B", "min_points": 10 },
            { "name": "A", "min_points": 0 }
        ]}"#;
        assert!(BotConfig::from_json(raw).is_err());
    }

    #[test]
    fn duplicate_achievements_fail_to_load() {
        let raw = r#"{"group_id": 1, "achievements": [
            { "id": 1, "name": "A" }, { "id": 1, "name": "B" }
        ]}"#;
        assert!(BotConfig::from_json(raw).is_err());
    }

    #[test]
    fn minimal_config_is_unconfigured_but_valid() {
        let config = BotConfig::from_json(r#"{"group_id": 7, "embed_color": 255}"#).unwrap();
        assert_eq!(config.embed_color, 255);
        assert!(config.levels.is_empty());
        assert!(config.rank_roles().is_empty());
    }
}
