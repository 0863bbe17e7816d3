use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobloxUser {
    pub id: u64,
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

impl RobloxUser {
    /// Nickname format applied on verification: `Display (@name)`.
    pub fn nickname(&self) -> String {
        format!("{} (@{})", self.display_name, self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub name: String,
    #[serde(rename = "memberCount")]
    pub member_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupMembership {
    pub group_id: u64,
    pub role_name: String,
    pub rank: u32,
}

/// A Discord account linked through the RoVer registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoverLink {
    pub roblox_id: u64,
    pub roblox_username: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct UsernameLookupRequest<'a> {
    pub usernames: [&'a str; 1],
    #[serde(rename = "excludeBannedUsers")]
    pub exclude_banned_users: bool,
}

#[derive(Deserialize)]
pub(crate) struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Deserialize)]
pub(crate) struct Headshot {
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct GroupRoleEntry {
    pub group: GroupRef,
    pub role: RoleRef,
}

#[derive(Deserialize)]
pub(crate) struct GroupRef {
    pub id: u64,
}

#[derive(Deserialize)]
pub(crate) struct RoleRef {
    pub name: String,
    #[serde(default)]
    pub rank: u32,
}

#[derive(Deserialize)]
pub(crate) struct RoverResponse {
    #[serde(rename = "robloxId")]
    pub roblox_id: Option<u64>,
    #[serde(rename = "cachedUsername")]
    pub cached_username: Option<String>,
}

pub(crate) fn membership_in(group_id: u64, entries: Vec<GroupRoleEntry>) -> Option<GroupMembership> {
    entries
        .into_iter()
        .find(|entry| entry.group.id == group_id)
        .map(|entry| GroupMembership {
            group_id,
            role_name: entry.role.name,
            rank: entry.role.rank,
        })
}

impl RoverResponse {
    pub(crate) fn into_link(self) -> Option<RoverLink> {
        self.roblox_id.map(|roblox_id| RoverLink {
            roblox_id,
            roblox_username: self.cached_username,
        })
    }
}
