//! Thin client for the public Roblox web APIs (and the optional RoVer
//! registry) used for account linking and profile lookups.

mod client;
pub mod model;

pub use client::{RobloxClient, RobloxError};
pub use model::{GroupInfo, GroupMembership, RobloxUser, RoverLink};

pub fn profile_url(user_id: u64) -> String {
    format!("https://www.roblox.com/users/{user_id}/profile")
}

pub fn group_url(group_id: u64) -> String {
    format!("https://www.roblox.com/groups/{group_id}")
}
