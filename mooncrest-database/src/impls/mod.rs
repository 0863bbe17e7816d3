pub mod assistant_chat;
pub mod assistant_settings;
pub mod metadata;
pub mod rate_limit;
pub mod users;

use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}
