//! Points, tiers and rank-role bookkeeping shared by every command that
//! touches a member's standing.
//!
//! Everything in this crate is synchronous and free of I/O. Callers load a
//! record, run it through these functions, persist the result and apply the
//! computed role operations themselves.

pub mod error;
pub mod leaderboard;
pub mod points;
pub mod progress;
pub mod rank;
pub mod roles;
pub mod table;

pub use error::LevelingError;
pub use leaderboard::{LeaderboardEntry, LeaderboardKind, MAX_PAGE_SIZE, Page, PagePlan, page};
pub use points::{PointsAction, Tally, apply_action, apply_points};
pub use progress::{BAR_SEGMENTS, Progress, render_progress};
pub use rank::{compute_rank, rank_from_count};
pub use roles::{RoleReconciliation, TierRoleMapping, reconcile_tier_role};
pub use table::{
    LevelResolution, LevelTable, LevelThreshold, TierChange, UNCONFIGURED_LEVEL_NAME, resolve_level,
};
