use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LevelingError;

/// Field a leaderboard is sorted by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardKind {
    #[default]
    Points,
    Expeditions,
}

impl LeaderboardKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LeaderboardKind::Points => "points",
            LeaderboardKind::Expeditions => "expeditions",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            LeaderboardKind::Points => "🌙 Lunar Points",
            LeaderboardKind::Expeditions => "Expeditions",
        }
    }

    pub fn other(self) -> Self {
        match self {
            LeaderboardKind::Points => LeaderboardKind::Expeditions,
            LeaderboardKind::Expeditions => LeaderboardKind::Points,
        }
    }
}

impl fmt::Display for LeaderboardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeaderboardKind {
    type Err = LevelingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "points" | "xp" | "lp" => Ok(LeaderboardKind::Points),
            "expeditions" | "expo" | "expedition" => Ok(LeaderboardKind::Expeditions),
            other => Err(LevelingError::invalid(format!(
                "unknown leaderboard `{other}`"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub display_name: String,
    pub sort_value: i64,
}

/// Largest page a single request may ask for.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Page bounds for one leaderboard request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PagePlan {
    /// 1-based page number after clamping into `[1, total_pages]`.
    pub page_number: u64,
    pub total_pages: u64,
    pub page_size: u64,
    pub offset: u64,
}

impl PagePlan {
    pub fn new(page_number: i64, page_size: u64, total_count: u64) -> Result<Self, LevelingError> {
        if page_size == 0 {
            return Err(LevelingError::invalid("page size must be greater than zero"));
        }
        if page_size > MAX_PAGE_SIZE {
            return Err(LevelingError::invalid(format!(
                "page size must be at most {MAX_PAGE_SIZE}"
            )));
        }

        let total_pages = total_count.div_ceil(page_size).max(1);
        let requested = u64::try_from(page_number.max(1)).unwrap_or(1);
        let page_number = requested.clamp(1, total_pages);
        let offset = (page_number - 1).saturating_mul(page_size);

        Ok(Self {
            page_number,
            total_pages,
            page_size,
            offset,
        })
    }

    /// Rank shown next to the first entry of this page.
    pub fn first_rank(&self) -> u64 {
        self.offset + 1
    }

    pub fn is_first(&self) -> bool {
        self.page_number == 1
    }

    pub fn is_last(&self) -> bool {
        self.page_number >= self.total_pages
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
    pub entries: Vec<T>,
    pub plan: PagePlan,
}

/// Compute page bounds and fetch the slice for them.
///
/// `fetch_slice(limit, offset)` owns ordering: sort field descending, then
/// primary key ascending. Entries are returned as fetched.
pub fn page<T, F>(
    page_number: i64,
    page_size: u64,
    total_count: u64,
    fetch_slice: F,
) -> Result<Page<T>, LevelingError>
where
    F: FnOnce(u64, u64) -> Vec<T>,
{
    let plan = PagePlan::new(page_number, page_size, total_count)?;
    let entries = fetch_slice(plan.page_size, plan.offset);
    Ok(Page { entries, plan })
}

#[cfg(test)]
mod tests {
    use super::{LeaderboardKind, MAX_PAGE_SIZE, PagePlan, page};

    #[test]
    fn clamps_pages_past_the_end() {
        let plan = PagePlan::new(5, 10, 25).unwrap();
        assert_eq!(plan.page_number, 3);
        assert_eq!(plan.total_pages, 3);
        assert_eq!(plan.offset, 20);
        assert_eq!(plan.first_rank(), 21);
        assert!(plan.is_last());
    }

    #[test]
    fn clamps_pages_below_one() {
        for requested in [0, -4, i64::MIN] {
            let plan = PagePlan::new(requested, 10, 25).unwrap();
            assert_eq!(plan.page_number, 1);
            assert_eq!(plan.offset, 0);
            assert!(plan.is_first());
        }
    }

    #[test]
    fn empty_boards_still_have_one_page() {
        let plan = PagePlan::new(3, 10, 0).unwrap();
        assert_eq!(plan.total_pages, 1);
        assert_eq!(plan.page_number, 1);
        assert!(plan.is_first() && plan.is_last());
    }

    #[test]
    fn exact_multiples_do_not_add_a_page() {
        assert_eq!(PagePlan::new(1, 10, 30).unwrap().total_pages, 3);
        assert_eq!(PagePlan::new(1, 10, 31).unwrap().total_pages, 4);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert!(PagePlan::new(1, 0, 10).is_err());
    }

    #[test]
    fn oversized_pages_are_rejected() {
        assert_eq!(PagePlan::new(1, MAX_PAGE_SIZE, 500).unwrap().page_size, MAX_PAGE_SIZE);
        assert!(PagePlan::new(1, MAX_PAGE_SIZE + 1, 500).is_err());
        assert!(PagePlan::new(1, u64::MAX, 500).is_err());
    }

    #[test]
    fn page_passes_bounds_to_the_fetcher() {
        let rows: Vec<u64> = (0..25).collect();
        let result = page(2, 10, rows.len() as u64, |limit, offset| {
            rows.iter()
                .skip(offset as usize)
                .take(limit as usize)
                .copied()
                .collect()
        })
        .unwrap();

        assert_eq!(result.plan.page_number, 2);
        assert_eq!(result.entries, (10..20).collect::<Vec<_>>());
    }

    #[test]
    fn parses_leaderboard_kinds() {
        assert_eq!("xp".parse::<LeaderboardKind>().unwrap(), LeaderboardKind::Points);
        assert_eq!("expo".parse::<LeaderboardKind>().unwrap(), LeaderboardKind::Expeditions);
        assert!("coins".parse::<LeaderboardKind>().is_err());
        assert_eq!(LeaderboardKind::Points.other(), LeaderboardKind::Expeditions);
    }
}
