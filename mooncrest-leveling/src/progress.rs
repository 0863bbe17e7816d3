use crate::table::LevelResolution;

/// Number of segments in a progress bar.
pub const BAR_SEGMENTS: u8 = 10;

const FILLED_SEGMENT: &str = "⬜";
const EMPTY_SEGMENT: &str = "🔳";

pub const MAX_LEVEL_MESSAGE: &str = "🎉 Max level reached!";
pub const UNCONFIGURED_MESSAGE: &str = "No levels configured";

/// Progress towards the next tier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Progress {
    pub percent: u8,
    pub filled: u8,
    pub empty: u8,
    pub message: String,
}

impl Progress {
    pub fn bar(&self) -> String {
        let mut bar = FILLED_SEGMENT.repeat(usize::from(self.filled));
        bar.push_str(&EMPTY_SEGMENT.repeat(usize::from(self.empty)));
        bar
    }
}

pub fn render_progress(points: i64, resolved: &LevelResolution<'_>) -> Progress {
    // Unconfigured ladders show a plain bar at 0%.
    let LevelResolution::Tier { current, next, .. } = resolved else {
        return Progress {
            percent: 0,
            filled: BAR_SEGMENTS,
            empty: 0,
            message: UNCONFIGURED_MESSAGE.to_owned(),
        };
    };

    let Some(next) = next else {
        return Progress {
            percent: 100,
            filled: BAR_SEGMENTS,
            empty: 0,
            message: MAX_LEVEL_MESSAGE.to_owned(),
        };
    };

    let span = next.min_points.saturating_sub(current.min_points);
    let gained = points.saturating_sub(current.min_points).max(0);

    let percent = if span <= 0 {
        100
    } else {
        // i128 keeps the multiplication exact for totals near i64::MAX.
        let raw = i128::from(gained) * 100 / i128::from(span);
        raw.clamp(0, 100) as u8
    };

    let filled = (percent / 10).min(BAR_SEGMENTS);
    let needed = next.min_points.saturating_sub(points).max(0);

    Progress {
        percent,
        filled,
        empty: BAR_SEGMENTS - filled,
        message: format!("Needs **{}** more points to reach **{}**", needed, next.name),
    }
}

#[cfg(test)]
mod tests {
    use super::{BAR_SEGMENTS, MAX_LEVEL_MESSAGE, UNCONFIGURED_MESSAGE, render_progress};
    use crate::table::{LevelResolution, LevelTable, LevelThreshold, resolve_level};

    fn summit_table() -> LevelTable {
        LevelTable::new(vec![
            LevelThreshold::new("Novice", 0),
            LevelThreshold::new("Explorer", 100),
            LevelThreshold::new("Summiteer", 500),
        ])
        .unwrap()
    }

    #[test]
    fn renders_partial_progress() {
        let table = summit_table();
        let progress = render_progress(250, &resolve_level(250, &table));

        assert_eq!(progress.percent, 37);
        assert_eq!(progress.filled, 3);
        assert_eq!(progress.empty, 7);
        assert_eq!(
            progress.message,
            "Needs **250** more points to reach **Summiteer**"
        );
        assert_eq!(progress.bar(), "⬜⬜⬜🔳🔳🔳🔳🔳🔳🔳");
    }

    #[test]
    fn max_level_is_always_full() {
        let table = summit_table();
        for points in [500, 501, 9_999, i64::MAX] {
            let progress = render_progress(points, &resolve_level(points, &table));
            assert_eq!(progress.percent, 100);
            assert_eq!(progress.filled, BAR_SEGMENTS);
            assert_eq!(progress.empty, 0);
            assert_eq!(progress.message, MAX_LEVEL_MESSAGE);
        }
    }

    #[test]
    fn unconfigured_renders_plain_bar_at_zero() {
        let progress = render_progress(10, &LevelResolution::Unconfigured);
        assert_eq!(progress.percent, 0);
        assert_eq!(progress.filled, BAR_SEGMENTS);
        assert_eq!(progress.empty, 0);
        assert_eq!(progress.bar(), "⬜".repeat(10));
        assert_eq!(progress.message, UNCONFIGURED_MESSAGE);
    }

    #[test]
    fn equal_thresholds_count_as_complete() {
        let current = LevelThreshold::new("A", 50);
        let next = LevelThreshold::new("B", 50);
        let resolved = LevelResolution::Tier {
            index: 0,
            current: &current,
            next: Some(&next),
        };
        assert_eq!(render_progress(10, &resolved).percent, 100);
    }

    #[test]
    fn percent_stays_in_range_and_segments_sum_to_ten() {
        let table = summit_table();
        for points in 0..600 {
            let progress = render_progress(points, &resolve_level(points, &table));
            assert!(progress.percent <= 100);
            assert_eq!(progress.filled + progress.empty, BAR_SEGMENTS);
        }
    }

    #[test]
    fn totals_below_the_floor_tier_clamp_to_zero() {
        let table = LevelTable::new(vec![
            LevelThreshold::new("Recruit", 10),
            LevelThreshold::new("Ranger", 20),
        ])
        .unwrap();
        let progress = render_progress(0, &resolve_level(0, &table));
        assert_eq!(progress.percent, 0);
        assert_eq!(progress.message, "Needs **20** more points to reach **Ranger**");
    }
}
