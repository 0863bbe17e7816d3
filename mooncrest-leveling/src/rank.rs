/// Rank for a member with `users_above` members strictly ahead of them.
///
/// Tied totals share a rank: nobody strictly exceeds either of them.
pub fn rank_from_count(users_above: u64) -> u64 {
    users_above.saturating_add(1)
}

/// `1 + count_greater_than(points)`.
pub fn compute_rank<F>(points: i64, count_greater_than: F) -> u64
where
    F: FnOnce(i64) -> u64,
{
    rank_from_count(count_greater_than(points))
}

#[cfg(test)]
mod tests {
    use super::{compute_rank, rank_from_count};

    fn count_above(totals: &[i64]) -> impl Fn(i64) -> u64 + '_ {
        move |points| totals.iter().filter(|other| **other > points).count() as u64
    }

    #[test]
    fn leader_is_rank_one() {
        let totals = [40, 10, 25];
        assert_eq!(compute_rank(40, count_above(&totals)), 1);
        assert_eq!(compute_rank(25, count_above(&totals)), 2);
        assert_eq!(compute_rank(10, count_above(&totals)), 3);
    }

    #[test]
    fn ties_share_a_rank() {
        let totals = [50, 30, 30, 10];
        assert_eq!(compute_rank(30, count_above(&totals)), 2);
        assert_eq!(compute_rank(10, count_above(&totals)), 4);
    }

    #[test]
    fn empty_board_is_rank_one() {
        assert_eq!(compute_rank(0, |_| 0), 1);
        assert_eq!(rank_from_count(u64::MAX), u64::MAX);
    }
}
