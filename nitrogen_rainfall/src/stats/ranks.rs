//! Ranking and robust location/scale helpers over `statrs` order statistics.
//!
//! `statrs` sorts with `partial_cmp`, so callers pass finite values only.

use statrs::statistics::{Data, OrderStatistics, RankTieBreaker};

/// Ranks starting at 1, with tied values sharing the mean of the ranks
/// they span (e.g. `[10, 20, 20, 30]` → `[1, 2.5, 2.5, 4]`).
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    Data::new(values.to_vec()).ranks(RankTieBreaker::Average)
}

/// Sizes of each group of tied values (groups of 1 included).
pub fn tie_group_sizes(values: &[f64]) -> Vec<usize> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.chunk_by(|a, b| a == b).map(<[f64]>::len).collect()
}

/// Median of a slice; `None` when empty.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(Data::new(values.to_vec()).median())
}

/// Median absolute deviation from the median (unscaled).
pub fn mad(values: &[f64]) -> Option<f64> {
    let center = median(values)?;
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_ranks_without_ties() {
        assert_eq!(average_ranks(&[3.0, 1.0, 2.0]), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_average_ranks_share_tied_positions() {
        assert_eq!(average_ranks(&[10.0, 20.0, 20.0, 30.0]), vec![1.0, 2.5, 2.5, 4.0]);
        assert_eq!(average_ranks(&[5.0, 5.0, 5.0]), vec![2.0, 2.0, 2.0]);
        assert_eq!(average_ranks(&[]), Vec::<f64>::new());
    }

    #[test]
    fn test_tie_group_sizes() {
        let mut sizes = tie_group_sizes(&[3.0, 1.0, 2.0, 3.0, 2.0, 3.0]);
        sizes.sort();
        assert_eq!(sizes, vec![1, 2, 3]);
        assert!(tie_group_sizes(&[]).is_empty());
    }

    #[test]
    fn test_median_odd_even_empty() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[7.0]), Some(7.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_mad() {
        // median 3, deviations [2, 1, 0, 1, 6] → median 1
        assert_eq!(mad(&[1.0, 2.0, 3.0, 4.0, 9.0]), Some(1.0));
        assert_eq!(mad(&[]), None);
    }
}
