//! Contamination-driven score cutoff

use crate::error::{AnomalyError, Result};
use serde::{Deserialize, Serialize};

/// Largest accepted contamination
pub const MAX_CONTAMINATION: f64 = 0.5;

/// Absorbs floating point noise such as 0.07 * 100 = 7.000000000000001
const RANK_EPSILON: f64 = 1e-9;

/// Score cutoff selected for a contamination level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    /// Records scoring at or above this value are anomalous
    pub cutoff: f64,
    /// Target number of flagged records, ⌈contamination × N⌉
    pub target: usize,
    /// Upper bound on flagged records, taken in input order.
    /// Only set when every score is identical.
    pub cap: Option<usize>,
}

impl Threshold {
    /// Whether a record with `score` is flagged, given how many records
    /// before it were already flagged
    pub fn admits(&self, score: f64, flagged_so_far: usize) -> bool {
        score >= self.cutoff && self.cap.map_or(true, |cap| flagged_so_far < cap)
    }
}

/// Turns a target contamination into a cutoff over an empirical score set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSelector {
    contamination: f64,
}

impl ThresholdSelector {
    /// Fails unless `contamination` lies in (0, 0.5]
    pub fn new(contamination: f64) -> Result<Self> {
        validate_contamination(contamination)?;
        Ok(Self { contamination })
    }

    pub fn contamination(&self) -> f64 {
        self.contamination
    }

    /// Target flagged count for `n` records
    pub fn target_count(&self, n: usize) -> usize {
        let raw = (self.contamination * n as f64 - RANK_EPSILON).ceil();
        (raw.max(1.0) as usize).min(n)
    }

    /// Pick the cutoff for `scores`.
    ///
    /// The cutoff is the score at rank ⌈contamination × N⌉ in descending
    /// order, and all scores tied with it are included. When that tie group
    /// overshoots the target by more than the next higher score undershoots
    /// it, the higher score is used instead.
    pub fn select(&self, scores: impl IntoIterator<Item = f64>) -> Result<Threshold> {
        let mut sorted: Vec<f64> = scores.into_iter().collect();
        if sorted.is_empty() {
            return Err(AnomalyError::InsufficientData(
                "cannot select a threshold over zero scores".to_string(),
            ));
        }
        if let Some(bad) = sorted.iter().find(|s| s.is_nan()) {
            return Err(AnomalyError::InsufficientData(format!("score set contains {}", bad)));
        }
        sorted.sort_by(|a, b| b.total_cmp(a));

        let n = sorted.len();
        let target = self.target_count(n);
        let cutoff = sorted[target - 1];

        // All scores identical: ties would flag everything
        if sorted[0] == sorted[n - 1] {
            return Ok(Threshold {
                cutoff,
                target,
                cap: Some(target),
            });
        }

        // Inclusive count at the rank-k cutoff
        let at_cutoff = sorted.partition_point(|&s| s >= cutoff);
        // Count strictly above it, i.e. inclusive count of the next higher level
        let above_cutoff = sorted.partition_point(|&s| s > cutoff);

        let overshoot = at_cutoff - target;
        let undershoot = target - above_cutoff;
        let cutoff = if above_cutoff > 0 && undershoot < overshoot {
            sorted[above_cutoff - 1]
        } else {
            cutoff
        };

        Ok(Threshold {
            cutoff,
            target,
            cap: None,
        })
    }
}

pub(crate) fn validate_contamination(contamination: f64) -> Result<()> {
    if !(contamination > 0.0 && contamination <= MAX_CONTAMINATION) {
        return Err(AnomalyError::invalid_config(
            "contamination",
            contamination,
            "must lie in (0, 0.5]",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flagged(threshold: &Threshold, scores: &[f64]) -> usize {
        let mut count = 0;
        for &s in scores {
            if threshold.admits(s, count) {
                count += 1;
            }
        }
        count
    }

    #[test]
    fn test_contamination_range() {
        assert!(ThresholdSelector::new(0.01).is_ok());
        assert!(ThresholdSelector::new(0.5).is_ok());
        for bad in [0.0, -0.1, 0.6, f64::NAN] {
            assert!(matches!(
                ThresholdSelector::new(bad),
                Err(AnomalyError::InvalidConfiguration { .. })
            ));
        }
    }

    #[test]
    fn test_target_count() {
        let selector = ThresholdSelector::new(0.01).unwrap();
        assert_eq!(selector.target_count(1000), 10);
        assert_eq!(selector.target_count(1001), 11);
        assert_eq!(selector.target_count(5), 1);

        let selector = ThresholdSelector::new(0.07).unwrap();
        assert_eq!(selector.target_count(100), 7);
    }

    #[test]
    fn test_rank_cutoff_distinct_scores() {
        let scores: Vec<f64> = (0..10).map(|i| i as f64 / 10.0).collect();
        let threshold = ThresholdSelector::new(0.2).unwrap().select(scores.clone()).unwrap();

        assert_eq!(threshold.cutoff, 0.8);
        assert_eq!(threshold.target, 2);
        assert_eq!(flagged(&threshold, &scores), 2);
    }

    #[test]
    fn test_ties_at_cutoff_included() {
        let scores = [0.9, 0.7, 0.7, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1];
        let threshold = ThresholdSelector::new(0.2).unwrap().select(scores).unwrap();

        // Rank 2 lands in a tie pair; 0.9 alone is no closer to the target
        assert_eq!(threshold.cutoff, 0.7);
        assert_eq!(threshold.cap, None);
        assert_eq!(flagged(&threshold, &scores), 3);
    }

    #[test]
    fn test_closer_higher_level_preferred() {
        // Rank 2 lands on the five-way tie; the single top score is closer
        let scores = [0.77, 0.43, 0.43, 0.43, 0.43, 0.43];
        let threshold = ThresholdSelector::new(0.2).unwrap().select(scores).unwrap();

        assert_eq!(threshold.cutoff, 0.77);
        assert_eq!(flagged(&threshold, &scores), 1);
    }

    #[test]
    fn test_all_scores_identical_caps_at_target() {
        let scores = vec![0.5; 1000];
        let threshold = ThresholdSelector::new(0.01).unwrap().select(scores.clone()).unwrap();

        assert_eq!(threshold.cutoff, 0.5);
        assert_eq!(threshold.cap, Some(10));
        assert_eq!(flagged(&threshold, &scores), 10);
    }

    #[test]
    fn test_monotone_in_contamination() {
        let scores: Vec<f64> = (0..200).map(|i| ((i * 37) % 23) as f64 / 23.0).collect();
        let mut previous = 0;
        for step in 1..=50 {
            let contamination = step as f64 / 100.0;
            let threshold = ThresholdSelector::new(contamination)
                .unwrap()
                .select(scores.clone())
                .unwrap();
            let count = flagged(&threshold, &scores);
            assert!(count >= previous, "contamination {} flagged {} < {}", contamination, count, previous);
            previous = count;
        }
    }

    #[test]
    fn test_empty_scores_rejected() {
        let selector = ThresholdSelector::new(0.1).unwrap();
        assert!(matches!(
            selector.select(Vec::new()),
            Err(AnomalyError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_unordered_scores_and_nan() {
        let scores = vec![0.3, 0.95, 0.1, 0.6, 0.2, 0.55, 0.4, 0.35, 0.25, 0.15];
        let threshold = ThresholdSelector::new(0.2).unwrap().select(scores.clone()).unwrap();
        assert_eq!(threshold.cutoff, 0.6);
        assert_eq!(flagged(&threshold, &scores), 2);

        let with_nan = vec![0.3, f64::NAN, 0.9];
        assert!(matches!(
            ThresholdSelector::new(0.1).unwrap().select(with_nan),
            Err(AnomalyError::InsufficientData(_))
        ));
    }
}
