//! Tenant-scoped aggregation helpers
//!
//! Pure rollups over already-fetched row sets: sums, averages,
//! one-decimal percentages, NPS promoter/passive/detractor splits,
//! rating histograms, and weekly bucketing for utilization. Empty
//! inputs return zero-valued defaults; nothing here divides by zero.

use chrono::NaiveDate;
use serde::Serialize;

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Sum of a value sequence
pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Average of a value sequence, 0.0 when empty
pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    sum(values) / values.len() as f64
}

/// Part-of-whole as a one-decimal percentage, 0.0 when whole is zero
pub fn percent(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 {
        return 0.0;
    }
    round1(part / whole * 100.0)
}

/// Net Promoter Score summary over 0-10 survey answers
///
/// Promoters score >= 9, passives 7-8, detractors <= 6.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NpsSummary {
    pub score: i32,
    pub promoters: u32,
    pub passives: u32,
    pub detractors: u32,
    pub total: u32,
    pub average: f64,
}

impl NpsSummary {
    pub fn from_scores(scores: &[i64]) -> Self {
        if scores.is_empty() {
            return Self::default();
        }

        let mut promoters = 0u32;
        let mut passives = 0u32;
        let mut detractors = 0u32;
        for &s in scores {
            if s >= 9 {
                promoters += 1;
            } else if s >= 7 {
                passives += 1;
            } else {
                detractors += 1;
            }
        }

        let total = scores.len() as u32;
        let score =
            ((promoters as f64 - detractors as f64) / total as f64 * 100.0).round() as i32;
        let avg: f64 = scores.iter().map(|&s| s as f64).sum::<f64>() / total as f64;

        Self {
            score,
            promoters,
            passives,
            detractors,
            total,
            average: round1(avg),
        }
    }
}

/// One bucket of a rating histogram
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingBucket {
    pub value: i64,
    pub count: u32,
}

/// Distribution of 1..=max ratings plus the average
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingDistribution {
    pub buckets: Vec<RatingBucket>,
    pub total: u32,
    pub average: f64,
}

impl RatingDistribution {
    pub fn from_ratings(ratings: &[i64], max: i64) -> Self {
        let buckets: Vec<RatingBucket> = (1..=max)
            .map(|value| RatingBucket {
                value,
                count: ratings.iter().filter(|&&r| r == value).count() as u32,
            })
            .collect();

        if ratings.is_empty() {
            return Self {
                buckets,
                total: 0,
                average: 0.0,
            };
        }

        let avg: f64 =
            ratings.iter().map(|&r| r as f64).sum::<f64>() / ratings.len() as f64;

        Self {
            buckets,
            total: ratings.len() as u32,
            average: round1(avg),
        }
    }
}

/// Sum dated hour entries into consecutive 7-day buckets.
///
/// `window_start` is the first day of week 0; entries outside
/// `weeks * 7` days are ignored.
pub fn week_buckets(entries: &[(NaiveDate, f64)], window_start: NaiveDate, weeks: usize) -> Vec<f64> {
    let mut buckets = vec![0.0; weeks];
    for (date, hours) in entries {
        let days = (*date - window_start).num_days();
        if days < 0 {
            continue;
        }
        let index = (days / 7) as usize;
        if index < weeks {
            buckets[index] += hours;
        }
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_inputs_return_defaults() {
        assert_eq!(average(&[]), 0.0);
        assert_eq!(percent(5.0, 0.0), 0.0);
        assert_eq!(
            NpsSummary::from_scores(&[]),
            NpsSummary {
                score: 0,
                promoters: 0,
                passives: 0,
                detractors: 0,
                total: 0,
                average: 0.0,
            }
        );
        let dist = RatingDistribution::from_ratings(&[], 5);
        assert_eq!(dist.total, 0);
        assert_eq!(dist.average, 0.0);
        assert_eq!(dist.buckets.len(), 5);
    }

    #[test]
    fn test_nps_balanced_is_zero() {
        // Equal promoters and detractors cancel out
        let summary = NpsSummary::from_scores(&[10, 9, 2, 3]);
        assert_eq!(summary.score, 0);
        assert_eq!(summary.promoters, 2);
        assert_eq!(summary.detractors, 2);
    }

    #[test]
    fn test_nps_extremes() {
        assert_eq!(NpsSummary::from_scores(&[9, 10, 9]).score, 100);
        assert_eq!(NpsSummary::from_scores(&[0, 3, 6]).score, -100);
    }

    #[test]
    fn test_nps_passives_dilute_score() {
        // 1 promoter, 1 passive, 0 detractors over 2 answers -> 50
        let summary = NpsSummary::from_scores(&[9, 7]);
        assert_eq!(summary.score, 50);
        assert_eq!(summary.passives, 1);
    }

    #[test]
    fn test_percent_rounds_to_one_decimal() {
        assert_eq!(percent(1.0, 3.0), 33.3);
        assert_eq!(percent(2.0, 3.0), 66.7);
        assert_eq!(percent(3.0, 3.0), 100.0);
    }

    #[test]
    fn test_rating_distribution_buckets_by_value() {
        let dist = RatingDistribution::from_ratings(&[5, 4, 5, 1], 5);
        assert_eq!(dist.total, 4);
        assert_eq!(dist.buckets[4], RatingBucket { value: 5, count: 2 });
        assert_eq!(dist.buckets[0], RatingBucket { value: 1, count: 1 });
        assert_eq!(dist.buckets[1].count, 0);
        assert_eq!(dist.average, 3.8);
    }

    #[test]
    fn test_week_buckets() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let entries = vec![
            (start, 8.0),
            (start + chrono::Duration::days(6), 2.0),
            (start + chrono::Duration::days(7), 4.0),
            // Before the window and past the last week: ignored
            (start - chrono::Duration::days(1), 9.0),
            (start + chrono::Duration::days(15), 9.0),
        ];
        let buckets = week_buckets(&entries, start, 2);
        assert_eq!(buckets, vec![10.0, 4.0]);
    }
}
