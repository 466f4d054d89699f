//! Linear trend fitting over the aggregate score of each evaluation.
//!
//! The regression uses the position of an evaluation in the sorted series as
//! its x value, so irregular gaps between rehearsals do not bend the line.

use crate::models::{EvaluationRecord, TrendAnalysis, TrendDirection, TrendPoint};

pub const MIN_TREND_RECORDS: usize = 3;
pub const DIRECTION_THRESHOLD: f64 = 0.1;
pub const MIN_CONFIDENCE: f64 = 0.1;
pub const MAX_CONFIDENCE: f64 = 1.0;

/// Mean of the rated criteria, 0 when nothing was rated.
pub fn aggregate_score(record: &EvaluationRecord) -> f64 {
    let (count, total) = record
        .scores
        .rated()
        .fold((0u32, 0u32), |(count, total), (_, score)| {
            (count + 1, total + u32::from(score))
        });

    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

/// Ordinary least squares against x = 0..n-1. `None` below two values.
///
/// A flat series has no variance to explain: R² is 1.0 when the line also
/// has no residual, otherwise the minimum confidence.
pub fn fit_line(values: &[f64]) -> Option<LinearFit> {
    if values.len() < 2 {
        return None;
    }

    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;

    let (covariance, variance_x) = values.iter().enumerate().fold(
        (0.0, 0.0),
        |(covariance, variance_x), (index, y)| {
            let dx = index as f64 - mean_x;
            (covariance + dx * (y - mean_y), variance_x + dx * dx)
        },
    );

    let slope = covariance / variance_x;
    let intercept = mean_y - slope * mean_x;

    let ss_tot: f64 = values.iter().map(|y| (y - mean_y).powi(2)).sum();
    let ss_res: f64 = values
        .iter()
        .enumerate()
        .map(|(index, y)| (y - (slope * index as f64 + intercept)).powi(2))
        .sum();

    let r_squared = if ss_tot == 0.0 {
        if ss_res == 0.0 {
            MAX_CONFIDENCE
        } else {
            MIN_CONFIDENCE
        }
    } else {
        1.0 - ss_res / ss_tot
    };

    Some(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}

pub fn analyze_trend(records: &[EvaluationRecord]) -> TrendAnalysis {
    if records.len() < MIN_TREND_RECORDS {
        return TrendAnalysis {
            direction: TrendDirection::Stable,
            rate: 0.0,
            confidence: MIN_CONFIDENCE,
            points: Vec::new(),
        };
    }

    let mut sorted: Vec<&EvaluationRecord> = records.iter().collect();
    sorted.sort_by_key(|record| record.evaluated_at);

    let points: Vec<TrendPoint> = sorted
        .iter()
        .map(|record| TrendPoint {
            evaluated_at: record.evaluated_at,
            aggregate: aggregate_score(record),
        })
        .collect();
    let values: Vec<f64> = points.iter().map(|point| point.aggregate).collect();

    let Some(fit) = fit_line(&values) else {
        return TrendAnalysis {
            direction: TrendDirection::Stable,
            rate: 0.0,
            confidence: MIN_CONFIDENCE,
            points: Vec::new(),
        };
    };

    let direction = if fit.slope > DIRECTION_THRESHOLD {
        TrendDirection::Improving
    } else if fit.slope < -DIRECTION_THRESHOLD {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    };

    TrendAnalysis {
        direction,
        rate: fit.slope.abs() * 100.0,
        confidence: fit.r_squared.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE),
        points,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::CriterionScores;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use uuid::Uuid;

    pub(crate) fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 18, 0, 0).unwrap()
    }

    pub(crate) fn uniform_scores(score: u8) -> CriterionScores {
        CriterionScores {
            tuning: score,
            articulation: score,
            rhythm: score,
            cohesion: score,
            dynamics: score,
            memorization: score,
        }
    }

    pub(crate) fn evaluation(evaluated_at: DateTime<Utc>, scores: CriterionScores) -> EvaluationRecord {
        EvaluationRecord {
            id: Uuid::new_v4(),
            work_id: Uuid::nil(),
            group_id: Uuid::nil(),
            evaluator_id: Uuid::nil(),
            scores,
            comment: "weekly check".to_string(),
            evaluated_at,
        }
    }

    /// One record per day, each scoring `aggregate` via two rated criteria.
    pub(crate) fn series(aggregates: &[f64]) -> Vec<EvaluationRecord> {
        aggregates
            .iter()
            .enumerate()
            .map(|(day, aggregate)| {
                let low = aggregate.floor() as u8;
                let high = aggregate.ceil() as u8;
                let scores = CriterionScores {
                    tuning: low,
                    rhythm: high,
                    ..CriterionScores::default()
                };
                evaluation(base_time() + Duration::days(day as i64), scores)
            })
            .collect()
    }

    #[test]
    fn aggregate_ignores_unrated_criteria() {
        let scores = CriterionScores {
            tuning: 4,
            rhythm: 2,
            ..CriterionScores::default()
        };
        assert_eq!(aggregate_score(&evaluation(base_time(), scores)), 3.0);
        assert_eq!(
            aggregate_score(&evaluation(base_time(), CriterionScores::default())),
            0.0
        );
    }

    #[test]
    fn fewer_than_three_records_is_degenerate() {
        let trend = analyze_trend(&series(&[2.0, 4.0]));
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert_eq!(trend.rate, 0.0);
        assert_eq!(trend.confidence, 0.1);
        assert!(trend.points.is_empty());
    }

    #[test]
    fn increasing_series_is_improving_with_high_confidence() {
        let trend = analyze_trend(&series(&[2.0, 2.5, 3.0, 3.5, 4.0]));
        assert_eq!(trend.direction, TrendDirection::Improving);
        assert!((trend.rate - 50.0).abs() < 1e-9);
        assert!(trend.confidence > 0.9);
        assert_eq!(trend.points.len(), 5);
    }

    #[test]
    fn decreasing_series_is_declining() {
        let trend = analyze_trend(&series(&[4.5, 4.0, 3.5, 3.0]));
        assert_eq!(trend.direction, TrendDirection::Declining);
        assert!(trend.rate > 10.0);
    }

    #[test]
    fn constant_series_uses_zero_variance_policy() {
        let records = series(&[3.0, 3.0, 3.0, 3.0, 3.0]);
        let first = analyze_trend(&records);
        let second = analyze_trend(&records);
        assert_eq!(first.direction, TrendDirection::Stable);
        assert_eq!(first.rate, 0.0);
        assert_eq!(first.confidence, 1.0);
        assert_eq!(first, second);
    }

    #[test]
    fn records_are_sorted_before_fitting() {
        let mut records = series(&[1.0, 2.0, 3.0, 4.0]);
        records.reverse();
        let trend = analyze_trend(&records);
        assert_eq!(trend.direction, TrendDirection::Improving);
        assert_eq!(trend.points.first().map(|p| p.aggregate), Some(1.0));
    }

    #[test]
    fn noisy_series_clamps_confidence_to_minimum() {
        let trend = analyze_trend(&series(&[1.0, 5.0, 1.0, 5.0, 1.0, 5.0]));
        assert!(trend.confidence >= 0.1);
        assert!(trend.confidence <= 1.0);
    }

    #[test]
    fn fit_line_recovers_slope_and_intercept() {
        let fit = fit_line(&[1.0, 3.0, 5.0]).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
        assert!(fit_line(&[1.0]).is_none());
    }
}
