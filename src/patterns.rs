//! Detection of recurring structure in an evaluation series.
//!
//! Only the weekly cycle is detected. Correlating scores with instrument
//! difficulty needs metadata this crate does not model, so no such pattern is
//! produced.

use chrono::{Datelike, Weekday};

use crate::models::{EvaluationRecord, PatternKind, PatternResult};
use crate::trend::aggregate_score;

pub const MIN_BUCKET_SAMPLES: usize = 3;
pub const MIN_QUALIFYING_BUCKETS: usize = 3;
pub const MAX_WEEKLY_CONFIDENCE: f64 = 0.9;
/// Patterns at or below this confidence are not worth surfacing.
pub const PATTERN_CONFIDENCE_THRESHOLD: f64 = 0.6;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn detect_patterns(records: &[EvaluationRecord]) -> Vec<PatternResult> {
    weekly_pattern(records).into_iter().collect()
}

/// Presentation filter: keeps patterns strictly above the confidence threshold.
pub fn actionable_patterns(patterns: Vec<PatternResult>) -> Vec<PatternResult> {
    patterns
        .into_iter()
        .filter(|pattern| pattern.actionable && pattern.confidence > PATTERN_CONFIDENCE_THRESHOLD)
        .collect()
}

fn weekly_pattern(records: &[EvaluationRecord]) -> Option<PatternResult> {
    let mut buckets: [Vec<f64>; 7] = Default::default();
    for record in records {
        let day = record.evaluated_at.weekday().num_days_from_monday() as usize;
        buckets[day].push(aggregate_score(record));
    }

    let qualifying: Vec<(Weekday, f64)> = WEEKDAYS
        .iter()
        .zip(buckets.iter())
        .filter(|(_, samples)| samples.len() >= MIN_BUCKET_SAMPLES)
        .map(|(weekday, samples)| {
            (*weekday, samples.iter().sum::<f64>() / samples.len() as f64)
        })
        .collect();

    if qualifying.len() < MIN_QUALIFYING_BUCKETS {
        tracing::debug!(
            qualifying = qualifying.len(),
            "not enough weekdays with samples for a weekly pattern"
        );
        return None;
    }

    let (best_day, best_average) = qualifying
        .iter()
        .copied()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;
    let (worst_day, worst_average) = qualifying
        .iter()
        .copied()
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;

    let confidence = ((best_average - worst_average) / 2.0).clamp(0.0, MAX_WEEKLY_CONFIDENCE);

    Some(PatternResult {
        kind: PatternKind::WeeklyCycle {
            best_day,
            worst_day,
            best_average,
            worst_average,
        },
        description: format!(
            "Evaluations on {best_day} average {best_average:.1} while {worst_day} averages {worst_average:.1}"
        ),
        confidence,
        actionable: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trend::tests::{base_time, evaluation, uniform_scores};
    use chrono::Duration;

    /// `base_time()` is a Monday; `offset` selects the weekday.
    fn on_weekday(offset: i64, weeks: i64, score: u8) -> Vec<EvaluationRecord> {
        (0..weeks)
            .map(|week| {
                evaluation(
                    base_time() + Duration::days(week * 7 + offset),
                    uniform_scores(score),
                )
            })
            .collect()
    }

    #[test]
    fn detects_best_and_worst_weekday() {
        let mut records = on_weekday(0, 3, 2);
        records.extend(on_weekday(2, 3, 4));
        records.extend(on_weekday(4, 3, 3));

        let patterns = detect_patterns(&records);
        assert_eq!(patterns.len(), 1);
        let pattern = &patterns[0];
        assert_eq!(
            pattern.kind,
            PatternKind::WeeklyCycle {
                best_day: Weekday::Wed,
                worst_day: Weekday::Mon,
                best_average: 4.0,
                worst_average: 2.0,
            }
        );
        assert_eq!(pattern.confidence, 0.9);
        assert!(pattern.actionable);
    }

    #[test]
    fn sparse_buckets_are_excluded() {
        let mut records = on_weekday(0, 3, 3);
        records.extend(on_weekday(2, 3, 3));
        records.extend(on_weekday(4, 3, 4));
        // two samples only: would otherwise widen the spread
        records.extend(on_weekday(5, 2, 1));

        let patterns = detect_patterns(&records);
        assert_eq!(patterns.len(), 1);
        assert!((patterns[0].confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn fewer_than_three_buckets_yields_no_pattern() {
        let mut records = on_weekday(0, 5, 1);
        records.extend(on_weekday(3, 5, 5));
        records.extend(on_weekday(6, 2, 3));
        assert!(detect_patterns(&records).is_empty());
    }

    #[test]
    fn weak_patterns_are_filtered_for_presentation() {
        let mut records = on_weekday(0, 3, 3);
        records.extend(on_weekday(2, 3, 3));
        records.extend(on_weekday(4, 3, 4));
        let patterns = detect_patterns(&records);
        assert_eq!(patterns.len(), 1);
        assert!(actionable_patterns(patterns).is_empty());
    }
}
