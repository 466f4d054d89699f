use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::criteria::Criterion;
use crate::models::{
    EvaluationRecord, RiskFactor, RiskKind, Severity, TargetMetadata, TrendAnalysis,
    TrendDirection,
};

pub const TIME_RISK_DAYS: i64 = 30;
pub const CRITICAL_TIME_DAYS: i64 = 14;
pub const TIME_RISK_PROBABILITY: f64 = 0.8;

pub const QUALITY_RISK_AVERAGE: f64 = 2.5;
pub const CRITICAL_QUALITY_AVERAGE: f64 = 2.0;
pub const QUALITY_RISK_PROBABILITY: f64 = 0.7;

pub const PROGRESS_RISK_CONFIDENCE: f64 = 0.6;
pub const HIGH_PROGRESS_RATE: f64 = 10.0;

pub const ATTENDANCE_RISK_RATE: f64 = 0.8;
pub const HIGH_ATTENDANCE_RATE: f64 = 0.6;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Union of every triggered risk for one target. `recent` is the caller's
/// window of latest evaluations.
pub fn assess_risks(
    metadata: &TargetMetadata,
    recent: &[EvaluationRecord],
    trend: &TrendAnalysis,
    now: DateTime<Utc>,
) -> Vec<RiskFactor> {
    let mut risks = Vec::new();

    if let Some(deadline) = metadata.deadline {
        risks.extend(time_risk(days_remaining(deadline, now)));
    }
    risks.extend(quality_risks(recent));
    risks.extend(progress_risk(trend));
    if let Some(rate) = metadata.attendance_rate {
        risks.extend(attendance_risk(rate));
    }

    risks
}

/// Whole days until the deadline, rounded up. Negative once it has passed.
pub fn days_remaining(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (deadline - now).num_milliseconds() as f64 / 1000.0;
    (seconds / SECONDS_PER_DAY).ceil() as i64
}

fn time_risk(days_remaining: i64) -> Option<RiskFactor> {
    if days_remaining >= TIME_RISK_DAYS {
        return None;
    }

    let severity = if days_remaining < CRITICAL_TIME_DAYS {
        Severity::Critical
    } else {
        Severity::High
    };

    Some(RiskFactor {
        kind: RiskKind::Time { days_remaining },
        severity,
        probability: TIME_RISK_PROBABILITY,
        description: format!("Only {days_remaining} days remain before the target date"),
        impact: "The work may not be performance-ready by the deadline".to_string(),
        mitigations: vec![
            "Increase rehearsal frequency".to_string(),
            "Prioritize the most difficult sections".to_string(),
            "Consider scheduling additional sessions".to_string(),
        ],
    })
}

/// Mean of each criterion over the rated entries. Criteria never rated are absent.
pub fn criterion_averages(records: &[EvaluationRecord]) -> BTreeMap<Criterion, f64> {
    let mut totals: BTreeMap<Criterion, (u32, u32)> = BTreeMap::new();

    for record in records {
        for (criterion, score) in record.scores.rated() {
            let entry = totals.entry(criterion).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += u32::from(score);
        }
    }

    totals
        .into_iter()
        .map(|(criterion, (count, total))| (criterion, total as f64 / count as f64))
        .collect()
}

fn quality_risks(recent: &[EvaluationRecord]) -> Vec<RiskFactor> {
    criterion_averages(recent)
        .into_iter()
        .filter(|(_, average)| *average < QUALITY_RISK_AVERAGE)
        .map(|(criterion, average)| {
            let severity = if average < CRITICAL_QUALITY_AVERAGE {
                Severity::Critical
            } else {
                Severity::High
            };
            RiskFactor {
                kind: RiskKind::Quality { criterion, average },
                severity,
                probability: QUALITY_RISK_PROBABILITY,
                description: format!("{criterion} averages {average:.1} over recent evaluations"),
                impact: format!(
                    "Weak {} will be audible in performance",
                    criterion.name().to_lowercase()
                ),
                mitigations: vec![criterion.definition().mitigation.to_string()],
            }
        })
        .collect()
}

fn progress_risk(trend: &TrendAnalysis) -> Option<RiskFactor> {
    if trend.direction != TrendDirection::Declining
        || trend.confidence <= PROGRESS_RISK_CONFIDENCE
    {
        return None;
    }

    let severity = if trend.rate > HIGH_PROGRESS_RATE {
        Severity::High
    } else {
        Severity::Medium
    };

    Some(RiskFactor {
        kind: RiskKind::Progress { rate: trend.rate },
        severity,
        probability: trend.confidence.clamp(0.0, 1.0),
        description: "Evaluation scores are declining consistently".to_string(),
        impact: "Preparation is moving away from performance readiness".to_string(),
        mitigations: vec![
            "Review the teaching method".to_string(),
            "Increase individual practice".to_string(),
            "Isolate the specific obstacles".to_string(),
        ],
    })
}

fn attendance_risk(attendance_rate: f64) -> Option<RiskFactor> {
    if attendance_rate.is_nan() || attendance_rate >= ATTENDANCE_RISK_RATE {
        return None;
    }

    let severity = if attendance_rate < HIGH_ATTENDANCE_RATE {
        Severity::High
    } else {
        Severity::Medium
    };

    Some(RiskFactor {
        kind: RiskKind::Attendance { attendance_rate },
        severity,
        probability: (1.0 - attendance_rate).clamp(0.0, 1.0),
        description: format!(
            "Attendance is at {:.0}% of scheduled rehearsals",
            attendance_rate * 100.0
        ),
        impact: "Missed rehearsals slow ensemble preparation".to_string(),
        mitigations: vec![
            "Confirm the rehearsal calendar with every member".to_string(),
            "Contact members with repeated absences".to_string(),
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CriterionScores, RiskType};
    use crate::trend::tests::{base_time, evaluation, uniform_scores};
    use chrono::Duration;

    fn flat_trend() -> TrendAnalysis {
        TrendAnalysis {
            direction: TrendDirection::Stable,
            rate: 0.0,
            confidence: 0.1,
            points: Vec::new(),
        }
    }

    fn with_deadline(days: i64) -> TargetMetadata {
        TargetMetadata {
            deadline: Some(base_time() + Duration::days(days)),
            ..TargetMetadata::default()
        }
    }

    #[test]
    fn days_remaining_rounds_up() {
        let now = base_time();
        assert_eq!(days_remaining(now + Duration::hours(25), now), 2);
        assert_eq!(days_remaining(now + Duration::days(3), now), 3);
        assert_eq!(days_remaining(now - Duration::hours(30), now), -1);
    }

    #[test]
    fn time_risk_severity_follows_tiers() {
        let trend = flat_trend();
        let critical = assess_risks(&with_deadline(10), &[], &trend, base_time());
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].severity, Severity::Critical);
        assert_eq!(critical[0].probability, 0.8);
        assert_eq!(critical[0].mitigations.len(), 3);

        let high = assess_risks(&with_deadline(20), &[], &trend, base_time());
        assert_eq!(high[0].severity, Severity::High);

        assert!(assess_risks(&with_deadline(45), &[], &trend, base_time()).is_empty());
        assert!(assess_risks(&TargetMetadata::default(), &[], &trend, base_time()).is_empty());
    }

    #[test]
    fn quality_risk_per_weak_criterion() {
        let scores = CriterionScores {
            tuning: 1,
            articulation: 2,
            rhythm: 4,
            ..CriterionScores::default()
        };
        let recent = vec![
            evaluation(base_time(), scores),
            evaluation(base_time() + Duration::days(1), CriterionScores { articulation: 3, ..scores }),
        ];
        let risks = assess_risks(&TargetMetadata::default(), &recent, &flat_trend(), base_time());
        assert_eq!(risks.len(), 1);
        assert_eq!(
            risks[0].kind,
            RiskKind::Quality {
                criterion: Criterion::Tuning,
                average: 1.0
            }
        );
        assert_eq!(risks[0].severity, Severity::Critical);
        assert_eq!(risks[0].probability, 0.7);
        assert_eq!(
            risks[0].mitigations,
            vec![Criterion::Tuning.definition().mitigation.to_string()]
        );
    }

    #[test]
    fn quality_risk_high_between_two_and_two_and_a_half() {
        let recent: Vec<_> = [2, 3, 2]
            .into_iter()
            .map(|dynamics| {
                evaluation(
                    base_time(),
                    CriterionScores {
                        dynamics,
                        ..CriterionScores::default()
                    },
                )
            })
            .collect();
        let risks = assess_risks(&TargetMetadata::default(), &recent, &flat_trend(), base_time());
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].severity, Severity::High);
    }

    #[test]
    fn declining_trend_needs_confidence() {
        let mut trend = TrendAnalysis {
            direction: TrendDirection::Declining,
            rate: 25.0,
            confidence: 0.9,
            points: Vec::new(),
        };
        let risks = assess_risks(&TargetMetadata::default(), &[], &trend, base_time());
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].kind.risk_type(), RiskType::Progress);
        assert_eq!(risks[0].severity, Severity::High);
        assert_eq!(risks[0].probability, 0.9);

        trend.rate = 8.0;
        let risks = assess_risks(&TargetMetadata::default(), &[], &trend, base_time());
        assert_eq!(risks[0].severity, Severity::Medium);

        trend.confidence = 0.6;
        assert!(assess_risks(&TargetMetadata::default(), &[], &trend, base_time()).is_empty());
    }

    #[test]
    fn attendance_risk_below_threshold() {
        let metadata = TargetMetadata {
            attendance_rate: Some(0.5),
            ..TargetMetadata::default()
        };
        let risks = assess_risks(&metadata, &[], &flat_trend(), base_time());
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].kind.risk_type(), RiskType::Attendance);
        assert_eq!(risks[0].severity, Severity::High);
        assert!((risks[0].probability - 0.5).abs() < 1e-12);

        let fine = TargetMetadata {
            attendance_rate: Some(0.95),
            ..TargetMetadata::default()
        };
        assert!(assess_risks(&fine, &[], &flat_trend(), base_time()).is_empty());
    }

    #[test]
    fn probabilities_stay_in_unit_interval() {
        let metadata = TargetMetadata {
            deadline: Some(base_time() - Duration::days(5)),
            attendance_rate: Some(-0.4),
            ..TargetMetadata::default()
        };
        let trend = TrendAnalysis {
            direction: TrendDirection::Declining,
            rate: 90.0,
            confidence: 1.0,
            points: Vec::new(),
        };
        let recent = vec![evaluation(base_time(), uniform_scores(1))];
        let risks = assess_risks(&metadata, &recent, &trend, base_time());
        assert_eq!(risks.len(), 9);
        assert!(risks.iter().all(|r| (0.0..=1.0).contains(&r.probability)));
    }
}
