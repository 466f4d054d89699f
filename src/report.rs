use std::fmt::Write;

use crate::criteria::Criterion;
use crate::models::{CriterionSummary, EvaluationRecord, PatternResult, PredictionResult};

pub fn summarize_by_criterion(records: &[EvaluationRecord]) -> Vec<CriterionSummary> {
    let mut totals: std::collections::HashMap<Criterion, (usize, u32)> =
        std::collections::HashMap::new();

    for record in records {
        for (criterion, score) in record.scores.rated() {
            let entry = totals.entry(criterion).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += u32::from(score);
        }
    }

    let mut summaries: Vec<CriterionSummary> = totals
        .into_iter()
        .map(|(criterion, (rated_count, total))| CriterionSummary {
            criterion,
            rated_count,
            average: if rated_count == 0 {
                0.0
            } else {
                total as f64 / rated_count as f64
            },
        })
        .collect();

    summaries.sort_by(|a, b| {
        a.average
            .partial_cmp(&b.average)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.criterion.cmp(&b.criterion))
    });
    summaries
}

pub fn build_report(
    target: Option<&str>,
    records: &[EvaluationRecord],
    prediction: &PredictionResult,
    patterns: &[PatternResult],
) -> String {
    let summaries = summarize_by_criterion(records);

    let mut output = String::new();
    let target_label = target.unwrap_or("unnamed target");

    let _ = writeln!(output, "# Rehearsal Progress Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} evaluations)",
        target_label,
        records.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Trend");
    let trend = &prediction.trend;
    if trend.points.is_empty() {
        let _ = writeln!(output, "Not enough evaluations to fit a trend.");
    } else {
        let _ = writeln!(
            output,
            "- Direction: {:?} (rate {:.1}, confidence {:.2})",
            trend.direction, trend.rate, trend.confidence
        );
        if let (Some(first), Some(last)) = (trend.points.first(), trend.points.last()) {
            let _ = writeln!(
                output,
                "- Aggregate moved from {:.2} on {} to {:.2} on {}",
                first.aggregate,
                first.evaluated_at.date_naive(),
                last.aggregate,
                last.evaluated_at.date_naive()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Completion Projection");
    let _ = writeln!(
        output,
        "- Estimated completion {} (confidence {:.2})",
        prediction.completion.estimated_completion.date_naive(),
        prediction.completion.confidence
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Factors");
    if prediction.risk_factors.is_empty() {
        let _ = writeln!(output, "No risks detected.");
    } else {
        for risk in prediction.risk_factors.iter() {
            let _ = writeln!(
                output,
                "- [{:?}/{:?}] {} (probability {:.2}). {}",
                risk.kind.risk_type(),
                risk.severity,
                risk.description,
                risk.probability,
                risk.impact
            );
            for mitigation in risk.mitigations.iter() {
                let _ = writeln!(output, "  - {}", mitigation);
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommendations");
    if prediction.recommendations.is_empty() {
        let _ = writeln!(output, "No recommendations at this time.");
    } else {
        for recommendation in prediction.recommendations.iter() {
            let _ = writeln!(
                output,
                "- [{:?}] {} ({:?}, effort {:?}, {}): {}",
                recommendation.priority,
                recommendation.title,
                recommendation.category,
                recommendation.effort,
                recommendation.timeline,
                recommendation.description
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Criterion Averages");
    if summaries.is_empty() {
        let _ = writeln!(output, "No rated criteria recorded.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {:.2} across {} ratings",
                summary.criterion, summary.average, summary.rated_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weekly Patterns");
    if patterns.is_empty() {
        let _ = writeln!(output, "No recurring patterns detected.");
    } else {
        for pattern in patterns.iter() {
            let _ = writeln!(
                output,
                "- {} (confidence {:.2})",
                pattern.description, pattern.confidence
            );
        }
    }

    let mut recent = records.to_vec();
    recent.sort_by(|a, b| b.evaluated_at.cmp(&a.evaluated_at));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Evaluation Notes");

    let notes: Vec<&EvaluationRecord> = recent
        .iter()
        .filter(|record| !record.comment.trim().is_empty())
        .take(5)
        .collect();
    if notes.is_empty() {
        let _ = writeln!(output, "No evaluation notes recorded.");
    } else {
        for record in notes {
            let _ = writeln!(
                output,
                "- {}: {}",
                record.evaluated_at.date_naive(),
                record.comment
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CriterionScores, TargetMetadata};
    use crate::prediction::{predict, AnalysisWindows};
    use crate::trend::tests::{base_time, evaluation, series};
    use chrono::Duration;

    #[test]
    fn summary_sorts_weakest_first() {
        let records = vec![
            evaluation(
                base_time(),
                CriterionScores {
                    tuning: 2,
                    rhythm: 5,
                    ..CriterionScores::default()
                },
            ),
            evaluation(
                base_time(),
                CriterionScores {
                    tuning: 3,
                    ..CriterionScores::default()
                },
            ),
        ];
        let summaries = summarize_by_criterion(&records);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].criterion, Criterion::Tuning);
        assert_eq!(summaries[0].rated_count, 2);
        assert!((summaries[0].average - 2.5).abs() < 1e-12);
        assert_eq!(summaries[1].criterion, Criterion::Rhythm);
    }

    #[test]
    fn report_lists_every_risk() {
        let records = series(&[4.0, 3.0, 2.0, 1.0]);
        let now = base_time() + Duration::days(4);
        let metadata = TargetMetadata {
            deadline: Some(now + Duration::days(7)),
            ..TargetMetadata::default()
        };
        let prediction = predict(&records, &metadata, AnalysisWindows::default(), now);
        let report = build_report(Some("Symphony No. 5 / Strings"), &records, &prediction, &[]);

        assert!(report.starts_with("# Rehearsal Progress Report"));
        assert!(report.contains("Symphony No. 5 / Strings"));
        for risk in prediction.risk_factors.iter() {
            assert!(report.contains(&risk.description));
        }
        assert!(report.contains("No recurring patterns detected."));
        assert!(report.contains("weekly check"));
    }

    #[test]
    fn empty_report_uses_placeholders() {
        let prediction = predict(
            &[],
            &TargetMetadata::default(),
            AnalysisWindows::default(),
            base_time(),
        );
        let report = build_report(None, &[], &prediction, &[]);
        assert!(report.contains("unnamed target"));
        assert!(report.contains("Not enough evaluations to fit a trend."));
        assert!(report.contains("No rated criteria recorded."));
    }
}
