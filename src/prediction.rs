use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::completion::predict_completion;
use crate::models::{EvaluationRecord, PredictionResult, TargetMetadata};
use crate::recommendation::generate_recommendations;
use crate::risk::assess_risks;
use crate::trend::analyze_trend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisWindows {
    /// Latest evaluations considered for quality risk.
    pub risk_window: usize,
    /// Latest evaluations considered for the weakest-criterion recommendation.
    pub recommendation_window: usize,
}

impl Default for AnalysisWindows {
    fn default() -> Self {
        Self {
            risk_window: 10,
            recommendation_window: 20,
        }
    }
}

/// Full prediction for one (work, group) series.
pub fn predict(
    records: &[EvaluationRecord],
    metadata: &TargetMetadata,
    windows: AnalysisWindows,
    now: DateTime<Utc>,
) -> PredictionResult {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|record| record.evaluated_at);

    let trend = analyze_trend(&sorted);
    let risk_factors = assess_risks(metadata, latest(&sorted, windows.risk_window), &trend, now);
    let recommendations =
        generate_recommendations(&risk_factors, latest(&sorted, windows.recommendation_window));
    let completion = predict_completion(metadata.deadline, &trend, now);

    tracing::debug!(
        evaluations = sorted.len(),
        direction = ?trend.direction,
        risks = risk_factors.len(),
        recommendations = recommendations.len(),
        "prediction computed"
    );

    PredictionResult {
        completion,
        risk_factors,
        recommendations,
        trend,
    }
}

/// Tail of a chronologically sorted slice.
fn latest(sorted: &[EvaluationRecord], window: usize) -> &[EvaluationRecord] {
    &sorted[sorted.len().saturating_sub(window)..]
}

/// Start of the look-back window used when ranking targets. At least one day.
pub fn since_cutoff(since_days: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(since_days.max(1))
}

/// Severity-weighted sum of risk probabilities.
pub fn risk_score(result: &PredictionResult) -> f64 {
    result
        .risk_factors
        .iter()
        .map(|risk| risk.severity.weight() * risk.probability)
        .sum()
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetRanking {
    pub work_id: Uuid,
    pub group_id: Uuid,
    pub evaluation_count: usize,
    pub risk_score: f64,
    pub prediction: PredictionResult,
}

/// Predicts every (work, group) pair in `records` and orders them by risk.
pub fn rank_targets(
    records: &[EvaluationRecord],
    metadata: &HashMap<Uuid, TargetMetadata>,
    windows: AnalysisWindows,
    now: DateTime<Utc>,
) -> Vec<TargetRanking> {
    let mut grouped: HashMap<(Uuid, Uuid), Vec<EvaluationRecord>> = HashMap::new();
    for record in records {
        grouped
            .entry((record.work_id, record.group_id))
            .or_default()
            .push(record.clone());
    }

    let default_metadata = TargetMetadata::default();
    let mut rankings: Vec<TargetRanking> = grouped
        .into_iter()
        .map(|((work_id, group_id), series)| {
            let target = metadata.get(&work_id).unwrap_or(&default_metadata);
            let prediction = predict(&series, target, windows, now);
            TargetRanking {
                work_id,
                group_id,
                evaluation_count: series.len(),
                risk_score: risk_score(&prediction),
                prediction,
            }
        })
        .collect();

    rankings.sort_by(|a, b| {
        b.risk_score
            .partial_cmp(&a.risk_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| (a.work_id, a.group_id).cmp(&(b.work_id, b.group_id)))
    });
    rankings
}
