use chrono::{DateTime, Duration, Utc};

use crate::models::{CompletionProjection, TrendAnalysis, TrendDirection, MAX_SCORE};

pub const FALLBACK_HORIZON_DAYS: i64 = 90;
pub const FALLBACK_CONFIDENCE: f64 = 0.1;
pub const READY_PROGRESS: f64 = 0.7;
pub const ON_TRACK_CONFIDENCE_BONUS: f64 = 0.2;
pub const ON_TRACK_CONFIDENCE_CAP: f64 = 0.9;
/// Projections are capped so the resulting date always stays representable.
pub const MAX_HORIZON_DAYS: f64 = 5.0 * 365.0;

/// Readiness estimate in [0, 1] from the latest aggregate score.
pub fn current_progress(trend: &TrendAnalysis) -> f64 {
    trend
        .points
        .last()
        .map(|point| (point.aggregate / f64::from(MAX_SCORE)).clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

pub fn fallback_projection(now: DateTime<Utc>) -> CompletionProjection {
    CompletionProjection {
        estimated_completion: now + Duration::days(FALLBACK_HORIZON_DAYS),
        confidence: FALLBACK_CONFIDENCE,
    }
}

pub fn predict_completion(
    deadline: Option<DateTime<Utc>>,
    trend: &TrendAnalysis,
    now: DateTime<Utc>,
) -> CompletionProjection {
    let Some(deadline) = deadline else {
        return fallback_projection(now);
    };

    let progress = current_progress(trend);
    if progress > READY_PROGRESS && trend.direction == TrendDirection::Improving {
        return CompletionProjection {
            estimated_completion: deadline,
            confidence: (trend.confidence + ON_TRACK_CONFIDENCE_BONUS).min(ON_TRACK_CONFIDENCE_CAP),
        };
    }

    let remaining = 1.0 - progress;
    let weekly_rate = trend.rate / 100.0;
    if weekly_rate <= 0.0 || !weekly_rate.is_finite() {
        return fallback_projection(now);
    }

    let estimated_days = (remaining / (weekly_rate / 7.0)).min(MAX_HORIZON_DAYS);
    let estimated_seconds = (estimated_days * 86_400.0).round() as i64;

    CompletionProjection {
        estimated_completion: now + Duration::seconds(estimated_seconds),
        confidence: trend.confidence,
    }
}
