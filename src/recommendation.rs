use crate::models::{
    Effort, EvaluationRecord, Recommendation, RecommendationCategory, RecommendationPriority,
    RiskFactor, RiskKind,
};
use crate::risk::criterion_averages;

/// Lowest criterion average below which a focus recommendation is emitted.
pub const FOCUS_AVERAGE: f64 = 4.0;

/// Rule-based recommendations, sorted by descending priority. `records` is
/// the caller's window of latest evaluations used for the weakest-criterion rule.
pub fn generate_recommendations(
    risks: &[RiskFactor],
    records: &[EvaluationRecord],
) -> Vec<Recommendation> {
    let mut recommendations: Vec<Recommendation> =
        risks.iter().filter_map(recommendation_for_risk).collect();

    recommendations.extend(weakest_criterion_focus(records));

    // sort_by_key is stable, so equal priorities keep insertion order
    recommendations.sort_by_key(|recommendation| {
        std::cmp::Reverse(recommendation.priority.weight())
    });
    recommendations
}

fn recommendation_for_risk(risk: &RiskFactor) -> Option<Recommendation> {
    match &risk.kind {
        RiskKind::Time { .. } => Some(Recommendation {
            priority: RecommendationPriority::Urgent,
            category: RecommendationCategory::Scheduling,
            title: "Intensify rehearsal schedule".to_string(),
            description: "Add rehearsals before the deadline and dedicate them to the sections furthest from ready".to_string(),
            expected_impact: "Recovers preparation time lost to the approaching deadline".to_string(),
            effort: Effort::High,
            timeline: "Immediately".to_string(),
        }),
        RiskKind::Quality { criterion, .. } => {
            let template = criterion.definition().template.as_ref()?;
            Some(Recommendation {
                priority: RecommendationPriority::High,
                category: RecommendationCategory::Technique,
                title: template.title.to_string(),
                description: template.description.to_string(),
                expected_impact: template.expected_impact.to_string(),
                effort: Effort::Medium,
                timeline: template.timeline.to_string(),
            })
        }
        RiskKind::Progress { .. } => Some(Recommendation {
            priority: RecommendationPriority::High,
            category: RecommendationCategory::Practice,
            title: "Restructure practice methodology".to_string(),
            description: "Review how rehearsals are run and split the work into smaller, measurable goals".to_string(),
            expected_impact: "Reverses the declining score trend".to_string(),
            effort: Effort::Medium,
            timeline: "2-4 weeks".to_string(),
        }),
        RiskKind::Attendance { .. } => Some(Recommendation {
            priority: RecommendationPriority::Medium,
            category: RecommendationCategory::Scheduling,
            title: "Stabilize rehearsal attendance".to_string(),
            description: "Publish the rehearsal calendar in advance and follow up on every absence".to_string(),
            expected_impact: "Fewer rehearsals spent re-teaching missed material".to_string(),
            effort: Effort::Low,
            timeline: "1-2 weeks".to_string(),
        }),
    }
}

fn weakest_criterion_focus(records: &[EvaluationRecord]) -> Option<Recommendation> {
    let (criterion, average) = criterion_averages(records)
        .into_iter()
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;

    if average >= FOCUS_AVERAGE {
        return None;
    }

    let definition = criterion.definition();
    Some(Recommendation {
        priority: RecommendationPriority::Medium,
        category: RecommendationCategory::Practice,
        title: format!("Focus on {}", definition.name.to_lowercase()),
        description: format!(
            "{} is the weakest criterion at {average:.1}. {}",
            definition.name,
            definition.tips.join(". ")
        ),
        expected_impact: format!("Raises the {} score toward 4", definition.name.to_lowercase()),
        effort: Effort::Medium,
        timeline: "3-4 weeks".to_string(),
    })
}
