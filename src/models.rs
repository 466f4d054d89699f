use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::criteria::Criterion;

pub const MAX_SCORE: u8 = 5;

/// Scores for the six criteria. 0 means "not rated".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionScores {
    pub tuning: u8,
    pub articulation: u8,
    pub rhythm: u8,
    pub cohesion: u8,
    pub dynamics: u8,
    pub memorization: u8,
}

impl CriterionScores {
    pub fn get(&self, criterion: Criterion) -> u8 {
        match criterion {
            Criterion::Tuning => self.tuning,
            Criterion::Articulation => self.articulation,
            Criterion::Rhythm => self.rhythm,
            Criterion::Cohesion => self.cohesion,
            Criterion::Dynamics => self.dynamics,
            Criterion::Memorization => self.memorization,
        }
    }

    /// Non-zero scores paired with their criterion.
    pub fn rated(&self) -> impl Iterator<Item = (Criterion, u8)> + '_ {
        Criterion::ALL
            .into_iter()
            .map(|criterion| (criterion, self.get(criterion)))
            .filter(|(_, score)| *score > 0)
    }

    pub fn validate(&self) -> Result<(), EvaluationError> {
        for criterion in Criterion::ALL {
            let score = self.get(criterion);
            if score > MAX_SCORE {
                return Err(EvaluationError::ScoreOutOfRange { criterion, score });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("{criterion} score {score} is outside 0..=5")]
    ScoreOutOfRange { criterion: Criterion, score: u8 },

    #[error("{criterion} score {value} cannot be stored as a score")]
    InvalidStoredScore { criterion: Criterion, value: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub id: Uuid,
    pub work_id: Uuid,
    pub group_id: Uuid,
    pub evaluator_id: Uuid,
    pub scores: CriterionScores,
    pub comment: String,
    pub evaluated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetPriority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    #[default]
    Planned,
    InRehearsal,
    PerformanceReady,
    Archived,
}

/// Per-request metadata about the work being prepared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetMetadata {
    pub deadline: Option<DateTime<Utc>>,
    pub priority: TargetPriority,
    pub status: TargetStatus,
    /// Share of scheduled rehearsals attended, when the caller tracks it.
    pub attendance_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub evaluated_at: DateTime<Utc>,
    pub aggregate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    /// Heuristic magnitude, `|slope| * 100`. Not a percentage.
    pub rate: f64,
    pub confidence: f64,
    pub points: Vec<TrendPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskType {
    Progress,
    Quality,
    Time,
    Attendance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn weight(self) -> f64 {
        match self {
            Severity::Low => 1.0,
            Severity::Medium => 2.0,
            Severity::High => 3.0,
            Severity::Critical => 4.0,
        }
    }
}

/// What triggered a risk factor, with the measurement behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RiskKind {
    Time { days_remaining: i64 },
    Quality { criterion: Criterion, average: f64 },
    Progress { rate: f64 },
    Attendance { attendance_rate: f64 },
}

impl RiskKind {
    pub fn risk_type(&self) -> RiskType {
        match self {
            RiskKind::Time { .. } => RiskType::Time,
            RiskKind::Quality { .. } => RiskType::Quality,
            RiskKind::Progress { .. } => RiskType::Progress,
            RiskKind::Attendance { .. } => RiskType::Attendance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub kind: RiskKind,
    pub severity: Severity,
    pub probability: f64,
    pub description: String,
    pub impact: String,
    pub mitigations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl RecommendationPriority {
    pub fn weight(self) -> u8 {
        match self {
            RecommendationPriority::Urgent => 4,
            RecommendationPriority::High => 3,
            RecommendationPriority::Medium => 2,
            RecommendationPriority::Low => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    Practice,
    Scheduling,
    Resources,
    Technique,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effort {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: RecommendationPriority,
    pub category: RecommendationCategory,
    pub title: String,
    pub description: String,
    pub expected_impact: String,
    pub effort: Effort,
    pub timeline: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionProjection {
    pub estimated_completion: DateTime<Utc>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub completion: CompletionProjection,
    pub risk_factors: Vec<RiskFactor>,
    pub recommendations: Vec<Recommendation>,
    pub trend: TrendAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum PatternKind {
    WeeklyCycle {
        best_day: chrono::Weekday,
        worst_day: chrono::Weekday,
        best_average: f64,
        worst_average: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternResult {
    pub kind: PatternKind,
    pub description: String,
    pub confidence: f64,
    pub actionable: bool,
}

#[derive(Debug, Clone)]
pub struct CriterionSummary {
    pub criterion: Criterion,
    pub rated_count: usize,
    pub average: f64,
}
