use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::criteria::Criterion;
use crate::models::{
    CriterionScores, EvaluationError, EvaluationRecord, TargetMetadata, TargetPriority,
    TargetStatus,
};

const EVALUATION_COLUMNS: &str = "e.id, e.work_id, e.group_id, e.evaluator_id, \
     e.tuning, e.articulation, e.rhythm, e.cohesion, e.dynamics, e.memorization, \
     e.comment, e.evaluated_at";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let works = vec![
        (
            Uuid::parse_str("6f1c2a8e-3b47-4d2a-9e51-7c0d4b2f1a93")?,
            "Dvorak Symphony No. 9",
            NaiveDate::from_ymd_opt(2026, 12, 12).context("invalid date")?,
            "high",
            "in_rehearsal",
            Some(0.72),
        ),
        (
            Uuid::parse_str("b8e4d7c1-5a2f-4e6b-8d3c-1f9a7e2b4c60")?,
            "Holst The Planets: Jupiter",
            NaiveDate::from_ymd_opt(2027, 3, 20).context("invalid date")?,
            "medium",
            "planned",
            None,
        ),
    ];

    for (id, title, target_date, priority, status, attendance_rate) in works.iter().copied() {
        sqlx::query(
            r#"
            INSERT INTO rehearsal_insights.works
            (id, title, target_date, priority, status, attendance_rate)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (title) DO UPDATE
            SET target_date = EXCLUDED.target_date, priority = EXCLUDED.priority,
                status = EXCLUDED.status, attendance_rate = EXCLUDED.attendance_rate
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(target_date)
        .bind(priority)
        .bind(status)
        .bind(attendance_rate)
        .execute(pool)
        .await?;
    }

    let strings = upsert_group(pool, "Strings").await?;
    let brass = upsert_group(pool, "Brass").await?;
    let evaluator = upsert_evaluator(pool, "conductor@academy.example").await?;

    // strings improve steadily, brass decline
    let start = Utc::now() - Duration::weeks(8);
    let series: [(Uuid, Uuid, [i16; 6], &str); 8] = [
        (works[0].0, strings, [3, 3, 3, 3, 2, 1], "First read-through, intonation shaky"),
        (works[0].0, strings, [3, 3, 4, 3, 3, 2], "Tempo steadier in the Largo"),
        (works[0].0, strings, [4, 3, 4, 4, 3, 2], "Better blend between firsts and seconds"),
        (works[0].0, strings, [4, 4, 4, 4, 4, 3], "Finale entries clean"),
        (works[0].0, brass, [4, 4, 4, 3, 4, 3], "Strong chorale"),
        (works[0].0, brass, [3, 4, 3, 3, 3, 3], "Tuning drifting in the chorale"),
        (works[0].0, brass, [2, 3, 3, 3, 3, 2], "Fatigue in the last movement"),
        (works[0].0, brass, [2, 3, 2, 2, 3, 2], "Rhythm lost in the syncopated passage"),
    ];

    for (index, (work_id, group_id, scores, comment)) in series.iter().copied().enumerate() {
        let evaluated_at = start + Duration::weeks(index as i64 % 4 * 2);
        sqlx::query(
            r#"
            INSERT INTO rehearsal_insights.evaluations
            (id, work_id, group_id, evaluator_id, tuning, articulation, rhythm,
             cohesion, dynamics, memorization, comment, evaluated_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(work_id)
        .bind(group_id)
        .bind(evaluator)
        .bind(scores[0])
        .bind(scores[1])
        .bind(scores[2])
        .bind(scores[3])
        .bind(scores[4])
        .bind(scores[5])
        .bind(comment)
        .bind(evaluated_at)
        .bind(format!("seed-{:03}", index + 1))
        .execute(pool)
        .await?;
    }

    Ok(())
}

async fn upsert_group(pool: &PgPool, name: &str) -> anyhow::Result<Uuid> {
    let id = sqlx::query(
        r#"
        INSERT INTO rehearsal_insights.groups (id, name)
        VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

async fn upsert_evaluator(pool: &PgPool, email: &str) -> anyhow::Result<Uuid> {
    let id = sqlx::query(
        r#"
        INSERT INTO rehearsal_insights.evaluators (id, email)
        VALUES ($1, $2)
        ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

async fn upsert_work(pool: &PgPool, title: &str) -> anyhow::Result<Uuid> {
    let id = sqlx::query(
        r#"
        INSERT INTO rehearsal_insights.works (id, title)
        VALUES ($1, $2)
        ON CONFLICT (title) DO UPDATE SET title = EXCLUDED.title
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(title)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

pub async fn fetch_evaluations(
    pool: &PgPool,
    work_id: Uuid,
    group_id: Uuid,
) -> anyhow::Result<Vec<EvaluationRecord>> {
    let query = format!(
        "SELECT {EVALUATION_COLUMNS} \
         FROM rehearsal_insights.evaluations e \
         WHERE e.work_id = $1 AND e.group_id = $2 \
         ORDER BY e.evaluated_at"
    );

    let rows = sqlx::query(&query)
        .bind(work_id)
        .bind(group_id)
        .fetch_all(pool)
        .await?;

    rows.iter().map(evaluation_from_row).collect()
}

pub async fn fetch_evaluations_since(
    pool: &PgPool,
    since: DateTime<Utc>,
) -> anyhow::Result<Vec<EvaluationRecord>> {
    let query = format!(
        "SELECT {EVALUATION_COLUMNS} \
         FROM rehearsal_insights.evaluations e \
         JOIN rehearsal_insights.works w ON w.id = e.work_id \
         WHERE e.evaluated_at >= $1 AND w.status <> 'archived' \
         ORDER BY e.evaluated_at"
    );

    let rows = sqlx::query(&query).bind(since).fetch_all(pool).await?;
    rows.iter().map(evaluation_from_row).collect()
}

fn evaluation_from_row(row: &PgRow) -> anyhow::Result<EvaluationRecord> {
    let scores = CriterionScores {
        tuning: score_column(row, Criterion::Tuning, "tuning")?,
        articulation: score_column(row, Criterion::Articulation, "articulation")?,
        rhythm: score_column(row, Criterion::Rhythm, "rhythm")?,
        cohesion: score_column(row, Criterion::Cohesion, "cohesion")?,
        dynamics: score_column(row, Criterion::Dynamics, "dynamics")?,
        memorization: score_column(row, Criterion::Memorization, "memorization")?,
    };
    scores.validate()?;

    Ok(EvaluationRecord {
        id: row.get("id"),
        work_id: row.get("work_id"),
        group_id: row.get("group_id"),
        evaluator_id: row.get("evaluator_id"),
        scores,
        comment: row.get("comment"),
        evaluated_at: row.get("evaluated_at"),
    })
}

fn score_column(row: &PgRow, criterion: Criterion, column: &str) -> anyhow::Result<u8> {
    let value: i16 = row.try_get(column)?;
    let score = u8::try_from(value).map_err(|_| EvaluationError::InvalidStoredScore {
        criterion,
        value: i64::from(value),
    })?;
    Ok(score)
}

/// Title and metadata of a work, `None` when it does not exist.
pub async fn fetch_target(
    pool: &PgPool,
    work_id: Uuid,
) -> anyhow::Result<Option<(String, TargetMetadata)>> {
    let row = sqlx::query(
        "SELECT id, title, target_date, priority, status, attendance_rate \
         FROM rehearsal_insights.works WHERE id = $1",
    )
    .bind(work_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let title: String = row.get("title");
            Ok(Some((title, metadata_from_row(&row)?)))
        }
        None => Ok(None),
    }
}

pub async fn fetch_targets(pool: &PgPool) -> anyhow::Result<HashMap<Uuid, TargetMetadata>> {
    let rows = sqlx::query(
        "SELECT id, title, target_date, priority, status, attendance_rate \
         FROM rehearsal_insights.works",
    )
    .fetch_all(pool)
    .await?;

    let mut targets: HashMap<Uuid, TargetMetadata> = HashMap::new();
    for row in rows {
        targets.insert(row.get("id"), metadata_from_row(&row)?);
    }
    Ok(targets)
}

pub async fn fetch_labels(
    pool: &PgPool,
) -> anyhow::Result<(HashMap<Uuid, String>, HashMap<Uuid, String>)> {
    let works: HashMap<Uuid, String> = sqlx::query("SELECT id, title FROM rehearsal_insights.works")
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| (row.get("id"), row.get("title")))
        .collect();
    let groups: HashMap<Uuid, String> = sqlx::query("SELECT id, name FROM rehearsal_insights.groups")
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| (row.get("id"), row.get("name")))
        .collect();
    Ok((works, groups))
}

fn metadata_from_row(row: &PgRow) -> anyhow::Result<TargetMetadata> {
    let target_date: Option<NaiveDate> = row.get("target_date");
    let deadline = target_date
        .map(|date| {
            date.and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc())
                .context("invalid target date")
        })
        .transpose()?;

    let priority: String = row.get("priority");
    let status: String = row.get("status");

    Ok(TargetMetadata {
        deadline,
        priority: parse_priority(&priority),
        status: parse_status(&status),
        attendance_rate: row.get("attendance_rate"),
    })
}

fn parse_priority(value: &str) -> TargetPriority {
    match value {
        "low" => TargetPriority::Low,
        "medium" => TargetPriority::Medium,
        "high" => TargetPriority::High,
        other => {
            tracing::warn!("unknown work priority '{other}', using medium");
            TargetPriority::default()
        }
    }
}

fn parse_status(value: &str) -> TargetStatus {
    match value {
        "planned" => TargetStatus::Planned,
        "in_rehearsal" => TargetStatus::InRehearsal,
        "performance_ready" => TargetStatus::PerformanceReady,
        "archived" => TargetStatus::Archived,
        other => {
            tracing::warn!("unknown work status '{other}', using planned");
            TargetStatus::default()
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    work_title: String,
    group_name: String,
    evaluator_email: String,
    tuning: u8,
    articulation: u8,
    rhythm: u8,
    cohesion: u8,
    dynamics: u8,
    memorization: u8,
    comment: String,
    evaluated_at: DateTime<Utc>,
    source_key: Option<String>,
}

impl CsvRow {
    fn scores(&self) -> CriterionScores {
        CriterionScores {
            tuning: self.tuning,
            articulation: self.articulation,
            rhythm: self.rhythm,
            cohesion: self.cohesion,
            dynamics: self.dynamics,
            memorization: self.memorization,
        }
    }
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let scores = row.scores();
        if let Err(err) = scores.validate() {
            tracing::warn!("skipping row {}: {err}", line + 1);
            continue;
        }

        let work_id = upsert_work(pool, &row.work_title).await?;
        let group_id = upsert_group(pool, &row.group_name).await?;
        let evaluator_id = upsert_evaluator(pool, &row.evaluator_email).await?;

        let source_key = row
            .source_key
            .clone()
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO rehearsal_insights.evaluations
            (id, work_id, group_id, evaluator_id, tuning, articulation, rhythm,
             cohesion, dynamics, memorization, comment, evaluated_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(work_id)
        .bind(group_id)
        .bind(evaluator_id)
        .bind(i16::from(scores.tuning))
        .bind(i16::from(scores.articulation))
        .bind(i16::from(scores.rhythm))
        .bind(i16::from(scores.cohesion))
        .bind(i16::from(scores.dynamics))
        .bind(i16::from(scores.memorization))
        .bind(&row.comment)
        .bind(row.evaluated_at)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    tracing::info!(inserted, "evaluation import finished");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_priority_and_status_fall_back_to_defaults() {
        assert_eq!(parse_priority("high"), TargetPriority::High);
        assert_eq!(parse_priority("someday"), TargetPriority::Medium);
        assert_eq!(parse_status("in_rehearsal"), TargetStatus::InRehearsal);
        assert_eq!(parse_status("??"), TargetStatus::Planned);
    }

    #[test]
    fn csv_rows_deserialize_with_optional_source_key() {
        let data = "\
work_title,group_name,evaluator_email,tuning,articulation,rhythm,cohesion,dynamics,memorization,comment,evaluated_at,source_key
Bolero,Winds,conductor@academy.example,3,4,0,3,2,1,Solo entries late,2026-09-14T18:30:00Z,
Bolero,Winds,conductor@academy.example,4,4,4,3,3,2,Cleaner,2026-09-21T18:30:00Z,row-2
";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let rows: Vec<CsvRow> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].source_key, None);
        assert_eq!(rows[0].scores().rhythm, 0);
        assert_eq!(rows[1].source_key.as_deref(), Some("row-2"));
        assert!(rows[1].scores().validate().is_ok());
    }
}
