use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use rehearsal_insights::models::{EvaluationRecord, PredictionResult, TargetMetadata};
use rehearsal_insights::{db, patterns, prediction, report};

#[derive(Parser)]
#[command(name = "rehearsal-insights")]
#[command(about = "Rehearsal progress analytics for music academy ensembles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct WindowArgs {
    /// Latest evaluations considered for quality risks
    #[arg(long, default_value_t = 10)]
    risk_window: usize,
    /// Latest evaluations considered for the weakest-criterion recommendation
    #[arg(long, default_value_t = 20)]
    recommendation_window: usize,
}

impl From<WindowArgs> for prediction::AnalysisWindows {
    fn from(args: WindowArgs) -> Self {
        Self {
            risk_window: args.risk_window,
            recommendation_window: args.recommendation_window,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample works, groups and evaluations
    Seed,
    /// Import evaluations from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Predict completion, risks and recommendations for one work/group
    Predict {
        #[arg(long)]
        work: Uuid,
        #[arg(long)]
        group: Uuid,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        windows: WindowArgs,
    },
    /// Detect weekly performance patterns for one work/group
    Patterns {
        #[arg(long)]
        work: Uuid,
        #[arg(long)]
        group: Uuid,
        /// Include patterns below the confidence threshold
        #[arg(long)]
        all: bool,
    },
    /// Rank every active work/group by risk
    Rank {
        #[arg(long, default_value_t = 60)]
        since_days: i64,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[command(flatten)]
        windows: WindowArgs,
    },
    /// Generate a markdown report for one work/group
    Report {
        #[arg(long)]
        work: Uuid,
        #[arg(long)]
        group: Uuid,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[command(flatten)]
        windows: WindowArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rehearsal_insights=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} evaluations from {}.", csv.display());
        }
        Commands::Predict {
            work,
            group,
            json,
            windows,
        } => {
            let (title, metadata, evaluations) = load_target(&pool, work, group).await?;
            let result =
                prediction::predict(&evaluations, &metadata, windows.into(), Utc::now());

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_prediction(&title, evaluations.len(), &result);
            }
        }
        Commands::Patterns { work, group, all } => {
            let evaluations = db::fetch_evaluations(&pool, work, group).await?;
            let mut detected = patterns::detect_patterns(&evaluations);
            if !all {
                detected = patterns::actionable_patterns(detected);
            }

            if detected.is_empty() {
                println!("No patterns found across {} evaluations.", evaluations.len());
                return Ok(());
            }
            for pattern in detected.iter() {
                println!(
                    "- {} (confidence {:.2})",
                    pattern.description, pattern.confidence
                );
            }
        }
        Commands::Rank {
            since_days,
            limit,
            windows,
        } => {
            let now = Utc::now();
            let evaluations =
                db::fetch_evaluations_since(&pool, prediction::since_cutoff(since_days, now))
                    .await?;
            let targets = db::fetch_targets(&pool).await?;
            let (works, groups) = db::fetch_labels(&pool).await?;
            let rankings = prediction::rank_targets(&evaluations, &targets, windows.into(), now);

            if rankings.is_empty() {
                println!("No evaluations found for this window.");
                return Ok(());
            }

            println!("Works by risk score:");
            for ranking in rankings.iter().take(limit) {
                println!(
                    "- {} / {} score {:.2} across {} evaluations ({:?}, completion {})",
                    label(&works, ranking.work_id),
                    label(&groups, ranking.group_id),
                    ranking.risk_score,
                    ranking.evaluation_count,
                    ranking.prediction.trend.direction,
                    ranking.prediction.completion.estimated_completion.date_naive()
                );
            }
        }
        Commands::Report {
            work,
            group,
            out,
            windows,
        } => {
            let (title, metadata, evaluations) = load_target(&pool, work, group).await?;
            let (_, groups) = db::fetch_labels(&pool).await?;
            let result =
                prediction::predict(&evaluations, &metadata, windows.into(), Utc::now());
            let detected = patterns::actionable_patterns(patterns::detect_patterns(&evaluations));
            let target = format!("{title} / {}", label(&groups, group));

            let report = report::build_report(Some(&target), &evaluations, &result, &detected);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn load_target(
    pool: &PgPool,
    work: Uuid,
    group: Uuid,
) -> anyhow::Result<(String, TargetMetadata, Vec<EvaluationRecord>)> {
    let (title, metadata) = db::fetch_target(pool, work)
        .await?
        .with_context(|| format!("work {work} not found"))?;
    let evaluations = db::fetch_evaluations(pool, work, group).await?;
    tracing::debug!(%work, %group, evaluations = evaluations.len(), "loaded target");
    Ok((title, metadata, evaluations))
}

fn label(names: &std::collections::HashMap<Uuid, String>, id: Uuid) -> String {
    names.get(&id).cloned().unwrap_or_else(|| id.to_string())
}

fn print_prediction(title: &str, evaluation_count: usize, result: &PredictionResult) {
    println!("{title}: {evaluation_count} evaluations");
    println!(
        "Trend {:?} (rate {:.1}, confidence {:.2})",
        result.trend.direction, result.trend.rate, result.trend.confidence
    );
    println!(
        "Estimated completion {} (confidence {:.2})",
        result.completion.estimated_completion.date_naive(),
        result.completion.confidence
    );

    if result.risk_factors.is_empty() {
        println!("No risks detected.");
    } else {
        println!("Risks:");
        for risk in result.risk_factors.iter() {
            println!(
                "- [{:?}/{:?}] {} (probability {:.2})",
                risk.kind.risk_type(),
                risk.severity,
                risk.description,
                risk.probability
            );
        }
    }

    if !result.recommendations.is_empty() {
        println!("Recommendations:");
        for recommendation in result.recommendations.iter() {
            println!("- [{:?}] {}", recommendation.priority, recommendation.title);
        }
    }
}
