use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Local, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use neuro_risk_engine::db::{self, PgStore};
use neuro_risk_engine::{report, Engine, EngineConfig};

#[derive(Parser)]
#[command(name = "neuro-risk")]
#[command(about = "Developmental scoring and risk engine", long_about = None)]
struct Cli {
    /// JSON file overriding risk weights and thresholds
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Job {
    Profiles,
    CohortStats,
    ZProfiles,
    Trends,
    Risk,
    All,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load demonstration children, assessments and moods
    Seed,
    /// Import assessment scores from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Run a scheduled recompute job over all active children
    Recompute {
        #[arg(value_enum)]
        job: Job,
    },
    /// Write a child's developmental report
    Report {
        #[arg(long)]
        child: Uuid,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        /// Write the numeric payload as JSON instead of markdown
        #[arg(long)]
        json: bool,
    },
    /// Print the structured narrative input for a child as JSON
    Explain {
        #[arg(long)]
        child: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.policy {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load policy {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    let store = Arc::new(PgStore::new(pool));
    let engine = Engine::new(store.clone(), config);
    let today = Local::now().date_naive();

    match cli.command {
        Commands::InitDb => {
            db::init_db(store.pool()).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(store.as_ref(), today).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(store.as_ref(), &csv).await?;
            println!("Inserted {inserted} assessments from {}.", csv.display());
        }
        Commands::Recompute { job } => {
            let now = Utc::now();
            let summary = match job {
                Job::Profiles => engine.recompute_profiles_for_all(now).await?,
                Job::CohortStats => engine.recompute_cohort_stats_for_all(today, now).await?,
                Job::ZProfiles => engine.recompute_z_profiles_for_all(today).await?,
                Job::Trends => engine.recompute_trends_for_all(today).await?,
                Job::Risk => engine.recompute_risk_for_all(today, now).await?,
                Job::All => engine.run_all(today, now).await?.total(),
            };
            println!(
                "Processed {} children ({} failed).",
                summary.processed, summary.failed
            );
        }
        Commands::Report { child, out, json } => {
            let child_report = engine.child_report(child, today).await?;
            let body = if json {
                serde_json::to_string_pretty(&child_report)?
            } else {
                report::render_markdown(&child_report)
            };
            std::fs::write(&out, body)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Explain { child } => {
            let payload = engine.narrative_input(child, today).await?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }

    Ok(())
}
