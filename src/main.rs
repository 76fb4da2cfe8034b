use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

mod db;
mod error;
#[cfg(test)]
mod memory;
mod models;
mod repo;
mod report;
mod scoring;
mod stats;
mod store;

use db::PgRecordStore;
use models::{GradePayload, ScoreEntry};
use store::ScoreUpdate;

#[derive(Parser)]
#[command(name = "gradebook")]
#[command(about = "Grade scoring and aggregation engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import score entries from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Create a grade record from a JSON payload
    Create {
        /// JSON document; legacy payloads may use "student_id"
        #[arg(long)]
        json: String,
    },
    /// Fetch a grade record by id
    Get {
        id: Uuid,
    },
    /// Append a score entry to a record
    AddScore {
        id: Uuid,
        /// JSON score entry, e.g. {"type":"quiz","score":88}
        #[arg(long)]
        json: String,
    },
    /// Remove every score entry equal to the given one
    RemoveScore {
        id: Uuid,
        #[arg(long)]
        json: String,
    },
    /// Delete a grade record by id
    Delete {
        id: Uuid,
    },
    /// List a learner's grade records
    Learner {
        id: i64,
        #[arg(long)]
        class: Option<i32>,
    },
    /// Delete all of a learner's grade records
    DeleteLearner {
        id: i64,
    },
    /// List a class's grade records
    Class {
        id: i32,
        #[arg(long)]
        learner: Option<i64>,
    },
    /// Cohort pass-rate statistic
    Stats {
        #[arg(long, default_value_t = stats::DEFAULT_THRESHOLD)]
        threshold: f64,
    },
    /// Weighted average per class for one learner
    ClassAverages {
        learner: i64,
    },
    /// Generate a markdown cohort report
    Report {
        #[arg(long, default_value_t = stats::DEFAULT_THRESHOLD)]
        threshold: f64,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gradebook=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;
    let store = PgRecordStore::new(pool.clone());

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&store).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let appended = db::import_csv(&store, &csv).await?;
            println!("Imported {appended} score entries from {}.", csv.display());
        }
        Commands::Create { json } => {
            let payload: GradePayload =
                serde_json::from_str(&json).context("invalid grade payload")?;
            let id = repo::create(&store, payload).await?;
            println!("Created grade record {id}.");
        }
        Commands::Get { id } => match repo::get_by_id(&store, id).await {
            Ok(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            Err(err) if err.is_not_found() => println!("Grade record not found."),
            Err(err) => return Err(err.into()),
        },
        Commands::AddScore { id, json } => {
            let entry: ScoreEntry = serde_json::from_str(&json).context("invalid score entry")?;
            match repo::update_scores(&store, id, ScoreUpdate::Append(entry)).await {
                Ok(()) => println!("Score added."),
                Err(err) if err.is_not_found() => println!("Grade record not found."),
                Err(err) => return Err(err.into()),
            }
        }
        Commands::RemoveScore { id, json } => {
            let entry: ScoreEntry = serde_json::from_str(&json).context("invalid score entry")?;
            match repo::update_scores(&store, id, ScoreUpdate::Remove(entry)).await {
                Ok(()) => println!("Matching scores removed."),
                Err(err) if err.is_not_found() => println!("Grade record not found."),
                Err(err) => return Err(err.into()),
            }
        }
        Commands::Delete { id } => match repo::delete_by_id(&store, id).await {
            Ok(()) => println!("Grade record deleted."),
            Err(err) if err.is_not_found() => println!("Grade record not found."),
            Err(err) => return Err(err.into()),
        },
        Commands::Learner { id, class } => {
            match repo::find_by_learner(&store, id, class).await {
                Ok(records) => println!("{}", serde_json::to_string_pretty(&records)?),
                Err(err) if err.is_not_found() => {
                    println!("No grades found for this learner.")
                }
                Err(err) => return Err(err.into()),
            }
        }
        Commands::DeleteLearner { id } => match repo::delete_by_learner(&store, id).await {
            Ok(deleted) => println!("Deleted {deleted} grade records for learner {id}."),
            Err(err) if err.is_not_found() => println!("No grades found for this learner."),
            Err(err) => return Err(err.into()),
        },
        Commands::Class { id, learner } => {
            match repo::find_by_class(&store, id, learner).await {
                Ok(records) => println!("{}", serde_json::to_string_pretty(&records)?),
                Err(err) if err.is_not_found() => println!("No grades found for this class."),
                Err(err) => return Err(err.into()),
            }
        }
        Commands::Stats { threshold } => {
            let cohort = stats::cohort_above_threshold(&store, threshold).await?;
            println!("{}", serde_json::to_string_pretty(&cohort)?);
        }
        Commands::ClassAverages { learner } => {
            match stats::learner_class_averages(&store, learner).await {
                Ok(averages) => println!("{}", serde_json::to_string_pretty(&averages)?),
                Err(err) if err.is_not_found() => {
                    println!("No grades found for this learner.")
                }
                Err(err) => return Err(err.into()),
            }
        }
        Commands::Report { threshold, out } => {
            let cohort = stats::cohort_above_threshold(&store, threshold).await?;
            let averages = stats::learner_averages(&store).await?;
            let report = report::build_report(threshold, &cohort, &averages);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
