use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use medquiz_core::{db, import::run_import, verify::verify_catalog, Settings};

#[derive(Parser, Debug)]
#[command(version, about = "MedQuiz catalog maintenance")]
struct Args {
    /// SQLite database file (defaults to the configured path)
    #[arg(short, long, env = "MEDQUIZ_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import every question source below a directory
    Import {
        /// Root directory of the sources (defaults to the configured path)
        root: Option<PathBuf>,

        /// JSON topic table to use instead of the bundled one
        #[arg(long)]
        topics: Option<PathBuf>,

        /// Write the JSON import report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print catalog statistics and integrity checks
    Verify,
}

fn main() -> anyhow::Result<()> {
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "medquiz_core=info,medquiz=info".to_owned());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let mut settings = Settings::load().context("failed to load settings")?;
    if let Some(database) = args.database {
        settings.database_path = database;
    }

    let mut conn = db::init_database(&settings.database_path)
        .with_context(|| format!("failed to open {}", settings.database_path.display()))?;

    match args.command {
        Command::Import { root, topics, report } => {
            if topics.is_some() {
                settings.topics_file = topics;
            }
            let root = root.unwrap_or_else(|| settings.source_root.clone());

            let outcome = run_import(&mut conn, &root, &settings).context("import failed")?;

            if let Some(path) = report {
                std::fs::write(&path, outcome.to_json()?)
                    .with_context(|| format!("failed to write report to {}", path.display()))?;
                tracing::info!("report written to {}", path.display());
            }
        }
        Command::Verify => {
            let verification = verify_catalog(&conn)?;
            tracing::info!(
                quizzes = verification.total_quizzes,
                questions = verification.total_questions,
                average = verification.average_questions_per_quiz(),
                "catalog totals"
            );
            for category in &verification.categories {
                tracing::info!(
                    "{} ({} quizzes, {} questions)",
                    category.category,
                    category.quizzes.len(),
                    category.question_count
                );
                for quiz in &category.quizzes {
                    tracing::info!(
                        "  - {}: {} questions (single: {}, multiple: {})",
                        quiz.title,
                        quiz.question_count,
                        quiz.single_answer_count,
                        quiz.multiple_answer_count
                    );
                }
            }
            if verification.is_healthy() {
                tracing::info!("all checks passed");
            } else {
                for issue in &verification.issues {
                    tracing::warn!("{}", issue);
                }
            }
        }
    }

    Ok(())
}
