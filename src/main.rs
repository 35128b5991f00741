use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, SeedableRng};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use trivia_quiz::{
    config::Config,
    importer::{run_import, ImportError},
    server::start_server,
    source::OpenTdb,
    state::AppState,
    store::Store,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Trivia quiz backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace the local database with a fresh copy of the trivia source
    Import,
    /// Serve the quiz API
    Serve,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Import => match import(&config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Import failed: {e}");
                ExitCode::FAILURE
            }
        },
        Command::Serve => match serve(&config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Server failed: {e}");
                ExitCode::FAILURE
            }
        },
    }
}

async fn import(config: &Config) -> Result<(), ImportError> {
    let store = Store::open(&config.db_path)?;
    let source = OpenTdb::new(&config.source_url, config.http_timeout)?;
    let mut rng = StdRng::from_entropy();

    info!(source = %config.source_url, db = %config.db_path, "Starting import");
    let report = run_import(&store, &source, &config.import_options(), &mut rng).await?;

    info!(
        categories = report.categories,
        questions = report.questions,
        skipped = report.skipped.len(),
        "Import complete"
    );
    for skipped in &report.skipped {
        warn!(
            category = skipped.category,
            difficulty = %skipped.difficulty,
            reason = ?skipped.reason,
            "Batch missing from store"
        );
    }

    Ok(())
}

async fn serve(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    info!(db = %config.db_path, "Opening store");
    let store = Store::open(&config.db_path)?;

    start_server(config.port, AppState::new(store, config.quiz_size)).await?;
    Ok(())
}
