use anyhow::Result;
use clap::{Parser, Subcommand};
use formsync_core::SchemaVariant;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "formsync")]
#[command(
    about = "Incremental sync of Zuko form sessions into warehouse tables",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, export and load every configured form once
    Run {
        /// Override DAYS_BACK
        #[arg(short, long)]
        days_back: Option<u32>,
        /// Only run these forms (repeatable)
        #[arg(short, long = "form")]
        forms: Vec<String>,
        /// Load into an in-memory warehouse instead of PostgreSQL
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the form registry as JSON
    Forms {
        /// Registry file (defaults to FORMSYNC_FORMS_FILE or forms.json)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Print a table schema descriptor as JSON
    Schema {
        /// `base` or `checkbox`
        variant: SchemaVariant,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: failed to load .env: {e}");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { days_back, forms, dry_run } => {
            commands::run::run(days_back, &forms, dry_run).await?;
        },
        Commands::Forms { file } => commands::inspect::print_forms(file)?,
        Commands::Schema { variant } => commands::inspect::print_schema(variant)?,
    }

    Ok(())
}
