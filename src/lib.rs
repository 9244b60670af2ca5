pub mod commands;
pub mod config;
pub mod error;
pub mod excel;
pub mod models;
pub mod services;
pub mod types;
pub mod upload;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use types::Phase;

#[derive(Parser)]
#[command(name = "document-classifier", version, about = "Batch document classification against the OCR backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Categorize and group every customer's files, then export the rows
    Process {
        /// Spreadsheet with the expected classifications
        #[arg(long)]
        excel: PathBuf,
        /// Folder with one sub-folder per customer
        #[arg(long)]
        folder: PathBuf,
        /// Export path (defaults to Downloads)
        #[arg(long)]
        output: Option<String>,
        /// Backend to use: local or remote
        #[arg(long)]
        server: Option<String>,
        /// Explicit backend base URL, overrides --server
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Show which files would be sent for each customer
    Match {
        #[arg(long)]
        excel: PathBuf,
        #[arg(long)]
        folder: PathBuf,
    },
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Process {
            excel,
            folder,
            output,
            server,
            base_url,
        } => commands::process(commands::ProcessOptions {
            excel_path: &excel,
            folder: &folder,
            output: output.as_deref(),
            server: server.as_deref(),
            base_url: base_url.as_deref(),
        })
        .map(|(phase, _)| phase),
        Commands::Match { excel, folder } => {
            commands::dry_run_match(&excel, &folder).map(|_| Phase::Complete)
        }
    };

    match result {
        Ok(Phase::Error) => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
