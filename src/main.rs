//! # Dyslexify CLI
//!
//! Turns web pages and documents into clean, readable text with a short
//! plain-language summary, stores the result, and exports it as a PDF.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dyslexify init` | Create the SQLite database and schema |
//! | `dyslexify process-url <url>` | Fetch a page, extract and summarize its text |
//! | `dyslexify process-file <path>` | Extract and summarize a .txt, .pdf, .docx or .doc file |
//! | `dyslexify get <id>` | Print a stored record |
//! | `dyslexify export <id>` | Write a stored record as a PDF |
//!
//! ## Examples
//!
//! ```bash
//! dyslexify init --config ./config/dyslexify.toml
//! dyslexify process-url example.com/article
//! dyslexify process-file ./notes.docx
//! dyslexify export 3 --output ./notes.pdf
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use dyslexify::boundary::{self, InputError};
use dyslexify::config::{self, Config};
use dyslexify::error::{ExportError, PersistenceError, PipelineError};
use dyslexify::export;
use dyslexify::get;
use dyslexify::migrate;
use dyslexify::pipeline::{ContentPipeline, Source};
use dyslexify::store::SqliteStore;

/// Dyslexify: readable text and plain-language summaries from web pages
/// and documents.
#[derive(Parser)]
#[command(name = "dyslexify", version)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults apply when the
    /// file does not exist.
    #[arg(long, global = true, default_value = "./config/dyslexify.toml")]
    config: PathBuf,

    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema. Safe to run repeatedly.
    Init,

    /// Extract, summarize and store the main text of a web page.
    ///
    /// A missing scheme is treated as `https://`.
    ProcessUrl { url: String },

    /// Extract, summarize and store the text of a local file.
    ProcessFile { path: PathBuf },

    /// Print a stored record.
    Get { id: i64 },

    /// Export a stored record as a PDF.
    Export {
        id: i64,

        /// Output path. Defaults to `dyslexify_export_<id>.pdf`.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        error!(error = %format!("{:#}", err), "command failed");
        eprintln!("Error: {}", user_message(&err));
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let cfg = load_or_default(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::ProcessUrl { url } => {
            let url = boundary::prepare_url_input(&url)?;
            process(&cfg, Source::RemotePage { url }).await?;
        }
        Commands::ProcessFile { path } => {
            let source = read_upload(&cfg, &path)?;
            process(&cfg, source).await?;
        }
        Commands::Get { id } => {
            get::run_get(&cfg, id).await?;
        }
        Commands::Export { id, output } => {
            run_export(&cfg, id, output).await?;
        }
    }

    Ok(())
}

fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}

/// Apply the upload rules in order: name, then size, then read.
fn read_upload(cfg: &Config, path: &Path) -> Result<Source> {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    boundary::check_upload_name(&filename)?;

    let size = std::fs::metadata(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?
        .len();
    boundary::check_upload_size(size, cfg.upload.max_bytes)?;

    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(Source::UploadedFile { filename, bytes })
}

async fn process(cfg: &Config, source: Source) -> Result<()> {
    let store = Arc::new(SqliteStore::open(cfg).await?);
    let pipeline = ContentPipeline::from_config(cfg, store.clone())?;
    let result = pipeline.process(source).await;
    store.close().await;

    get::print_record(&result?);
    Ok(())
}

async fn run_export(cfg: &Config, id: i64, output: Option<PathBuf>) -> Result<()> {
    let store = SqliteStore::open(cfg).await?;
    let result = export::export_by_id(&store, id).await;
    store.close().await;
    let pdf = result?;

    let output = output.unwrap_or_else(|| PathBuf::from(&pdf.filename));
    std::fs::write(&output, &pdf.bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "Exported record {} to {} ({} bytes)",
        id,
        output.display(),
        pdf.bytes.len()
    );
    Ok(())
}

/// Fixed user-facing text for the error kinds the library defines;
/// anything else (config, I/O) is shown as-is.
fn user_message(err: &anyhow::Error) -> String {
    if let Some(e) = err.downcast_ref::<PipelineError>() {
        return e.user_message().to_string();
    }
    if let Some(e) = err.downcast_ref::<InputError>() {
        return e.user_message().to_string();
    }
    if let Some(e) = err.downcast_ref::<ExportError>() {
        return e.user_message().to_string();
    }
    if let Some(e) = err.downcast_ref::<PersistenceError>() {
        return e.user_message().to_string();
    }
    format!("{:#}", err)
}
