#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::env;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "sift: local-first hybrid retrieval engine",
    long_about = None
)]
struct Cli {
    /// Path to the store database (default: .sift/sift.db under the current directory).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags.
    const fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(next_help_heading = "Write")]
    Add(cmd::add::AddArgs),

    #[command(next_help_heading = "Write")]
    Ingest(cmd::ingest::IngestArgs),

    #[command(next_help_heading = "Read")]
    Search(cmd::search::SearchArgs),

    #[command(next_help_heading = "Read")]
    Docs(cmd::docs::DocsArgs),

    #[command(next_help_heading = "Read")]
    Memory(cmd::memory::MemoryArgs),

    #[command(next_help_heading = "Admin")]
    Clear(cmd::clear::ClearArgs),

    #[command(next_help_heading = "Admin")]
    Info(cmd::info::InfoArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SIFT_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "sift=debug,info"
        } else {
            "sift=info,warn"
        })
    });

    let format = env::var("SIFT_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry.with(fmt::layer().json().with_ansi(false)).init();
        }
        _ => {
            registry.with(fmt::layer().compact()).init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let project_root = std::env::current_dir()?;
    let output = cli.output_mode();
    let db = cli.db.as_deref();

    match cli.command {
        Commands::Add(ref args) => cmd::add::run_add(args, output, &project_root, db),
        Commands::Ingest(ref args) => cmd::ingest::run_ingest(args, output, &project_root, db),
        Commands::Search(ref args) => cmd::search::run_search(args, output, &project_root, db),
        Commands::Docs(ref args) => cmd::docs::run_docs(args, output, &project_root, db),
        Commands::Memory(ref args) => cmd::memory::run_memory(args, output, &project_root, db),
        Commands::Clear(ref args) => cmd::clear::run_clear(args, output, &project_root, db),
        Commands::Info(ref args) => cmd::info::run_info(args, output, &project_root, db),
    }
}
