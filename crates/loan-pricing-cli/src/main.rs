mod commands;
mod config;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::integrations::{MemoRequestArgs, TranscriptArgs};
use commands::pricing::{PriceArgs, PricingTextArgs};
use commands::session::SessionArgs;
use commands::workbook::{ExportArgs, ImportArgs};
use config::{build_config, ConfigOverrides, LogLevel};

/// Loan pricing for credit committee memos
#[derive(Parser)]
#[command(
    name = "lpc",
    version,
    about = "Loan pricing for credit committee memos",
    long_about = "A CLI for pricing cooperative loans with decimal precision. Computes \
                  association spread, patronage deduction, amortized fees, income and \
                  capital yield, exports one-sheet-per-loan workbooks and prepares the \
                  pricing block of a loan committee memo."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// TOML configuration file
    #[arg(long, global = true, env = "LPC_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true, env = "LPC_LOG_LEVEL")]
    log_level: Option<String>,

    /// Default directory for exported workbooks
    #[arg(long, global = true, env = "LPC_EXPORT_DIR")]
    export_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Price one or more loans (summary and detail views)
    Price(PriceArgs),
    /// Print the pricing block used in the committee memo
    PricingText(PricingTextArgs),
    /// Export loans to an xlsx workbook, one sheet per loan
    Export(ExportArgs),
    /// Read loans back from an exported workbook
    Import(ImportArgs),
    /// Edit a persisted book of up to four loans
    Session(SessionArgs),
    /// Assemble a transcript from saved OCR result pages
    Transcript(TranscriptArgs),
    /// Build the chat messages for the memo drafter
    MemoRequest(MemoRequestArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let config = match build_config(&ConfigOverrides {
        config_file: cli.config.clone(),
        log_level: cli.log_level.clone(),
        export_dir: cli.export_dir.clone(),
    }) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };
    init_tracing(config.log_level);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Price(args) => commands::pricing::run_price(args),
        Commands::PricingText(args) => commands::pricing::run_pricing_text(args),
        Commands::Export(args) => commands::workbook::run_export(args, &config),
        Commands::Import(args) => commands::workbook::run_import(args),
        Commands::Session(args) => commands::session::run_session(args),
        Commands::Transcript(args) => commands::integrations::run_transcript(args),
        Commands::MemoRequest(args) => commands::integrations::run_memo_request(args),
        Commands::Version => {
            println!("lpc {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
