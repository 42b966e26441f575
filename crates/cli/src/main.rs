// inactives CLI - inactive-ingredient extraction runs against reference data

mod exit_codes;
mod recon;
mod source;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

const DEFAULT_LOG_FILTER: &str = "inactives=info";
const QUIET_LOG_FILTER: &str = "inactives=warn";

#[derive(Parser)]
#[command(name = "inactives")]
#[command(about = "Validate LLM-extracted inactive ingredients against reference data")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Split an ingredient name into its matching tokens
    #[command(after_help = "\
Examples:
  inactives decompose 'FD&C Yellow No. 6 (Sunset Yellow FCF)'
  inactives decompose 'FD&C Yellow No. 6 (Sunset Yellow FCF)' --remove-parentheses")]
    Decompose {
        /// Ingredient name
        text: String,

        /// Drop parenthesized content; names without a parenthetical yield nothing
        #[arg(long)]
        remove_parentheses: bool,
    },

    /// Extract validated identifiers from one answer file
    #[command(after_help = "\
Examples:
  inactives match run.toml answers/0591-0860-01.json
  inactives match run.toml llm_output.txt --json")]
    Match {
        /// Path to the run config
        config: PathBuf,

        /// Answer record (JSON with `group1`) or raw group-1 answer text
        answer: PathBuf,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Reconcile every search in the config's [batch] against ground truth
    #[command(after_help = "\
Examples:
  inactives run run.toml
  inactives run run.toml --quiet
  inactives run run.toml --json
  inactives run run.toml --output result.json

Exit code 5 means at least one document disagrees with ground truth.")]
    Run {
        /// Path to the run config
        config: PathBuf,

        /// Output JSON to stdout instead of per-document reports
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// One line per document, warnings only on stderr
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Validate a run config and load every reference table
    #[command(after_help = "\
Examples:
  inactives validate run.toml")]
    Validate {
        /// Path to the run config
        config: PathBuf,
    },

    /// Recompute batch statistics from a previous run log
    #[command(after_help = "\
Examples:
  inactives stats run.toml logs/run_20240501_101500.log")]
    Stats {
        /// Path to the run config (for the alias table)
        config: PathBuf,

        /// Run log written by `inactives run`
        run_log: PathBuf,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  inactives-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_tracing(quiet: bool) {
    let default = if quiet { QUIET_LOG_FILTER } else { DEFAULT_LOG_FILTER };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let quiet = matches!(cli.command, Some(Commands::Run { quiet: true, .. }));
    init_tracing(quiet);

    let result = match cli.command {
        None => {
            // No subcommand = show usage
            eprintln!("Usage: inactives <command> [options]");
            eprintln!("       inactives --help for more information");
            Err(CliError {
                code: EXIT_USAGE,
                message: String::new(),
                hint: None,
            })
        }
        Some(Commands::Decompose {
            text,
            remove_parentheses,
        }) => recon::cmd_decompose(text, remove_parentheses),
        Some(Commands::Match {
            config,
            answer,
            json,
        }) => recon::cmd_match(config, answer, json),
        Some(Commands::Run {
            config,
            json,
            output,
            quiet,
        }) => recon::cmd_run(config, json, output, quiet),
        Some(Commands::Validate { config }) => recon::cmd_validate(config),
        Some(Commands::Stats {
            config,
            run_log,
            json,
        }) => recon::cmd_stats(config, run_log, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}
