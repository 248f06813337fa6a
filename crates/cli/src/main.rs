// clcompare CLI - headless CL spec comparison and pass/fail reports

mod compare;
mod exit_codes;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use compare::{AdHocArgs, GroupByArg, OutputArgs};
use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "clcompare")]
#[command(about = "Compare CL spec data across 2-4 files and report pass/fail against limits")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a comparison from a TOML config file
    #[command(after_help = "\
Examples:
  clcompare run compare.toml
  clcompare run compare.toml --json
  clcompare run compare.toml --xlsx report.xlsx --output result.json
  clcompare run compare.toml --strict-exit")]
    Run {
        /// Path to the comparison config (.toml)
        config: PathBuf,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Validate a comparison config without running
    #[command(after_help = "\
Examples:
  clcompare validate compare.toml")]
    Validate {
        /// Path to the comparison config (.toml)
        config: PathBuf,
    },

    /// List distinct chart group values found in the inputs
    #[command(after_help = "\
Examples:
  clcompare groups compare.toml
  clcompare groups compare.toml --by old-name --json")]
    Groups {
        /// Path to the comparison config (.toml)
        config: PathBuf,

        /// Grouping dimension (defaults to the config's chart setting)
        #[arg(long, value_enum)]
        by: Option<GroupByArg>,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Compare files directly, configured by flags
    #[command(after_help = "\
Examples:
  clcompare compare rev_a.csv rev_b.csv
  clcompare compare a.xlsx b.xlsx c.csv --label A --label B --label C --key basic
  clcompare compare a.csv b.csv --sentinel VSWR --xlsx report.xlsx
  clcompare compare a.csv b.csv --chart-by category --chart-group power --xlsx report.xlsx")]
    Compare {
        /// Input files (2-4); the first carries the limits
        #[arg(required = true, num_args = 2..)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        args: AdHocArgs,

        #[command(flatten)]
        out: OutputArgs,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run { config, out } => compare::cmd_run(config, out),
        Commands::Validate { config } => compare::cmd_validate(config),
        Commands::Groups { config, by, json } => compare::cmd_groups(config, by, json),
        Commands::Compare { files, args, out } => compare::cmd_compare(files, args, out),
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

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
