// prlink CLI - link heterogeneous pull-request datasets into one table

mod exit_codes;
mod link;
mod logging;

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use prlink_recon::resolver::resolve;
use prlink_recon::table::read_csv_file;
use prlink_recon::SecurityClassifier;

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "prlink")]
#[command(about = "Link pull requests, repositories, classifications and commits into one table")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the linkage pipeline and write the final table
    #[command(after_help = "\
Examples:
  prlink run aidev.prlink.toml
  prlink run aidev.prlink.toml --json > report.json
  prlink run --pull-requests prs.csv --classifications cls.csv --output out.csv
  PRLINK_LOG=warn prlink run aidev.prlink.toml --merged merged.csv")]
    Run {
        /// Path to the .prlink.toml config file (built-in defaults when omitted)
        config: Option<PathBuf>,

        /// Pull-request table (overrides inputs.pull_requests)
        #[arg(long)]
        pull_requests: Option<PathBuf>,

        /// Repository table (overrides inputs.repositories)
        #[arg(long)]
        repositories: Option<PathBuf>,

        /// Classification table (overrides inputs.classifications)
        #[arg(long)]
        classifications: Option<PathBuf>,

        /// Commit-detail table (overrides inputs.commits)
        #[arg(long)]
        commits: Option<PathBuf>,

        /// Final CSV path (overrides output.file)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Also write the full denormalized table here
        #[arg(long)]
        merged: Option<PathBuf>,

        /// Print the run report as JSON on stdout (logs move to stderr)
        #[arg(long)]
        json: bool,
    },

    /// Validate a config without running
    #[command(after_help = "\
Examples:
  prlink validate aidev.prlink.toml")]
    Validate {
        /// Path to the .prlink.toml config file
        config: PathBuf,
    },

    /// Show which column of a CSV file the resolver picks for a candidate list
    #[command(after_help = "\
Examples:
  prlink resolve output3.csv --candidates prid,pr_id,id")]
    Resolve {
        /// CSV file whose header row is inspected
        file: PathBuf,

        /// Candidate name fragments, most specific first
        #[arg(long, value_delimiter = ',', required = true)]
        candidates: Vec<String>,
    },

    /// Print 1 if the text mentions a security keyword, else 0
    #[command(after_help = "\
Examples:
  prlink classify 'Fix XSS in comment renderer'
  git log -1 --format=%B | prlink classify")]
    Classify {
        /// Text to classify (read from stdin when omitted)
        text: Option<String>,

        /// Take the keyword list from this config's [security] table
        #[arg(long)]
        config: Option<PathBuf>,
    },
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
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\nengine:  prlink-recon ",
        env!("CARGO_PKG_VERSION"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let json = matches!(cli.command, Commands::Run { json: true, .. });
    logging::init_tracing(json);

    let result = match cli.command {
        Commands::Run {
            config,
            pull_requests,
            repositories,
            classifications,
            commits,
            output,
            merged,
            json,
        } => link::cmd_run(link::RunArgs {
            config,
            pull_requests,
            repositories,
            classifications,
            commits,
            output,
            merged,
            json,
        }),
        Commands::Validate { config } => link::cmd_validate(config),
        Commands::Resolve { file, candidates } => cmd_resolve(file, candidates),
        Commands::Classify { text, config } => cmd_classify(text, config),
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

fn cmd_resolve(file: PathBuf, candidates: Vec<String>) -> Result<(), CliError> {
    let table = read_csv_file("input", &file).map_err(|e| CliError::args(e.to_string()))?;
    match resolve(&table, candidates.as_slice()) {
        Some(hit) => {
            println!("{}", hit.name);
            tracing::debug!(index = hit.index, candidate = %hit.candidate, "resolved");
            Ok(())
        }
        None => Err(CliError {
            code: EXIT_ERROR,
            message: "not found".to_string(),
            hint: Some(format!("columns: {}", table.headers().join(", "))),
        }),
    }
}

fn cmd_classify(text: Option<String>, config: Option<PathBuf>) -> Result<(), CliError> {
    let classifier = match config {
        Some(path) => SecurityClassifier::new(link::load_config(&path)?.security.keywords.as_slice()),
        None => SecurityClassifier::default(),
    };

    let text = match text {
        Some(t) => t,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| CliError::args(format!("cannot read stdin: {e}")))?;
            buf
        }
    };

    if let Some(keyword) = classifier.first_match(Some(&text)) {
        tracing::debug!(keyword, "security keyword matched");
        println!("1");
    } else {
        println!("0");
    }
    Ok(())
}
