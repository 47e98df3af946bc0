//! `prlink run` / `prlink validate`: config-driven PR dataset linkage.

use std::path::{Path, PathBuf};

use prlink_recon::table::read_csv_file;
use prlink_recon::{LinkConfig, LinkInput, LinkResult, Table};

use crate::exit_codes::{
    link_exit_code, EXIT_INVALID_CONFIG, EXIT_OUTPUT_WRITE, EXIT_PRIMARY_INPUT, EXIT_USAGE,
};
use crate::logging::TracingSink;
use crate::CliError;

/// Command-line overrides for `prlink run`. Override paths are taken as given
/// (relative to the working directory), config paths relative to the config file.
#[derive(Debug, Default)]
pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub pull_requests: Option<PathBuf>,
    pub repositories: Option<PathBuf>,
    pub classifications: Option<PathBuf>,
    pub commits: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub merged: Option<PathBuf>,
    pub json: bool,
}

fn link_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

/// Read and validate a config file. Unreadable file is a usage error,
/// bad contents an invalid-config error.
pub fn load_config(path: &Path) -> Result<LinkConfig, CliError> {
    let config_str = std::fs::read_to_string(path)
        .map_err(|e| link_err(EXIT_USAGE, format!("cannot read config {}: {e}", path.display())))?;
    LinkConfig::from_toml(&config_str).map_err(|e| CliError {
        code: EXIT_INVALID_CONFIG,
        message: format!("{}: {e}", path.display()),
        hint: Some("run `prlink validate <config>` after editing".to_string()),
    })
}

fn pick_path(base_dir: &Path, configured: &str, overridden: Option<PathBuf>) -> PathBuf {
    overridden.unwrap_or_else(|| base_dir.join(configured))
}

/// Secondary tables degrade to `None`: the engine then skips the joins that need them.
fn load_secondary(name: &str, path: &Path) -> Option<Table> {
    match read_csv_file(name, path) {
        Ok(table) => {
            tracing::info!(table = name, rows = table.len(), "loaded {}", path.display());
            Some(table)
        }
        Err(e) => {
            tracing::warn!(table = name, "{e}; continuing without it");
            None
        }
    }
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let (config, base_dir) = match &args.config {
        Some(path) => {
            let config = load_config(path)?;
            let base = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
            (config, base)
        }
        None => (LinkConfig::default(), PathBuf::from(".")),
    };
    tracing::info!(config = %config.name, "starting linkage run");

    let pr_path = pick_path(&base_dir, &config.inputs.pull_requests, args.pull_requests);
    let pull_requests = read_csv_file("pull_requests", &pr_path).map_err(|e| CliError {
        code: EXIT_PRIMARY_INPUT,
        message: e.to_string(),
        hint: Some("pass --pull-requests <file> or set inputs.pull_requests".to_string()),
    })?;
    tracing::info!(table = "pull_requests", rows = pull_requests.len(), "loaded {}", pr_path.display());

    let input = LinkInput {
        pull_requests,
        repositories: load_secondary(
            "repositories",
            &pick_path(&base_dir, &config.inputs.repositories, args.repositories),
        ),
        classifications: load_secondary(
            "classifications",
            &pick_path(&base_dir, &config.inputs.classifications, args.classifications),
        ),
        commits: load_secondary(
            "commits",
            &pick_path(&base_dir, &config.inputs.commits, args.commits),
        ),
    };

    let mut sink = TracingSink::default();
    let result = prlink_recon::run(&config, &input, &mut sink)
        .map_err(|e| link_err(link_exit_code(&e), e.to_string()))?;

    let output_path = pick_path(&base_dir, &config.output.file, args.output);
    write_table(&result.output, &output_path)?;

    let merged_path = args
        .merged
        .or_else(|| config.output.merged.as_ref().map(|m| base_dir.join(m)));
    if let Some(path) = merged_path {
        write_table(&result.merged, &path)?;
    }

    if args.json {
        let json_str = serde_json::to_string_pretty(&result)
            .map_err(|e| link_err(EXIT_OUTPUT_WRITE, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    print_summary(&result, sink.warnings);
    Ok(())
}

fn write_table(table: &Table, path: &Path) -> Result<(), CliError> {
    table
        .write_csv_file(path)
        .map_err(|e| link_err(EXIT_OUTPUT_WRITE, e.to_string()))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

// Human summary to stderr
fn print_summary(result: &LinkResult, warnings: usize) {
    let s = &result.summary;
    eprintln!(
        "linked {} PR rows into {} output rows: {} id-matched, {} type / {} confidence filled, {} security-flagged",
        s.primary_rows, s.output_rows, s.id_matched, s.type_filled, s.confidence_filled, s.security_flagged,
    );
    if s.multiplied_rows() > 0 {
        eprintln!("note: {} extra rows from one-to-many joins", s.multiplied_rows());
    }
    if warnings > 0 {
        eprintln!("{warnings} warning(s); set PRLINK_LOG=warn to list only those");
    }
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    eprintln!(
        "valid: '{}' with {} security keyword(s), output {} [{}]",
        config.name,
        config.security.keywords.len(),
        config.output.file,
        config.output.headers.ordered().join(","),
    );
    Ok(())
}
