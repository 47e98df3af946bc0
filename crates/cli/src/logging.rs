//! Tracing initialization and the engine diagnostic bridge.

use std::io::IsTerminal;

use prlink_recon::model::{Diagnostic, DiagnosticLevel, DiagnosticSink};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Initialize the `prlink` logging system.
///
/// Reads the `PRLINK_LOG` environment variable (`EnvFilter` syntax, e.g.
/// `PRLINK_LOG=warn`) and falls back to `info`. Log lines go to stdout, or to
/// stderr when `to_stderr` is set so stdout can carry a JSON document.
pub fn init_tracing(to_stderr: bool) {
    let filter = EnvFilter::try_from_env("PRLINK_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    let (writer, ansi) = if to_stderr {
        (BoxMakeWriter::new(std::io::stderr), std::io::stderr().is_terminal())
    } else {
        (BoxMakeWriter::new(std::io::stdout), std::io::stdout().is_terminal())
    };

    // A second init (e.g. in tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(ansi)
        .with_writer(writer)
        .try_init();
}

/// Forwards engine diagnostics to `tracing`, tagged with the pipeline stage.
#[derive(Debug, Default)]
pub struct TracingSink {
    pub warnings: usize,
}

impl DiagnosticSink for TracingSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        match diagnostic.level {
            DiagnosticLevel::Info => {
                tracing::info!(stage = %diagnostic.stage, "{}", diagnostic.message);
            }
            DiagnosticLevel::Warn => {
                self.warnings += 1;
                tracing::warn!(stage = %diagnostic.stage, "{}", diagnostic.message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prlink_recon::Stage;

    #[test]
    fn sink_counts_warnings() {
        let mut sink = TracingSink::default();
        sink.emit(Diagnostic::info(Stage::Loaded, "resolved"));
        sink.emit(Diagnostic::warn(Stage::IdJoined, "skipped"));
        sink.emit(Diagnostic::warn(Stage::Finalized, "missing"));
        assert_eq!(sink.warnings, 2);
    }
}
