use serde::Serialize;

use crate::evidence::LinkSummary;
use crate::table::Table;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// The four pre-loaded source tables. Only the pull-request table is required;
/// an absent secondary table skips the joins that need it.
#[derive(Debug, Clone)]
pub struct LinkInput {
    pub pull_requests: Table,
    pub repositories: Option<Table>,
    pub classifications: Option<Table>,
    pub commits: Option<Table>,
}

// ---------------------------------------------------------------------------
// Pipeline stages + diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Loaded,
    IdJoined,
    CompletenessChecked,
    NumericFallbackAttempted,
    TitleFallbackAttempted,
    AuxiliaryJoined,
    Classified,
    Finalized,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded => write!(f, "loaded"),
            Self::IdJoined => write!(f, "id_joined"),
            Self::CompletenessChecked => write!(f, "completeness_checked"),
            Self::NumericFallbackAttempted => write!(f, "numeric_fallback_attempted"),
            Self::TitleFallbackAttempted => write!(f, "title_fallback_attempted"),
            Self::AuxiliaryJoined => write!(f, "auxiliary_joined"),
            Self::Classified => write!(f, "classified"),
            Self::Finalized => write!(f, "finalized"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticLevel {
    Info,
    Warn,
}

/// One advisory line produced by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub level: DiagnosticLevel,
    pub message: String,
}

impl Diagnostic {
    pub fn info(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            level: DiagnosticLevel::Info,
            message: message.into(),
        }
    }

    pub fn warn(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            level: DiagnosticLevel::Warn,
            message: message.into(),
        }
    }
}

/// Receives diagnostics as the pipeline runs. The engine never prints.
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Discards everything.
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&mut self, _diagnostic: Diagnostic) {}
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One output row. `security` renders as 0/1, everything else as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalRecord {
    pub id: String,
    pub agent: String,
    #[serde(rename = "type")]
    pub pr_type: String,
    pub confidence: String,
    pub security: bool,
}

impl FinalRecord {
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.agent.clone(),
            self.pr_type.clone(),
            self.confidence.clone(),
            if self.security { "1" } else { "0" }.to_string(),
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkResult {
    pub meta: LinkMeta,
    pub summary: LinkSummary,
    pub records: Vec<FinalRecord>,
    /// Final five-column table, headers from `output.headers`.
    #[serde(skip)]
    pub output: Table,
    /// Full denormalized table after classification, with the security column appended.
    #[serde(skip)]
    pub merged: Table,
}
