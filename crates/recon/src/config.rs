use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::classify::DEFAULT_SECURITY_KEYWORDS;
use crate::error::LinkError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LinkConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub inputs: InputsConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub columns: ColumnsConfig,
    #[serde(default)]
    pub suffixes: SuffixConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub diff: DiffConfig,
}

fn default_name() -> String {
    "prlink".into()
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            inputs: InputsConfig::default(),
            output: OutputConfig::default(),
            columns: ColumnsConfig::default(),
            suffixes: SuffixConfig::default(),
            fallback: FallbackConfig::default(),
            security: SecurityConfig::default(),
            diff: DiffConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs + output
// ---------------------------------------------------------------------------

/// Input file paths, relative to the config file's directory.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InputsConfig {
    pub pull_requests: String,
    pub repositories: String,
    pub classifications: String,
    pub commits: String,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            pull_requests: "output1.csv".into(),
            repositories: "output2.csv".into(),
            classifications: "output3.csv".into(),
            commits: "output4.csv".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub file: String,
    /// Optional path for the full denormalized table.
    pub merged: Option<String>,
    pub headers: OutputHeaders,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: "final_output.csv".into(),
            merged: None,
            headers: OutputHeaders::default(),
        }
    }
}

/// Names of the five output columns. Order is fixed: id, agent, type, confidence, security.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputHeaders {
    pub id: String,
    pub agent: String,
    #[serde(rename = "type")]
    pub pr_type: String,
    pub confidence: String,
    pub security: String,
}

impl Default for OutputHeaders {
    fn default() -> Self {
        Self {
            id: "ID".into(),
            agent: "AGENT".into(),
            pr_type: "TYPE".into(),
            confidence: "CONFIDENCE".into(),
            security: "SECURITY".into(),
        }
    }
}

impl OutputHeaders {
    pub fn ordered(&self) -> [&str; 5] {
        [
            self.id.as_str(),
            self.agent.as_str(),
            self.pr_type.as_str(),
            self.confidence.as_str(),
            self.security.as_str(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Column candidates
// ---------------------------------------------------------------------------

fn list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Ranked candidate fragments per semantic column, most specific first.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ColumnsConfig {
    pub pull_requests: PullRequestColumns,
    pub repositories: RepositoryColumns,
    pub classifications: ClassificationColumns,
    pub commits: CommitColumns,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PullRequestColumns {
    pub id: Vec<String>,
    pub title: Vec<String>,
    pub agent: Vec<String>,
    pub body: Vec<String>,
    pub repo_id: Vec<String>,
    pub repo_url: Vec<String>,
}

impl Default for PullRequestColumns {
    fn default() -> Self {
        Self {
            id: list(&["pr_id", "prid", "pull_request_id", "id"]),
            title: list(&["title"]),
            agent: list(&["agentname", "agent_name", "agent"]),
            body: list(&["bodystring", "body"]),
            repo_id: list(&["repoid", "repo_id"]),
            repo_url: list(&["repourl", "repo_url", "url"]),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RepositoryColumns {
    pub id: Vec<String>,
    pub language: Vec<String>,
    pub stars: Vec<String>,
    pub url: Vec<String>,
}

impl Default for RepositoryColumns {
    fn default() -> Self {
        Self {
            id: list(&["repoid", "repo_id", "id"]),
            language: list(&["lang"]),
            stars: list(&["star"]),
            url: list(&["url"]),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassificationColumns {
    pub id: Vec<String>,
    pub title: Vec<String>,
    pub reason: Vec<String>,
    #[serde(rename = "type")]
    pub pr_type: Vec<String>,
    pub confidence: Vec<String>,
}

impl Default for ClassificationColumns {
    fn default() -> Self {
        Self {
            id: list(&["prid", "pr_id", "pull_request_id", "id"]),
            title: list(&["prtitle", "title"]),
            reason: list(&["reason"]),
            pr_type: list(&["prtype", "pr_type", "type"]),
            confidence: list(&["confidence", "conf"]),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CommitColumns {
    pub pr_id: Vec<String>,
    pub sha: Vec<String>,
    pub message: Vec<String>,
    pub filename: Vec<String>,
    pub status: Vec<String>,
    pub additions: Vec<String>,
    pub deletions: Vec<String>,
    pub changes: Vec<String>,
    pub diff: Vec<String>,
}

impl Default for CommitColumns {
    fn default() -> Self {
        Self {
            pr_id: list(&["prid", "pr_id", "pull_request_id"]),
            sha: list(&["sha"]),
            message: list(&["commitmessage", "commit_message", "message", "msg"]),
            filename: list(&["file"]),
            status: list(&["status"]),
            additions: list(&["add"]),
            deletions: list(&["del"]),
            changes: list(&["changecount", "changes"]),
            diff: list(&["diff", "patch"]),
        }
    }
}

/// Semantic field name + its candidates, in declaration order.
pub type FieldCandidates<'a> = Vec<(&'static str, &'a [String])>;

impl PullRequestColumns {
    pub fn fields(&self) -> FieldCandidates<'_> {
        vec![
            ("id", self.id.as_slice()),
            ("title", self.title.as_slice()),
            ("agent", self.agent.as_slice()),
            ("body", self.body.as_slice()),
            ("repo_id", self.repo_id.as_slice()),
            ("repo_url", self.repo_url.as_slice()),
        ]
    }
}

impl RepositoryColumns {
    pub fn fields(&self) -> FieldCandidates<'_> {
        vec![
            ("id", self.id.as_slice()),
            ("language", self.language.as_slice()),
            ("stars", self.stars.as_slice()),
            ("url", self.url.as_slice()),
        ]
    }
}

impl ClassificationColumns {
    pub fn fields(&self) -> FieldCandidates<'_> {
        vec![
            ("id", self.id.as_slice()),
            ("title", self.title.as_slice()),
            ("reason", self.reason.as_slice()),
            ("type", self.pr_type.as_slice()),
            ("confidence", self.confidence.as_slice()),
        ]
    }
}

impl CommitColumns {
    pub fn fields(&self) -> FieldCandidates<'_> {
        vec![
            ("pr_id", self.pr_id.as_slice()),
            ("sha", self.sha.as_slice()),
            ("message", self.message.as_slice()),
            ("filename", self.filename.as_slice()),
            ("status", self.status.as_slice()),
            ("additions", self.additions.as_slice()),
            ("deletions", self.deletions.as_slice()),
            ("changes", self.changes.as_slice()),
            ("diff", self.diff.as_slice()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Suffixes, fallback, security, diff
// ---------------------------------------------------------------------------

/// Appended to secondary-table column names that collide with existing ones.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SuffixConfig {
    pub classification: String,
    pub repository: String,
    pub commit: String,
}

impl Default for SuffixConfig {
    fn default() -> Self {
        Self {
            classification: "_cls".into(),
            repository: "_repo".into(),
            commit: "_commit".into(),
        }
    }
}

impl SuffixConfig {
    pub fn all(&self) -> [&str; 3] {
        [self.classification.as_str(), self.repository.as_str(), self.commit.as_str()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackTrigger {
    /// Run a fallback for a column only when the whole column is still empty.
    #[default]
    ColumnEmpty,
    /// Run it when at least one cell is still empty.
    AnyEmpty,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub numeric: bool,
    pub title: bool,
    pub trigger: FallbackTrigger,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            numeric: true,
            title: true,
            trigger: FallbackTrigger::ColumnEmpty,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub keywords: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            keywords: list(DEFAULT_SECURITY_KEYWORDS),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Strip characters outside a code-safe set from the diff column before joining.
    pub sanitize: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self { sanitize: true }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl LinkConfig {
    pub fn from_toml(input: &str) -> Result<Self, LinkError> {
        let config: LinkConfig =
            toml::from_str(input).map_err(|e| LinkError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LinkError> {
        let tables = [
            ("pull_requests", self.columns.pull_requests.fields()),
            ("repositories", self.columns.repositories.fields()),
            ("classifications", self.columns.classifications.fields()),
            ("commits", self.columns.commits.fields()),
        ];
        for (table, fields) in &tables {
            for (field, candidates) in fields {
                validate_candidates(table, field, candidates)?;
            }
        }

        if self.security.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(LinkError::ConfigValidation(
                "security.keywords must contain at least one keyword".into(),
            ));
        }

        let mut seen = HashSet::new();
        for header in self.output.headers.ordered() {
            if header.trim().is_empty() {
                return Err(LinkError::ConfigValidation(
                    "output.headers entries must be non-empty".into(),
                ));
            }
            if !seen.insert(header) {
                return Err(LinkError::ConfigValidation(format!(
                    "output.headers: duplicate column name '{header}'"
                )));
            }
        }

        if self.suffixes.all().iter().any(|s| s.is_empty()) {
            return Err(LinkError::ConfigValidation(
                "suffixes must be non-empty".into(),
            ));
        }

        Ok(())
    }
}

fn validate_candidates(table: &str, field: &str, candidates: &[String]) -> Result<(), LinkError> {
    if candidates.is_empty() {
        return Err(LinkError::ConfigValidation(format!(
            "columns.{table}.{field}: candidate list is empty"
        )));
    }
    for c in candidates {
        if c.trim().is_empty() {
            return Err(LinkError::ConfigValidation(format!(
                "columns.{table}.{field}: blank candidate"
            )));
        }
        if c.chars().any(|ch| ch.is_uppercase()) {
            return Err(LinkError::ConfigValidation(format!(
                "columns.{table}.{field}: candidate '{c}' must be lowercase"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
