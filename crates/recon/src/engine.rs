use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

use crate::classify::SecurityClassifier;
use crate::config::{FallbackTrigger, FieldCandidates, LinkConfig};
use crate::error::LinkError;
use crate::evidence::{FillCounts, LinkSummary, StageReport};
use crate::matcher::{fill_gaps, left_join, FillTarget, Pick};
use crate::model::{Diagnostic, DiagnosticSink, FinalRecord, LinkInput, LinkMeta, LinkResult, Stage};
use crate::normalize::KeyStrategy;
use crate::resolver::{resolve_exact_with_suffixes, resolve_excluding, ResolvedColumn};
use crate::table::{is_blank, Table};

// ---------------------------------------------------------------------------
// Column resolution per table
// ---------------------------------------------------------------------------

/// Semantic field → resolved column for one source table.
#[derive(Debug, Default)]
struct Resolved {
    columns: HashMap<&'static str, ResolvedColumn>,
}

impl Resolved {
    fn get(&self, field: &str) -> Option<&ResolvedColumn> {
        self.columns.get(field)
    }

    fn index(&self, field: &str) -> Option<usize> {
        self.get(field).map(|c| c.index)
    }
}

/// Binds each field to at most one column and each column to at most one
/// field. The key field goes last so a broad fragment like `id` cannot take
/// a column that a more specific field (`repo_id`, `confidence`) matches.
fn resolve_fields(
    table: &Table,
    fields: &FieldCandidates<'_>,
    key_field: &str,
    sink: &mut dyn DiagnosticSink,
) -> Resolved {
    let mut resolved = Resolved::default();
    let mut claimed: Vec<usize> = Vec::new();
    let ordered = fields
        .iter()
        .filter(|(field, _)| *field != key_field)
        .chain(fields.iter().filter(|(field, _)| *field == key_field));
    for &(field, candidates) in ordered {
        match resolve_excluding(table, candidates, &claimed) {
            Some(col) => {
                sink.emit(Diagnostic::info(
                    Stage::Loaded,
                    format!("{}.{field} -> '{}' (via '{}')", table.name, col.name, col.candidate),
                ));
                claimed.push(col.index);
                resolved.columns.insert(field, col);
            }
            None => sink.emit(Diagnostic::warn(
                Stage::Loaded,
                format!("{}.{field}: no column matches {candidates:?}", table.name),
            )),
        }
    }
    resolved
}

fn resolve_optional(
    table: Option<&Table>,
    label: &str,
    fields: &FieldCandidates<'_>,
    key_field: &str,
    sink: &mut dyn DiagnosticSink,
) -> Resolved {
    match table {
        Some(t) => resolve_fields(t, fields, key_field, sink),
        None => {
            sink.emit(Diagnostic::warn(
                Stage::Loaded,
                format!("{label} table not provided; dependent joins will be skipped"),
            ));
            Resolved::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn diff_noise_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9\s.,;:+=_(){}\[\]/-]").expect("static regex"))
}

/// Drop characters outside letters, digits, whitespace and common code punctuation.
pub fn sanitize_diff(raw: &str) -> String {
    diff_noise_re().replace_all(raw, "").into_owned()
}

/// `base`, or `base` + `suffix` repeated until no column of `table` has that name.
fn unique_name(table: &Table, base: &str, suffix: &str) -> String {
    let mut name = base.to_string();
    while table.column_index(&name).is_some() {
        name.push_str(suffix);
    }
    name
}

fn needs_fallback(table: &Table, col: usize, trigger: FallbackTrigger) -> bool {
    match trigger {
        FallbackTrigger::ColumnEmpty => table.column_is_blank(col),
        FallbackTrigger::AnyEmpty => table.filled_count(col) < table.len(),
    }
}

/// The working type/confidence columns in the merged table and their
/// counterparts in the classification table.
struct GapColumns {
    type_col: usize,
    conf_col: usize,
    type_src: Option<usize>,
    conf_src: Option<usize>,
}

impl GapColumns {
    fn pending(&self, merged: &Table, trigger: FallbackTrigger) -> (bool, bool) {
        (
            needs_fallback(merged, self.type_col, trigger),
            needs_fallback(merged, self.conf_col, trigger),
        )
    }
}

/// Run one gap-filling strategy for the columns that still need it.
#[allow(clippy::too_many_arguments)]
fn run_fallback(
    stage: Stage,
    strategy: KeyStrategy,
    merged: Table,
    merged_key: usize,
    cls: &Table,
    cls_key: usize,
    gaps: &GapColumns,
    pending: (bool, bool),
    sink: &mut dyn DiagnosticSink,
) -> (Table, FillCounts) {
    let mut targets = Vec::new();
    let mut type_slot = None;
    let mut conf_slot = None;
    if let (true, Some(source)) = (pending.0, gaps.type_src) {
        type_slot = Some(targets.len());
        targets.push(FillTarget { target: gaps.type_col, source });
    }
    if let (true, Some(source)) = (pending.1, gaps.conf_src) {
        conf_slot = Some(targets.len());
        targets.push(FillTarget { target: gaps.conf_col, source });
    }

    if targets.is_empty() {
        sink.emit(Diagnostic::warn(
            stage,
            format!("{strategy} fallback skipped: classification type/confidence columns unresolved"),
        ));
        return (merged, FillCounts::default());
    }

    // Title matching dedups the classification side by row; id fallbacks take
    // the first non-empty value per key.
    let pick = match strategy {
        KeyStrategy::Title => Pick::FirstRow,
        KeyStrategy::StringId | KeyStrategy::Digits => Pick::FirstNonEmpty,
    };
    let out = fill_gaps(&merged, merged_key, cls, cls_key, strategy, pick, &targets);
    let counts = FillCounts {
        attempted: true,
        pr_type: type_slot.map(|i| out.filled[i]).unwrap_or(0),
        confidence: conf_slot.map(|i| out.filled[i]).unwrap_or(0),
    };
    sink.emit(Diagnostic::info(
        stage,
        format!(
            "{strategy} fallback filled {} type and {} confidence cells",
            counts.pr_type, counts.confidence
        ),
    ));
    (out.table, counts)
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the linkage pipeline over pre-loaded tables.
///
/// Fails only when the pull-request identifier column cannot be resolved.
/// Every other missing column or table degrades to empty output columns with
/// a warning sent to `sink`.
pub fn run(
    config: &LinkConfig,
    input: &LinkInput,
    sink: &mut dyn DiagnosticSink,
) -> Result<LinkResult, LinkError> {
    let cols = &config.columns;
    let trigger = config.fallback.trigger;
    let prs = &input.pull_requests;
    let mut summary = LinkSummary {
        primary_rows: prs.len(),
        ..LinkSummary::default()
    };

    // -- LOADED ------------------------------------------------------------

    let pr = resolve_fields(prs, &cols.pull_requests.fields(), "id", sink);
    let pr_id = pr.index("id").ok_or_else(|| LinkError::MissingKeyColumn {
        table: prs.name.clone(),
        candidates: cols.pull_requests.id.clone(),
    })?;

    let repo = resolve_optional(input.repositories.as_ref(), "repositories", &cols.repositories.fields(), "id", sink);
    let cls = resolve_optional(input.classifications.as_ref(), "classifications", &cols.classifications.fields(), "id", sink);
    let commit = resolve_optional(input.commits.as_ref(), "commits", &cols.commits.fields(), "pr_id", sink);

    let commits: Option<Table> = match (&input.commits, commit.index("diff")) {
        (Some(t), Some(diff)) if config.diff.sanitize => Some(t.map_column(diff, sanitize_diff)),
        (t, _) => t.clone(),
    };

    sink.emit(Diagnostic::info(
        Stage::Loaded,
        format!("{} pull request rows", prs.len()),
    ));
    summary.stages.push(StageReport::capture(Stage::Loaded, prs, None, None));

    // -- ID_JOINED ---------------------------------------------------------

    let mut merged = prs.clone();
    let mut type_col = None;
    let mut conf_col = None;
    let cls_table = input.classifications.as_ref();

    match (cls_table, cls.index("id")) {
        (Some(cls_table), Some(cls_id)) => {
            let out = left_join(
                &merged,
                pr_id,
                cls_table,
                cls_id,
                KeyStrategy::StringId,
                &config.suffixes.classification,
            );
            summary.id_matched = out.matched_rows;
            type_col = cls.index("type").and_then(|c| out.right_index(c));
            conf_col = cls.index("confidence").and_then(|c| out.right_index(c));
            sink.emit(Diagnostic::info(
                Stage::IdJoined,
                format!("id join matched {} of {} rows", out.matched_rows, prs.len()),
            ));
            if out.table.len() > prs.len() {
                sink.emit(Diagnostic::warn(
                    Stage::IdJoined,
                    format!(
                        "duplicate classification ids expanded {} rows to {}",
                        prs.len(),
                        out.table.len()
                    ),
                ));
            }
            merged = out.table;
        }
        _ => sink.emit(Diagnostic::warn(
            Stage::IdJoined,
            "id join skipped: classification identifier column unresolved",
        )),
    }

    // Carry empty working columns for whatever the join did not supply.
    let type_col = match type_col {
        Some(c) => c,
        None => {
            let base = cls.get("type").map(|c| c.name.as_str()).unwrap_or(config.output.headers.pr_type.as_str());
            let name = unique_name(&merged, base, &config.suffixes.classification);
            merged = merged.with_column(name, Vec::new());
            merged.headers().len() - 1
        }
    };
    let conf_col = match conf_col {
        Some(c) => c,
        None => {
            let base = cls
                .get("confidence")
                .map(|c| c.name.as_str())
                .unwrap_or(config.output.headers.confidence.as_str());
            let name = unique_name(&merged, base, &config.suffixes.classification);
            merged = merged.with_column(name, Vec::new());
            merged.headers().len() - 1
        }
    };
    let type_name = merged.headers()[type_col].clone();
    let conf_name = merged.headers()[conf_col].clone();
    summary.stages.push(StageReport::capture(Stage::IdJoined, &merged, Some(type_col), Some(conf_col)));

    let gaps = GapColumns {
        type_col,
        conf_col,
        type_src: cls.index("type"),
        conf_src: cls.index("confidence"),
    };

    // -- COMPLETENESS_CHECKED ----------------------------------------------

    let pending = gaps.pending(&merged, trigger);
    sink.emit(Diagnostic::info(
        Stage::CompletenessChecked,
        format!(
            "type {}/{} filled, confidence {}/{} filled",
            merged.filled_count(type_col),
            merged.len(),
            merged.filled_count(conf_col),
            merged.len()
        ),
    ));
    summary.stages.push(StageReport::capture(Stage::CompletenessChecked, &merged, Some(type_col), Some(conf_col)));

    // -- NUMERIC_FALLBACK_ATTEMPTED ----------------------------------------

    if pending.0 || pending.1 {
        match (cls_table, cls.index("id")) {
            (Some(cls_table), Some(cls_id)) if config.fallback.numeric => {
                let (table, counts) = run_fallback(
                    Stage::NumericFallbackAttempted,
                    KeyStrategy::Digits,
                    merged,
                    pr_id,
                    cls_table,
                    cls_id,
                    &gaps,
                    pending,
                    sink,
                );
                merged = table;
                summary.numeric_filled = counts;
            }
            _ if !config.fallback.numeric => sink.emit(Diagnostic::info(
                Stage::NumericFallbackAttempted,
                "numeric fallback disabled",
            )),
            _ => sink.emit(Diagnostic::warn(
                Stage::NumericFallbackAttempted,
                "numeric fallback skipped: classification identifier column unresolved",
            )),
        }
    }
    summary.stages.push(StageReport::capture(
        Stage::NumericFallbackAttempted,
        &merged,
        Some(type_col),
        Some(conf_col),
    ));

    // -- TITLE_FALLBACK_ATTEMPTED ------------------------------------------

    let pending = gaps.pending(&merged, trigger);
    if pending.0 || pending.1 {
        match (cls_table, pr.index("title"), cls.index("title")) {
            (Some(cls_table), Some(pr_title), Some(cls_title)) if config.fallback.title => {
                let (table, counts) = run_fallback(
                    Stage::TitleFallbackAttempted,
                    KeyStrategy::Title,
                    merged,
                    pr_title,
                    cls_table,
                    cls_title,
                    &gaps,
                    pending,
                    sink,
                );
                merged = table;
                summary.title_filled = counts;
            }
            _ if !config.fallback.title => sink.emit(Diagnostic::info(
                Stage::TitleFallbackAttempted,
                "title fallback disabled",
            )),
            _ => sink.emit(Diagnostic::warn(
                Stage::TitleFallbackAttempted,
                "title fallback skipped: title column unresolved on one side",
            )),
        }
    }
    summary.stages.push(StageReport::capture(
        Stage::TitleFallbackAttempted,
        &merged,
        Some(type_col),
        Some(conf_col),
    ));

    // -- AUXILIARY_JOINED --------------------------------------------------

    match (&input.repositories, pr.index("repo_id"), repo.index("id")) {
        (Some(repos), Some(pr_repo), Some(repo_id)) => {
            let out = left_join(
                &merged,
                pr_repo,
                repos,
                repo_id,
                KeyStrategy::StringId,
                &config.suffixes.repository,
            );
            summary.repository_matched = out.matched_rows;
            sink.emit(Diagnostic::info(
                Stage::AuxiliaryJoined,
                format!("repository join matched {} of {} rows", out.matched_rows, merged.len()),
            ));
            merged = out.table;
        }
        _ => sink.emit(Diagnostic::warn(
            Stage::AuxiliaryJoined,
            "repository join skipped: repo identifier column unresolved",
        )),
    }

    let mut message_col = None;
    match (&commits, commit.index("pr_id")) {
        (Some(commits), Some(commit_pr)) => {
            let before = merged.len();
            let out = left_join(
                &merged,
                pr_id,
                commits,
                commit_pr,
                KeyStrategy::StringId,
                &config.suffixes.commit,
            );
            summary.commit_matched = out.matched_rows;
            message_col = commit.index("message").and_then(|c| out.right_index(c));
            sink.emit(Diagnostic::info(
                Stage::AuxiliaryJoined,
                format!(
                    "commit join matched {} of {} rows ({} -> {} rows)",
                    out.matched_rows,
                    before,
                    before,
                    out.table.len()
                ),
            ));
            merged = out.table;
        }
        _ => sink.emit(Diagnostic::warn(
            Stage::AuxiliaryJoined,
            "commit join skipped: commit pr identifier column unresolved",
        )),
    }
    summary.stages.push(StageReport::capture(Stage::AuxiliaryJoined, &merged, Some(type_col), Some(conf_col)));

    // -- CLASSIFIED --------------------------------------------------------

    let classifier = SecurityClassifier::new(config.security.keywords.as_slice());
    let (title_col, body_col) = (pr.index("title"), pr.index("body"));
    let flags: Vec<bool> = (0..merged.len())
        .map(|row| {
            classifier.classify_parts(&[
                title_col.map(|c| merged.cell(row, c)),
                body_col.map(|c| merged.cell(row, c)),
                message_col.map(|c| merged.cell(row, c)),
            ])
        })
        .collect();
    summary.security_flagged = flags.iter().filter(|f| **f).count();
    sink.emit(Diagnostic::info(
        Stage::Classified,
        format!("{} of {} rows flagged as security-related", summary.security_flagged, merged.len()),
    ));

    let security_name = unique_name(&merged, &config.output.headers.security, &config.suffixes.commit);
    merged = merged.with_column(
        security_name,
        flags.iter().map(|f| if *f { "1" } else { "0" }.to_string()).collect(),
    );
    summary.stages.push(StageReport::capture(Stage::Classified, &merged, Some(type_col), Some(conf_col)));

    // -- FINALIZED ---------------------------------------------------------

    let suffixes = config.suffixes.all();
    let final_type = resolve_exact_with_suffixes(
        &merged,
        &[type_name.as_str(), config.output.headers.pr_type.as_str()],
        &suffixes,
    );
    let final_conf = resolve_exact_with_suffixes(
        &merged,
        &[conf_name.as_str(), config.output.headers.confidence.as_str()],
        &suffixes,
    );
    if final_type.is_none() {
        sink.emit(Diagnostic::warn(Stage::Finalized, "type column unresolved; emitting empty values"));
    }
    if final_conf.is_none() {
        sink.emit(Diagnostic::warn(Stage::Finalized, "confidence column unresolved; emitting empty values"));
    }
    let agent_col = pr.index("agent");

    let cell = |row: usize, col: Option<usize>| col.map(|c| merged.cell(row, c).to_string()).unwrap_or_default();
    let records: Vec<FinalRecord> = (0..merged.len())
        .map(|row| FinalRecord {
            id: merged.cell(row, pr_id).to_string(),
            agent: cell(row, agent_col),
            pr_type: cell(row, final_type.as_ref().map(|c| c.index)),
            confidence: cell(row, final_conf.as_ref().map(|c| c.index)),
            security: flags[row],
        })
        .collect();

    let headers = config.output.headers.ordered().iter().map(|h| h.to_string()).collect();
    let mut output = Table::new("final", headers);
    for record in &records {
        output.push_row(record.to_row());
    }

    summary.output_rows = records.len();
    summary.type_filled = records.iter().filter(|r| !is_blank(&r.pr_type)).count();
    summary.confidence_filled = records.iter().filter(|r| !is_blank(&r.confidence)).count();
    summary.stages.push(StageReport {
        stage: Stage::Finalized,
        rows: records.len(),
        type_filled: summary.type_filled,
        confidence_filled: summary.confidence_filled,
    });

    let distinct: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
    sink.emit(Diagnostic::info(
        Stage::Finalized,
        format!(
            "{} output rows for {} distinct ids ({} type, {} confidence filled)",
            records.len(),
            distinct.len(),
            summary.type_filled,
            summary.confidence_filled
        ),
    ));

    Ok(LinkResult {
        meta: LinkMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        records,
        output,
        merged,
    })
}
