use serde::Serialize;

use crate::model::Stage;
use crate::table::Table;

/// Completeness snapshot taken after a pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub rows: usize,
    pub type_filled: usize,
    pub confidence_filled: usize,
}

impl StageReport {
    pub fn capture(stage: Stage, table: &Table, type_col: Option<usize>, confidence_col: Option<usize>) -> Self {
        Self {
            stage,
            rows: table.len(),
            type_filled: type_col.map(|c| table.filled_count(c)).unwrap_or(0),
            confidence_filled: confidence_col.map(|c| table.filled_count(c)).unwrap_or(0),
        }
    }
}

/// Cells filled by one fallback strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FillCounts {
    pub attempted: bool,
    pub pr_type: usize,
    pub confidence: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkSummary {
    pub primary_rows: usize,
    pub output_rows: usize,
    /// Primary rows that matched at least one classification row by string ID.
    pub id_matched: usize,
    pub numeric_filled: FillCounts,
    pub title_filled: FillCounts,
    pub repository_matched: usize,
    /// Primary rows that matched at least one commit-detail row.
    pub commit_matched: usize,
    pub security_flagged: usize,
    pub type_filled: usize,
    pub confidence_filled: usize,
    pub stages: Vec<StageReport>,
}

impl LinkSummary {
    /// Output rows beyond the primary row count, caused by one-to-many joins.
    pub fn multiplied_rows(&self) -> usize {
        self.output_rows.saturating_sub(self.primary_rows)
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_counts_filled_cells() {
        let table = Table::from_rows(
            "m",
            &["ID", "TYPE", "CONF"],
            &[&["1", "fix", ""], &["2", "", ""], &["3", "feat", "0.9"]],
        );
        let report = StageReport::capture(Stage::IdJoined, &table, Some(1), Some(2));
        assert_eq!(report.rows, 3);
        assert_eq!(report.type_filled, 2);
        assert_eq!(report.confidence_filled, 1);

        let none = StageReport::capture(Stage::Loaded, &table, None, None);
        assert_eq!(none.type_filled, 0);
    }

    #[test]
    fn multiplied_rows() {
        let summary = LinkSummary {
            primary_rows: 3,
            output_rows: 5,
            ..LinkSummary::default()
        };
        assert_eq!(summary.multiplied_rows(), 2);
    }
}
