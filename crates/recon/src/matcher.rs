use std::collections::HashMap;

use crate::normalize::KeyStrategy;
use crate::table::{is_blank, Table};

// ---------------------------------------------------------------------------
// Left join
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct JoinOutput {
    pub table: Table,
    /// Name each right-hand column received in `table`, in right-table order.
    pub right_names: Vec<String>,
    /// Left rows that matched at least one right row.
    pub matched_rows: usize,
}

impl JoinOutput {
    /// Index in the joined table of right-table column `right_col`.
    pub fn right_index(&self, right_col: usize) -> Option<usize> {
        self.right_names
            .get(right_col)
            .and_then(|name| self.table.column_index(name))
    }
}

/// Left join `left` to `right` on keys derived with `strategy`.
///
/// Every left row is kept. A left row matching N right rows yields N output
/// rows (one-to-many joins multiply rows). Empty keys never match. Right
/// columns whose names collide with existing ones get `suffix` appended.
pub fn left_join(
    left: &Table,
    left_key: usize,
    right: &Table,
    right_key: usize,
    strategy: KeyStrategy,
    suffix: &str,
) -> JoinOutput {
    let mut right_index: HashMap<String, Vec<usize>> = HashMap::new();
    for (ri, value) in right.column_values(right_key).enumerate() {
        let key = strategy.key(value);
        if !key.is_empty() {
            right_index.entry(key).or_default().push(ri);
        }
    }

    let mut headers = left.headers().to_vec();
    let mut right_names = Vec::with_capacity(right.headers().len());
    for name in right.headers() {
        let mut unique = name.clone();
        while headers.contains(&unique) {
            unique.push_str(suffix);
        }
        headers.push(unique.clone());
        right_names.push(unique);
    }

    let mut table = Table::new(left.name.clone(), headers);
    let empty_right = vec![String::new(); right.headers().len()];
    let mut matched_rows = 0;

    for (li, left_row) in left.rows().iter().enumerate() {
        let key = strategy.key(left.cell(li, left_key));
        match right_index.get(&key) {
            Some(hits) => {
                matched_rows += 1;
                for &ri in hits {
                    let mut row = left_row.clone();
                    row.extend(right.rows()[ri].iter().cloned());
                    table.push_row(row);
                }
            }
            None => {
                let mut row = left_row.clone();
                row.extend(empty_right.iter().cloned());
                table.push_row(row);
            }
        }
    }

    JoinOutput {
        table,
        right_names,
        matched_rows,
    }
}

// ---------------------------------------------------------------------------
// Gap filling
// ---------------------------------------------------------------------------

/// Copy `source` (secondary column) into `target` (primary column) where the target is blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillTarget {
    pub target: usize,
    pub source: usize,
}

/// Which secondary row supplies the value when several share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    /// The first row with the key, even if its value is blank.
    FirstRow,
    /// Per target column, the first row with the key and a non-blank value.
    FirstNonEmpty,
}

#[derive(Debug)]
pub struct FillOutput {
    pub table: Table,
    /// Cells filled, per target, same order as the `targets` argument.
    pub filled: Vec<usize>,
}

/// Fill blank cells of `primary` from `secondary` rows whose key matches.
///
/// Never overwrites a non-blank cell and never adds rows: each key resolves to
/// at most one source row per target, chosen by `pick`. Blank source values are
/// never copied. Empty keys never match.
pub fn fill_gaps(
    primary: &Table,
    primary_key: usize,
    secondary: &Table,
    secondary_key: usize,
    strategy: KeyStrategy,
    pick: Pick,
    targets: &[FillTarget],
) -> FillOutput {
    // key -> source row per target
    let mut lookup: HashMap<String, Vec<Option<usize>>> = HashMap::new();
    for (ri, value) in secondary.column_values(secondary_key).enumerate() {
        let key = strategy.key(value);
        if key.is_empty() {
            continue;
        }
        match pick {
            Pick::FirstRow => {
                lookup.entry(key).or_insert_with(|| vec![Some(ri); targets.len()]);
            }
            Pick::FirstNonEmpty => {
                let slots = lookup.entry(key).or_insert_with(|| vec![None; targets.len()]);
                for (slot, t) in slots.iter_mut().zip(targets) {
                    if slot.is_none() && !is_blank(secondary.cell(ri, t.source)) {
                        *slot = Some(ri);
                    }
                }
            }
        }
    }

    let mut table = primary.clone();
    let mut filled = vec![0; targets.len()];

    for row in 0..primary.len() {
        let key = strategy.key(primary.cell(row, primary_key));
        let Some(slots) = lookup.get(&key) else {
            continue;
        };
        for (ti, t) in targets.iter().enumerate() {
            let Some(ri) = slots[ti] else {
                continue;
            };
            if !is_blank(table.cell(row, t.target)) {
                continue;
            }
            let value = secondary.cell(ri, t.source);
            if is_blank(value) {
                continue;
            }
            table.set_cell(row, t.target, value);
            filled[ti] += 1;
        }
    }

    FillOutput { table, filled }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prs() -> Table {
        Table::from_rows(
            "prs",
            &["ID", "TITLE"],
            &[&["PR-1", "Fix race"], &["2", "Docs"], &["", "No id"]],
        )
    }

    #[test]
    fn left_join_keeps_every_left_row() {
        let cls = Table::from_rows("cls", &["PRID", "PRTYPE"], &[&["1", "fix"]]);
        let out = left_join(&prs(), 0, &cls, 0, KeyStrategy::StringId, "_cls");
        assert_eq!(out.table.len(), 3);
        assert_eq!(out.matched_rows, 1);
        assert_eq!(out.table.headers(), &["ID", "TITLE", "PRID", "PRTYPE"]);
        assert_eq!(out.table.cell(0, 3), "fix");
        assert_eq!(out.table.cell(1, 3), "");
    }

    #[test]
    fn left_join_multiplies_on_one_to_many() {
        let commits = Table::from_rows(
            "commits",
            &["PRID", "MSG"],
            &[&["1", "a"], &["1", "b"], &["2", "c"]],
        );
        let out = left_join(&prs(), 0, &commits, 0, KeyStrategy::StringId, "_commit");
        assert_eq!(out.table.len(), 4);
        assert_eq!(out.matched_rows, 2);
        assert_eq!(out.table.cell(0, 3), "a");
        assert_eq!(out.table.cell(1, 3), "b");
        assert_eq!(out.table.cell(2, 3), "c");
    }

    #[test]
    fn empty_keys_never_join() {
        let cls = Table::from_rows("cls", &["PRID", "PRTYPE"], &[&["", "ghost"], &["#", "ghost2"]]);
        let out = left_join(&prs(), 0, &cls, 0, KeyStrategy::StringId, "_cls");
        assert_eq!(out.matched_rows, 0);
        assert!(out.table.column_is_blank(3));
    }

    #[test]
    fn colliding_names_get_suffix() {
        let cls = Table::from_rows("cls", &["ID", "TITLE"], &[&["1", "Fix race"]]);
        let out = left_join(&prs(), 0, &cls, 0, KeyStrategy::StringId, "_cls");
        assert_eq!(out.table.headers(), &["ID", "TITLE", "ID_cls", "TITLE_cls"]);
        assert_eq!(out.right_index(1), Some(3));
    }

    #[test]
    fn fill_gaps_never_overwrites() {
        let merged = Table::from_rows(
            "m",
            &["ID", "TYPE"],
            &[&["7", "docs"], &["issue-8", ""]],
        );
        let cls = Table::from_rows("cls", &["PRID", "PRTYPE"], &[&["#7", "fix"], &["8", "feat"]]);
        let out = fill_gaps(&merged, 0, &cls, 0, KeyStrategy::Digits, Pick::FirstRow, &[FillTarget { target: 1, source: 1 }]);
        assert_eq!(out.table.cell(0, 1), "docs");
        assert_eq!(out.table.cell(1, 1), "feat");
        assert_eq!(out.filled, vec![1]);
    }

    #[test]
    fn fill_gaps_first_occurrence_wins_and_no_row_growth() {
        let merged = Table::from_rows("m", &["TITLE", "TYPE"], &[&["Fix Race", ""]]);
        let cls = Table::from_rows(
            "cls",
            &["PRTITLE", "PRTYPE"],
            &[&["fix race ", "fix"], &["FIX RACE", "perf"]],
        );
        let out = fill_gaps(&merged, 0, &cls, 0, KeyStrategy::Title, Pick::FirstRow, &[FillTarget { target: 1, source: 1 }]);
        assert_eq!(out.table.len(), 1);
        assert_eq!(out.table.cell(0, 1), "fix");
    }

    #[test]
    fn fill_gaps_skips_blank_source_values() {
        let merged = Table::from_rows("m", &["ID", "TYPE", "CONF"], &[&["5", "", ""]]);
        let cls = Table::from_rows("cls", &["PRID", "PRTYPE", "CONF"], &[&["5", "", "0.8"]]);
        let targets = [
            FillTarget { target: 1, source: 1 },
            FillTarget { target: 2, source: 2 },
        ];
        let out = fill_gaps(&merged, 0, &cls, 0, KeyStrategy::Digits, Pick::FirstRow, &targets);
        assert_eq!(out.filled, vec![0, 1]);
        assert_eq!(out.table.cell(0, 1), "");
        assert_eq!(out.table.cell(0, 2), "0.8");
    }

    #[test]
    fn first_non_empty_skips_blank_duplicates() {
        let merged = Table::from_rows("m", &["ID", "CONF"], &[&["101", ""]]);
        let cls = Table::from_rows(
            "cls",
            &["PRID", "CONF"],
            &[&["pr-101", ""], &["issue-101", "0.7"], &["101", "0.1"]],
        );
        let target = [FillTarget { target: 1, source: 1 }];

        let first_row = fill_gaps(&merged, 0, &cls, 0, KeyStrategy::Digits, Pick::FirstRow, &target);
        assert_eq!(first_row.filled, vec![0]);

        let first_value = fill_gaps(&merged, 0, &cls, 0, KeyStrategy::Digits, Pick::FirstNonEmpty, &target);
        assert_eq!(first_value.table.cell(0, 1), "0.7");
    }
}
