//! Fuzzy column resolution.
//!
//! Candidates are lowercase name fragments, most specific first. For each
//! candidate in order, the first column (in the table's original order) whose
//! lowercased name contains the fragment wins. Later columns never beat an
//! earlier one for the same candidate, even if they are a better semantic fit.

use crate::table::Table;

/// A column picked by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub index: usize,
    pub name: String,
    /// The candidate fragment that matched.
    pub candidate: String,
}

/// Resolve over a bare list of column names.
pub fn resolve_in<S: AsRef<str>>(headers: &[String], candidates: &[S]) -> Option<ResolvedColumn> {
    resolve_in_excluding(headers, candidates, &[])
}

/// Like [`resolve_in`], but columns at `claimed` indices are never picked.
pub fn resolve_in_excluding<S: AsRef<str>>(
    headers: &[String],
    candidates: &[S],
    claimed: &[usize],
) -> Option<ResolvedColumn> {
    let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
    for candidate in candidates {
        let candidate = candidate.as_ref().to_lowercase();
        if candidate.is_empty() {
            continue;
        }
        let hit = lowered
            .iter()
            .enumerate()
            .position(|(i, h)| !claimed.contains(&i) && h.contains(&candidate));
        if let Some(index) = hit {
            return Some(ResolvedColumn {
                index,
                name: headers[index].clone(),
                candidate,
            });
        }
    }
    None
}

/// Resolve a semantic column in `table`. `None` means "not found", which is
/// not an error; callers decide whether absence is fatal.
pub fn resolve<S: AsRef<str>>(table: &Table, candidates: &[S]) -> Option<ResolvedColumn> {
    resolve_in(table.headers(), candidates)
}

/// [`resolve`] that skips columns already bound to another field.
pub fn resolve_excluding<S: AsRef<str>>(
    table: &Table,
    candidates: &[S],
    claimed: &[usize],
) -> Option<ResolvedColumn> {
    resolve_in_excluding(table.headers(), candidates, claimed)
}

/// Exact-name lookup over `names` in order, then `name + suffix` for each suffix.
pub fn resolve_exact_with_suffixes<S: AsRef<str>>(
    table: &Table,
    names: &[S],
    suffixes: &[S],
) -> Option<ResolvedColumn> {
    let exact = |name: &str| {
        table.column_index(name).map(|index| ResolvedColumn {
            index,
            name: name.to_string(),
            candidate: name.to_string(),
        })
    };

    names
        .iter()
        .find_map(|n| exact(n.as_ref()))
        .or_else(|| {
            names.iter().find_map(|n| {
                suffixes
                    .iter()
                    .find_map(|s| exact(&format!("{}{}", n.as_ref(), s.as_ref())))
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str]) -> Table {
        Table::from_rows("t", headers, &[])
    }

    #[test]
    fn first_candidate_wins_over_later_candidates() {
        let t = table(&["PRID", "PRTITLE", "PRTYPE"]);
        let col = resolve(&t, &["type", "title"]).unwrap();
        assert_eq!(col.name, "PRTYPE");
        assert_eq!(col.candidate, "type");
    }

    #[test]
    fn case_insensitive_substring() {
        let t = table(&["Title", "AgentName"]);
        assert_eq!(resolve(&t, &["agent"]).unwrap().index, 1);
    }

    #[test]
    fn tie_break_is_original_column_order() {
        let t = table(&["REPOID", "ID", "PRID"]);
        let col = resolve(&t, &["id"]).unwrap();
        assert_eq!(col.name, "REPOID");
        assert_eq!(col.index, 0);
    }

    #[test]
    fn claimed_columns_are_skipped() {
        let t = table(&["REPOID", "TITLE", "CONFIDENCE"]);
        assert!(resolve_in_excluding(t.headers(), &["id"], &[0, 2]).is_none());
        assert_eq!(resolve_in_excluding(t.headers(), &["id"], &[0]).unwrap().name, "CONFIDENCE");
    }

    #[test]
    fn not_found_is_none() {
        let t = table(&["SHA", "MESSAGE"]);
        assert!(resolve(&t, &["confidence", "conf"]).is_none());
    }

    #[test]
    fn empty_candidates_are_skipped() {
        let t = table(&["A"]);
        assert!(resolve(&t, &[""]).is_none());
    }

    #[test]
    fn exact_then_suffix_variants() {
        let t = table(&["ID", "PRTYPE_cls", "CONFIDENCE"]);
        let ty = resolve_exact_with_suffixes(&t, &["PRTYPE"], &["_cls", "_commit"]).unwrap();
        assert_eq!(ty.name, "PRTYPE_cls");
        let conf = resolve_exact_with_suffixes(&t, &["CONFIDENCE"], &["_cls"]).unwrap();
        assert_eq!(conf.index, 2);
        assert!(resolve_exact_with_suffixes(&t, &["REASON"], &["_cls"]).is_none());
    }
}
