// Outline diffing: added, removed and modified definitions between two
// versions of one file, plus the file's complexity delta.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Definition, SourceOutline, SymbolKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Added,
    Removed,
    Modified,
}

impl ChangeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Modified => "modified",
        }
    }
}

/// One definition that differs between the two versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionChange {
    pub name: String,
    pub qualified_name: String,
    pub kind: SymbolKind,
    pub status: ChangeStatus,
    /// New-side complexity for added/modified, old-side for removed.
    pub complexity: u32,
}

/// Diff between two outlines of the same file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineDiff {
    pub changes: Vec<DefinitionChange>,
    /// Σ new complexity − Σ old complexity.
    pub complexity_delta: i64,
}

/// Definitions sharing a (qualified name, kind) key, folded into one.
struct Folded<'a> {
    first: &'a Definition,
    complexity: u32,
    body_hash: u64,
}

type Key<'a> = (&'a str, SymbolKind);

fn fold(outline: Option<&SourceOutline>) -> (Vec<Key<'_>>, HashMap<Key<'_>, Folded<'_>>) {
    let mut order = Vec::new();
    let mut folded: HashMap<Key<'_>, Folded<'_>> = HashMap::new();

    for def in outline.map(|o| o.definitions.as_slice()).unwrap_or_default() {
        let key = (def.qualified_name.as_str(), def.kind);
        match folded.get_mut(&key) {
            Some(entry) => {
                entry.complexity = entry.complexity.saturating_add(def.complexity);
                entry.body_hash = entry.body_hash.rotate_left(5) ^ def.body_hash;
            }
            None => {
                order.push(key);
                folded.insert(
                    key,
                    Folded {
                        first: def,
                        complexity: def.complexity,
                        body_hash: def.body_hash,
                    },
                );
            }
        }
    }

    (order, folded)
}

/// Compute the diff between two outlines.
///
/// `None` stands for a side that does not exist (added or deleted file).
/// Definitions are keyed by (qualified name, kind); repeated keys within one
/// outline (overloads, redefinitions) fold into a single entry. Added and
/// modified entries follow new-source order, then removed entries follow
/// old-source order.
pub fn diff_outlines(old: Option<&SourceOutline>, new: Option<&SourceOutline>) -> OutlineDiff {
    let (old_order, old_defs) = fold(old);
    let (new_order, new_defs) = fold(new);

    let mut changes = Vec::new();

    for key in &new_order {
        let entry = &new_defs[key];
        let status = match old_defs.get(key) {
            None => ChangeStatus::Added,
            Some(previous) if previous.body_hash != entry.body_hash => ChangeStatus::Modified,
            Some(_) => continue,
        };
        changes.push(change(entry, status));
    }

    for key in &old_order {
        if !new_defs.contains_key(key) {
            let entry = &old_defs[key];
            changes.push(change(entry, ChangeStatus::Removed));
        }
    }

    let total = |defs: &HashMap<Key<'_>, Folded<'_>>| -> i64 {
        defs.values().map(|f| i64::from(f.complexity)).sum()
    };

    OutlineDiff {
        changes,
        complexity_delta: total(&new_defs) - total(&old_defs),
    }
}

fn change(entry: &Folded<'_>, status: ChangeStatus) -> DefinitionChange {
    DefinitionChange {
        name: entry.first.name.clone(),
        qualified_name: entry.first.qualified_name.clone(),
        kind: entry.first.kind,
        status,
        complexity: entry.complexity,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use proptest::prelude::*;

    use super::*;
    use crate::{ResolutionTier, TextRange};

    fn make_def(name: &str, kind: SymbolKind, complexity: u32, body_hash: u64) -> Definition {
        Definition {
            name: name.rsplit('.').next().unwrap_or(name).to_string(),
            qualified_name: name.to_string(),
            kind,
            span: TextRange {
                start_byte: 0,
                end_byte: 10,
                start_row: 0,
                start_col: 0,
                end_row: 1,
                end_col: 0,
            },
            complexity,
            body_hash,
        }
    }

    fn outline(defs: Vec<Definition>) -> SourceOutline {
        SourceOutline {
            file_path: PathBuf::from("test.py"),
            tier: ResolutionTier::Structural,
            definitions: defs,
            references: vec![],
        }
    }

    fn statuses(diff: &OutlineDiff) -> Vec<(&str, ChangeStatus)> {
        diff.changes
            .iter()
            .map(|c| (c.qualified_name.as_str(), c.status))
            .collect()
    }

    #[test]
    fn detects_added_removed_and_modified() {
        let old = outline(vec![
            make_def("keep", SymbolKind::Function, 1, 1),
            make_def("edit", SymbolKind::Function, 1, 2),
            make_def("gone", SymbolKind::Function, 3, 3),
        ]);
        let new = outline(vec![
            make_def("fresh", SymbolKind::Class, 0, 9),
            make_def("keep", SymbolKind::Function, 1, 1),
            make_def("edit", SymbolKind::Function, 4, 20),
        ]);

        let diff = diff_outlines(Some(&old), Some(&new));
        assert_eq!(
            statuses(&diff),
            vec![
                ("fresh", ChangeStatus::Added),
                ("edit", ChangeStatus::Modified),
                ("gone", ChangeStatus::Removed),
            ]
        );
        assert_eq!(diff.changes[2].complexity, 3, "removed uses old-side complexity");
        assert_eq!(diff.complexity_delta, (1 + 4) - (1 + 1 + 3));
    }

    #[test]
    fn same_name_different_kind_are_distinct() {
        let old = outline(vec![make_def("Config", SymbolKind::Class, 0, 1)]);
        let new = outline(vec![make_def("Config", SymbolKind::Module, 0, 1)]);
        let diff = diff_outlines(Some(&old), Some(&new));
        assert_eq!(
            statuses(&diff),
            vec![("Config", ChangeStatus::Added), ("Config", ChangeStatus::Removed)]
        );
    }

    #[test]
    fn added_file_adds_everything() {
        let new = outline(vec![
            make_def("a", SymbolKind::Function, 2, 1),
            make_def("b", SymbolKind::Function, 3, 2),
        ]);
        let diff = diff_outlines(None, Some(&new));
        assert_eq!(diff.changes.len(), 2);
        assert_eq!(diff.complexity_delta, 5);
    }

    #[test]
    fn duplicate_keys_fold() {
        let new = outline(vec![
            make_def("Svc.run", SymbolKind::Function, 2, 1),
            make_def("Svc.run", SymbolKind::Function, 3, 2),
        ]);
        let diff = diff_outlines(None, Some(&new));
        assert_eq!(diff.changes.len(), 1);
        assert_eq!(diff.changes[0].complexity, 5);
    }

    #[test]
    fn identical_outlines_produce_empty_diff() {
        let o = outline(vec![make_def("foo", SymbolKind::Function, 7, 42)]);
        let diff = diff_outlines(Some(&o), Some(&o));
        assert!(diff.changes.is_empty());
        assert_eq!(diff.complexity_delta, 0);
    }

    fn arb_defs() -> impl Strategy<Value = Vec<Definition>> {
        prop::collection::vec(("[a-e]", 0u32..20, 0u64..4), 0..8).prop_map(|items| {
            items
                .into_iter()
                .map(|(name, c, h)| make_def(&name, SymbolKind::Function, c, h))
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn delta_matches_outline_totals(old in arb_defs(), new in arb_defs()) {
            let old = outline(old);
            let new = outline(new);
            let diff = diff_outlines(Some(&old), Some(&new));
            let expected = i64::try_from(new.total_complexity()).unwrap()
                - i64::try_from(old.total_complexity()).unwrap();
            prop_assert_eq!(diff.complexity_delta, expected);
        }
    }
}
