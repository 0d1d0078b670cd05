// Line statistics: parsed from unified diff text when the caller supplies
// one, otherwise computed with a line diff of the two file versions.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use similar::{ChangeTag, TextDiff};

use crate::types::{DiffStats, FileChange, FileStats};

static HUNK_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@@ -\d+(?:,(\d+))? \+\d+(?:,(\d+))? @@").unwrap());

/// Per-file counts and changed lines recovered from unified diff text.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedDiff {
    /// Path → (added, removed).
    pub files: BTreeMap<String, (usize, usize)>,
    /// Bodies of `+`/`-` lines inside hunks, one per line.
    pub changed_lines: Vec<String>,
}

/// Parse `git diff`-style unified diff text.
///
/// Hunk headers are honoured so that `+++`/`---` lines inside a hunk count as
/// changes rather than file headers.
pub fn parse_unified_diff(text: &str) -> ParsedDiff {
    let mut parsed = ParsedDiff::default();
    let mut old_path: Option<String> = None;
    let mut current: Option<String> = None;
    let mut remaining_old = 0usize;
    let mut remaining_new = 0usize;

    for line in text.lines() {
        if remaining_old > 0 || remaining_new > 0 {
            let Some(path) = current.as_ref() else {
                remaining_old = 0;
                remaining_new = 0;
                continue;
            };
            let entry = parsed.files.entry(path.clone()).or_default();
            match line.as_bytes().first() {
                Some(b'+') => {
                    entry.0 += 1;
                    remaining_new = remaining_new.saturating_sub(1);
                    parsed.changed_lines.push(line[1..].to_string());
                }
                Some(b'-') => {
                    entry.1 += 1;
                    remaining_old = remaining_old.saturating_sub(1);
                    parsed.changed_lines.push(line[1..].to_string());
                }
                Some(b'\\') => {}
                _ => {
                    remaining_old = remaining_old.saturating_sub(1);
                    remaining_new = remaining_new.saturating_sub(1);
                }
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("diff --git ") {
            old_path = None;
            current = rest
                .rsplit_once(" b/")
                .map(|(_, b)| b.to_string());
        } else if let Some(path) = line.strip_prefix("--- ") {
            old_path = header_path(path);
        } else if let Some(path) = line.strip_prefix("+++ ") {
            current = header_path(path).or_else(|| old_path.clone());
        } else if let Some(caps) = HUNK_HEADER.captures(line) {
            let count = |i: usize| {
                caps.get(i)
                    .map_or(Some(1), |m| m.as_str().parse().ok())
                    .unwrap_or(0)
            };
            remaining_old = count(1);
            remaining_new = count(2);
            if let Some(path) = &current {
                parsed.files.entry(path.clone()).or_default();
            }
        }
    }

    parsed
}

/// `a/src/x.rs` → `src/x.rs`; `/dev/null` → `None`.
fn header_path(raw: &str) -> Option<String> {
    let raw = raw.split('\t').next().unwrap_or(raw).trim();
    if raw == "/dev/null" {
        return None;
    }
    let path = raw
        .strip_prefix("a/")
        .or_else(|| raw.strip_prefix("b/"))
        .unwrap_or(raw);
    Some(path.to_string())
}

/// (added, removed) line counts between two versions.
pub fn line_counts(old: Option<&str>, new: Option<&str>) -> (usize, usize) {
    let diff = TextDiff::from_lines(old.unwrap_or_default(), new.unwrap_or_default());
    diff.iter_all_changes()
        .fold((0, 0), |(added, removed), change| match change.tag() {
            ChangeTag::Insert => (added + 1, removed),
            ChangeTag::Delete => (added, removed + 1),
            ChangeTag::Equal => (added, removed),
        })
}

/// Lines present in `new` but not in `old`, joined with newlines. The whole
/// new text when there is no old side.
pub fn inserted_text(old: Option<&str>, new: Option<&str>) -> String {
    match (old, new) {
        (_, None) => String::new(),
        (None, Some(new)) => new.to_string(),
        (Some(old), Some(new)) => TextDiff::from_lines(old, new)
            .iter_all_changes()
            .filter(|change| change.tag() == ChangeTag::Insert)
            .map(|change| change.value())
            .collect(),
    }
}

/// Inserted and deleted lines of every change, for keyword scanning when no
/// diff text is available.
pub fn synthesized_changed_lines(changes: &[&FileChange]) -> Vec<String> {
    changes
        .iter()
        .flat_map(|change| {
            TextDiff::from_lines(
                change.old().unwrap_or_default(),
                change.new_text().unwrap_or_default(),
            )
            .iter_all_changes()
            .filter(|c| c.tag() != ChangeTag::Equal)
            .map(|c| c.value().trim_end_matches('\n').to_string())
            .collect::<Vec<_>>()
        })
        .collect()
}

/// Render a `git diff`-style unified diff for the given changes.
pub fn synthesize_unified_diff(changes: &[FileChange]) -> String {
    let mut out = String::new();
    for change in changes {
        let path = change.path();
        let old_header = if change.old().is_some() {
            format!("a/{path}")
        } else {
            "/dev/null".to_string()
        };
        let new_header = if change.new_text().is_some() {
            format!("b/{path}")
        } else {
            "/dev/null".to_string()
        };
        let diff = TextDiff::from_lines(
            change.old().unwrap_or_default(),
            change.new_text().unwrap_or_default(),
        );
        out.push_str(&format!("diff --git a/{path} b/{path}\n"));
        out.push_str(
            &diff
                .unified_diff()
                .header(&old_header, &new_header)
                .to_string(),
        );
    }
    out
}

/// Statistics for `changes`, preferring counts from `parsed` when it covers
/// the file.
pub fn compute_stats(changes: &[&FileChange], parsed: Option<&ParsedDiff>) -> DiffStats {
    let mut files: Vec<FileStats> = changes
        .iter()
        .map(|change| {
            let (added, removed) = parsed
                .and_then(|p| p.files.get(change.path()).copied())
                .unwrap_or_else(|| line_counts(change.old(), change.new_text()));
            FileStats {
                path: change.path().to_string(),
                kind: change.kind(),
                added,
                removed,
            }
        })
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));

    DiffStats {
        files_changed: files.len(),
        lines_added: files.iter().map(|f| f.added).sum(),
        lines_removed: files.iter().map(|f| f.removed).sum(),
        files,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
