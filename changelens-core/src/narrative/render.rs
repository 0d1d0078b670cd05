// Plain-text rendering of titles and narrative bodies.

use std::collections::BTreeMap;
use std::path::Path;

use crate::types::{
    ChangeKind, Classification, Component, DetectedCapability, DiffStats, FileStats,
    QualityMetrics,
};

const SUMMARY_BUCKETS: usize = 6;

pub fn title(classification: &Classification, phrase: &str) -> String {
    format!(
        "{}({}): {phrase}",
        classification.change_type, classification.scope
    )
}

/// `update 1 file` / `update N files`.
pub fn update_phrase(files: usize) -> String {
    if files == 1 {
        "update 1 file".to_string()
    } else {
        format!("update {files} files")
    }
}

/// Capability, component, metric and relation sections, in that order.
/// Empty sections are left out; metrics are always present.
pub fn enhanced_body(
    capabilities: &[DetectedCapability],
    components: &[Component],
    metrics: &QualityMetrics,
    chain: &[String],
) -> String {
    let mut sections: Vec<Vec<String>> = Vec::new();

    if !capabilities.is_empty() {
        let mut lines = vec!["CAPABILITIES:".to_string()];
        lines.extend(capabilities.iter().map(|c| format!("- {}: {}", c.id, c.impact)));
        sections.push(lines);
    }

    if !components.is_empty() {
        let mut lines = vec!["COMPONENTS:".to_string()];
        lines.extend(components.iter().map(|c| format!("- {} ({})", c.role, c.name)));
        sections.push(lines);
    }

    sections.push(vec![
        "METRICS:".to_string(),
        format!("- functional coverage: {}%", metrics.functional_coverage),
        format!("- relation density: {:.2}", metrics.relation_density),
        format!("- complexity delta: {:+}", metrics.complexity_delta),
        format!("- test impact: {}%", metrics.test_impact),
        format!("- value score: {}/100", metrics.value_score),
    ]);

    if !chain.is_empty() {
        sections.push(vec!["RELATIONS:".to_string(), format!("- {}", chain.join(" -> "))]);
    }

    join_sections(&sections)
}

/// Statistics-only body: totals, directory and extension summary, then the
/// added, modified and deleted file lists.
pub fn legacy_body(stats: &DiffStats, max_listed_files: usize) -> String {
    let dirs = top_counts(stats.files.iter().map(|f| top_directory(&f.path)));
    let exts = top_counts(stats.files.iter().map(|f| extension_label(&f.path)));

    let mut sections = vec![
        vec![format!(
            "Statistics: {} files changed, {} insertions, {} deletions",
            stats.files_changed, stats.lines_added, stats.lines_removed
        )],
        vec![
            "Summary:".to_string(),
            format!("- Dirs: {dirs}"),
            format!("- Exts: {exts}"),
            format!(
                "- A/M/D: {}/{}/{}",
                stats.count(ChangeKind::Added),
                stats.count(ChangeKind::Modified),
                stats.count(ChangeKind::Deleted)
            ),
        ],
    ];

    for (kind, heading) in [
        (ChangeKind::Added, "Added files:"),
        (ChangeKind::Modified, "Modified files:"),
        (ChangeKind::Deleted, "Deleted files:"),
    ] {
        let files: Vec<&FileStats> = stats.files.iter().filter(|f| f.kind == kind).collect();
        if files.is_empty() {
            continue;
        }
        let mut lines = vec![heading.to_string()];
        lines.extend(
            files
                .iter()
                .take(max_listed_files)
                .map(|f| format!("- {} (+{}/-{})", f.path, f.added, f.removed)),
        );
        if files.len() > max_listed_files {
            lines.push(format!("- ... and {} more", files.len() - max_listed_files));
        }
        sections.push(lines);
    }

    join_sections(&sections)
}

fn join_sections(sections: &[Vec<String>]) -> String {
    sections
        .iter()
        .map(|lines| lines.join("\n"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn top_directory(path: &str) -> String {
    match path.split_once('/') {
        Some((dir, _)) if !dir.is_empty() => dir.to_string(),
        _ => ".".to_string(),
    }
}

fn extension_label(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map_or_else(|| "other".to_string(), |e| format!(".{e}"))
}

/// `name=count` pairs, most frequent first, names breaking ties.
fn top_counts(labels: impl Iterator<Item = String>) -> String {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(SUMMARY_BUCKETS)
        .map(|(label, n)| format!("{label}={n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Tests ─────────────────────────────────────────────────────────────
