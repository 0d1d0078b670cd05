use std::collections::BTreeMap;
use std::path::Path;

use changelens_graphs::diff::ChangeStatus;
use changelens_graphs::{Reference, ResolutionTier, SymbolKind, detect_language};
use serde::{Deserialize, Serialize};

use crate::error::DegradeReason;

/// Status of an entity between the two versions of its file.
pub type EntityStatus = ChangeStatus;

// ── File changes ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One touched file: its path, detected language and both text versions.
///
/// Fields are private so a constructed change always has a kind consistent
/// with the sides it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFileChange")]
pub struct FileChange {
    path: String,
    language: String,
    old: Option<String>,
    new: Option<String>,
    kind: ChangeKind,
}

impl FileChange {
    pub fn added(path: impl Into<String>, new: impl Into<String>) -> Self {
        Self::build(path.into(), None, Some(new.into()), ChangeKind::Added)
    }

    pub fn modified(
        path: impl Into<String>,
        old: impl Into<String>,
        new: impl Into<String>,
    ) -> Self {
        Self::build(
            path.into(),
            Some(old.into()),
            Some(new.into()),
            ChangeKind::Modified,
        )
    }

    pub fn deleted(path: impl Into<String>, old: impl Into<String>) -> Self {
        Self::build(path.into(), Some(old.into()), None, ChangeKind::Deleted)
    }

    /// Infer the kind from which sides exist. `None` when neither does.
    pub fn from_parts(
        path: impl Into<String>,
        old: Option<String>,
        new: Option<String>,
    ) -> Option<Self> {
        let kind = match (&old, &new) {
            (None, Some(_)) => ChangeKind::Added,
            (Some(_), Some(_)) => ChangeKind::Modified,
            (Some(_), None) => ChangeKind::Deleted,
            (None, None) => return None,
        };
        Some(Self::build(path.into(), old, new, kind))
    }

    fn build(path: String, old: Option<String>, new: Option<String>, kind: ChangeKind) -> Self {
        let path = normalize_path(&path);
        let language =
            detect_language(Path::new(&path), new.as_deref().or(old.as_deref())).to_string();
        Self {
            path,
            language,
            old,
            new,
            kind,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn old(&self) -> Option<&str> {
        self.old.as_deref()
    }

    pub fn new_text(&self) -> Option<&str> {
        self.new.as_deref()
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }
}

fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.trim_start_matches("./").to_string()
}

/// Wire form of a [`FileChange`]; `kind` is optional and checked.
#[derive(Deserialize)]
struct RawFileChange {
    path: String,
    #[serde(default)]
    old: Option<String>,
    #[serde(default)]
    new: Option<String>,
    #[serde(default)]
    kind: Option<ChangeKind>,
}

impl TryFrom<RawFileChange> for FileChange {
    type Error = String;

    fn try_from(raw: RawFileChange) -> Result<Self, Self::Error> {
        if raw.path.trim().is_empty() {
            return Err("file change with empty path".into());
        }
        let path = raw.path.clone();
        let change = Self::from_parts(raw.path, raw.old, raw.new)
            .ok_or_else(|| format!("{path}: neither old nor new text supplied"))?;
        match raw.kind {
            Some(kind) if kind != change.kind => Err(format!(
                "{path}: declared kind '{kind}' does not match the supplied texts ('{}')",
                change.kind
            )),
            _ => Ok(change),
        }
    }
}

// ── Extraction output ──────────────────────────────────────────────

/// A structural unit that differs between the two versions of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Qualified name (`Config::load`, `Greeter.greet`).
    pub name: String,
    pub short_name: String,
    pub kind: SymbolKind,
    pub file: String,
    pub status: EntityStatus,
    /// New-side complexity for added/modified, old-side for removed.
    pub complexity: u32,
}

/// Everything the extractor learned about one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub path: String,
    pub language: String,
    pub kind: ChangeKind,
    pub area: String,
    pub tier: ResolutionTier,
    pub entities: Vec<Entity>,
    pub complexity_delta: i64,
    /// Reference statements in the new text.
    pub references: Vec<Reference>,
    pub degraded: Option<DegradeReason>,
}

// ── Mapper output ──────────────────────────────────────────────────

/// An entity with the functional role the mapper assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub kind: SymbolKind,
    pub file: String,
    pub status: EntityStatus,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedCapability {
    pub id: String,
    pub description: String,
    pub impact: String,
    /// Distinct new signatures, maximised over files.
    pub strength: u32,
    pub signatures: Vec<String>,
    pub files: Vec<String>,
}

// ── Relations ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub from: String,
    pub to: String,
    pub kind: RelationKind,
    pub specifiers: Vec<String>,
}

// ── Metrics and statistics ─────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub functional_coverage: u8,
    pub relation_density: f64,
    pub complexity_delta: i64,
    pub test_impact: u8,
    pub value_score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStats {
    pub path: String,
    pub kind: ChangeKind,
    pub added: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub files_changed: usize,
    pub lines_added: usize,
    pub lines_removed: usize,
    /// Sorted by path.
    pub files: Vec<FileStats>,
}

impl DiffStats {
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.files.iter().filter(|f| f.kind == kind).count()
    }
}

// ── Narrative ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(rename = "type")]
    pub change_type: String,
    pub scope: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    Enhanced,
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedFile {
    pub path: String,
    #[serde(flatten)]
    pub reason: DegradeReason,
}

/// How the commit subject fared against the title checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleQuality {
    /// 100 minus 20 per banned word and 10 per other issue.
    pub score: u8,
    pub issues: Vec<String>,
    /// The capability phrase failed the checks and the statistics phrase
    /// was used instead.
    pub fell_back: bool,
}

/// The structured result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitNarrative {
    pub title: String,
    pub classification: Classification,
    pub capabilities: Vec<DetectedCapability>,
    pub components: Vec<Component>,
    pub metrics: QualityMetrics,
    pub relations: Vec<Relation>,
    pub chain: Vec<String>,
    /// Primary functional area per file.
    pub areas: BTreeMap<String, String>,
    pub stats: DiffStats,
    pub degraded: Vec<DegradedFile>,
    pub mode: RenderMode,
    pub title_quality: TitleQuality,
    pub body: String,
}

impl CommitNarrative {
    /// Commit message: title, blank line, body.
    pub fn message(&self) -> String {
        if self.body.is_empty() {
            self.title.clone()
        } else {
            format!("{}\n\n{}", self.title, self.body)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_detect_language_and_kind() {
        let change = FileChange::added("./src\\app.py", "x = 1\n");
        assert_eq!(change.path(), "src/app.py");
        assert_eq!(change.language(), "python");
        assert_eq!(change.kind(), ChangeKind::Added);
        assert_eq!(change.old(), None);

        let script = FileChange::deleted("bin/run", "#!/usr/bin/env bash\necho hi\n");
        assert_eq!(script.language(), "shell");
        assert_eq!(script.kind(), ChangeKind::Deleted);
    }

    #[test]
    fn from_parts_infers_kind() {
        assert_eq!(
            FileChange::from_parts("a.rs", Some("a".into()), Some("b".into()))
                .unwrap()
                .kind(),
            ChangeKind::Modified
        );
        assert!(FileChange::from_parts("a.rs", None, None).is_none());
    }

    #[test]
    fn deserializes_from_json_and_checks_kind() {
        let change: FileChange =
            serde_json::from_str(r#"{"path": "lib/a.js", "new": "export {}"}"#).unwrap();
        assert_eq!(change.kind(), ChangeKind::Added);
        assert_eq!(change.language(), "javascript");

        let mismatch = serde_json::from_str::<FileChange>(
            r#"{"path": "a.py", "old": "x", "kind": "added"}"#,
        );
        assert!(mismatch.is_err());

        let empty = serde_json::from_str::<FileChange>(r#"{"path": "a.py"}"#);
        assert!(empty.is_err());
    }

    #[test]
    fn message_joins_title_and_body() {
        let narrative = CommitNarrative {
            title: "feat(core): x".into(),
            classification: Classification {
                change_type: "feat".into(),
                scope: "core".into(),
            },
            capabilities: vec![],
            components: vec![],
            metrics: QualityMetrics::default(),
            relations: vec![],
            chain: vec![],
            areas: BTreeMap::new(),
            stats: DiffStats::default(),
            degraded: vec![],
            mode: RenderMode::Legacy,
            title_quality: TitleQuality::default(),
            body: "Statistics: 1 files changed".into(),
        };
        assert_eq!(narrative.message(), "feat(core): x\n\nStatistics: 1 files changed");
        let json = serde_json::to_value(&narrative).unwrap();
        assert_eq!(json["classification"]["type"], "feat");
        assert_eq!(json["mode"], "legacy");
    }
}
