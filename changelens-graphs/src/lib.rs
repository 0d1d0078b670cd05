pub mod detect;
pub mod diff;
pub mod languages;
pub mod parse;
pub mod references;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use detect::detect_language;
pub use languages::{LanguageRegistry, LanguageSupport};

/// Error type for the structure engine.
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Parse of {path} exceeded its {budget_ms}ms budget")]
    Timeout { path: String, budget_ms: u64 },

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;

// ── Resolution tiers ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionTier {
    /// Tree-sitter syntax tree; definitions and bodies come from real nodes.
    Structural,
    /// Signature-line patterns over raw text.
    Heuristic,
}

// ── Span type ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl From<tree_sitter::Range> for TextRange {
    fn from(r: tree_sitter::Range) -> Self {
        Self {
            start_byte: r.start_byte,
            end_byte: r.end_byte,
            start_row: r.start_point.row,
            start_col: r.start_point.column,
            end_row: r.end_point.row,
            end_col: r.end_point.column,
        }
    }
}

// ── Symbol kind ────────────────────────────────────────────────────

/// Coarse kind of a structural unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    /// Classes, structs, enums, traits, interfaces, type aliases.
    Class,
    /// Modules, namespaces, document sections, config tables.
    Module,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Module => "module",
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Outline output ─────────────────────────────────────────────────

/// Structural outline of one version of one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceOutline {
    pub file_path: PathBuf,
    pub tier: ResolutionTier,
    pub definitions: Vec<Definition>,
    pub references: Vec<Reference>,
}

impl SourceOutline {
    pub fn empty(file_path: PathBuf, tier: ResolutionTier) -> Self {
        Self {
            file_path,
            tier,
            definitions: Vec::new(),
            references: Vec::new(),
        }
    }

    /// Sum of per-definition complexity.
    pub fn total_complexity(&self) -> u64 {
        self.definitions.iter().map(|d| u64::from(d.complexity)).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Definition {
    pub name: String,
    pub qualified_name: String,
    pub kind: SymbolKind,
    pub span: TextRange,
    /// Branching constructs in the body, nested definitions excluded.
    pub complexity: u32,
    /// Hash of the definition's source text, used to detect body changes.
    pub body_hash: u64,
}

/// How a reference specifier should be resolved against other files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceStyle {
    /// File-system path, relative to the referencing file's directory
    /// (`./util`, `../lib/x.h`, `docs/guide.md`).
    Path,
    /// Module path (`pkg.mod`, `crate::config`, `github.com/org/pkg`).
    Module,
}

/// An import/include-style statement found in source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub specifier: String,
    pub style: ReferenceStyle,
    /// Zero-based line of the statement.
    pub line: usize,
}

impl Reference {
    pub fn path(specifier: impl Into<String>, line: usize) -> Self {
        Self {
            specifier: specifier.into(),
            style: ReferenceStyle::Path,
            line,
        }
    }

    pub fn module(specifier: impl Into<String>, line: usize) -> Self {
        Self {
            specifier: specifier.into(),
            style: ReferenceStyle::Module,
            line,
        }
    }
}
