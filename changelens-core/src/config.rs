use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, LensError};

/// Top-level changelens configuration, matching `changelens.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LensConfig {
    #[serde(default)]
    pub extraction: ExtractionSection,
    #[serde(default)]
    pub relations: RelationsSection,
    #[serde(default)]
    pub legacy: LegacySection,
    #[serde(default)]
    pub scoring: ScoringSection,
    #[serde(default)]
    pub roles: RolesSection,
    #[serde(default)]
    pub areas: AreasSection,
    #[serde(default)]
    pub classification: ClassificationSection,
    #[serde(default)]
    pub quality: QualitySection,
    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<CapabilityDef>,
}

impl Default for LensConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionSection::default(),
            relations: RelationsSection::default(),
            legacy: LegacySection::default(),
            scoring: ScoringSection::default(),
            roles: RolesSection::default(),
            areas: AreasSection::default(),
            classification: ClassificationSection::default(),
            quality: QualitySection::default(),
            capabilities: default_capabilities(),
        }
    }
}

impl LensConfig {
    /// Parse and validate a TOML document. Missing sections take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }
        let text = std::fs::read_to_string(path).map_err(LensError::Io)?;
        Ok(Self::from_toml_str(&text)?)
    }

    /// Check value ranges and uniqueness. Pattern syntax is checked when the
    /// rules are compiled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring.validate()?;

        if self.scoring.thresholds.min_capabilities == 0 {
            return Err(invalid("scoring.thresholds.min_capabilities must be at least 1"));
        }
        if self.roles.max_components == 0 {
            return Err(invalid("roles.max_components must be at least 1"));
        }
        if self.relations.max_search_steps == 0 {
            return Err(invalid("relations.max_search_steps must be at least 1"));
        }

        let mut ids = HashSet::new();
        for cap in &self.capabilities {
            if cap.id.trim().is_empty() {
                return Err(invalid("capability with empty id"));
            }
            if !ids.insert(cap.id.as_str()) {
                return Err(invalid(format!("duplicate capability id '{}'", cap.id)));
            }
            if cap.signatures.is_empty() {
                return Err(invalid(format!("capability '{}' has no signatures", cap.id)));
            }
        }

        let mut labels = HashSet::new();
        for area in &self.areas.areas {
            if area.label.trim().is_empty() {
                return Err(invalid("area with empty label"));
            }
            if !labels.insert(area.label.as_str()) {
                return Err(invalid(format!("duplicate area label '{}'", area.label)));
            }
        }
        if self.areas.default_area.trim().is_empty() {
            return Err(invalid("areas.default_area must not be empty"));
        }

        for rule in &self.classification.rules {
            rule.validate()?;
        }
        if self.classification.default_type.trim().is_empty() {
            return Err(invalid("classification.default_type must not be empty"));
        }
        if self.classification.default_scope.trim().is_empty() {
            return Err(invalid("classification.default_scope must not be empty"));
        }

        let quality = &self.quality;
        if quality
            .banned_title_words
            .iter()
            .chain(&quality.generic_terms)
            .any(|w| w.split_whitespace().count() != 1)
        {
            return Err(invalid("quality word lists take single words"));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

// ── Extraction ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSection {
    /// Per-file parse budget in milliseconds; 0 disables the budget.
    pub timeout_ms: u64,
    /// Files larger than this degrade without being parsed.
    pub max_file_bytes: usize,
}

impl Default for ExtractionSection {
    fn default() -> Self {
        Self {
            timeout_ms: 2000,
            max_file_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationsSection {
    /// Upper bound on DFS steps while searching for the relation chain.
    pub max_search_steps: usize,
}

impl Default for RelationsSection {
    fn default() -> Self {
        Self {
            max_search_steps: 100_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacySection {
    /// Files listed per added/modified/deleted list before eliding.
    pub max_listed_files: usize,
}

impl Default for LegacySection {
    fn default() -> Self {
        Self {
            max_listed_files: 20,
        }
    }
}

// ── Scoring ────────────────────────────────────────────────────────

/// Value-score weights. The score is
/// `base + capability·min(n, cap) + coverage·cov/100 + density·min(d, cap)
/// + complexity·min(|Δ|/scale, 1)`, clamped to 0..=100.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSection {
    pub base: f64,
    pub capability: f64,
    pub capability_cap: u32,
    pub coverage: f64,
    pub density: f64,
    pub density_cap: f64,
    pub complexity: f64,
    pub complexity_scale: f64,
    pub thresholds: Thresholds,
}

impl Default for ScoringSection {
    fn default() -> Self {
        Self {
            base: 20.0,
            capability: 10.0,
            capability_cap: 3,
            coverage: 30.0,
            density: 10.0,
            density_cap: 1.0,
            complexity: 10.0,
            complexity_scale: 20.0,
            thresholds: Thresholds::default(),
        }
    }
}

impl ScoringSection {
    fn validate(&self) -> Result<(), ConfigError> {
        let weights = [
            ("base", self.base),
            ("capability", self.capability),
            ("coverage", self.coverage),
            ("density", self.density),
            ("complexity", self.complexity),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!(
                    "scoring.{name} must be a non-negative number, got {value}"
                )));
            }
        }
        for (name, value) in [
            ("density_cap", self.density_cap),
            ("complexity_scale", self.complexity_scale),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(format!("scoring.{name} must be positive, got {value}")));
            }
        }
        if self.thresholds.min_value_score > 100 {
            return Err(invalid("scoring.thresholds.min_value_score must be within 0..=100"));
        }
        Ok(())
    }
}

/// Gate between enhanced and legacy rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub min_capabilities: usize,
    pub min_match_strength: u32,
    pub min_value_score: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_capabilities: 1,
            min_match_strength: 1,
            min_value_score: 30,
        }
    }
}

// ── Roles ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRule {
    /// Case-insensitive regex matched against the entity's short name.
    pub pattern: String,
    pub role: String,
}

impl RoleRule {
    fn new(pattern: &str, role: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            role: role.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RolesSection {
    pub max_components: usize,
    /// Entity names left out of the component list.
    pub noise_patterns: Vec<String>,
    /// Evaluated in order; the first match wins.
    pub rules: Vec<RoleRule>,
}

impl Default for RolesSection {
    fn default() -> Self {
        Self {
            max_components: 5,
            noise_patterns: vec!["^_".into(), "_helper$".into(), "_internal$".into()],
            rules: vec![
                RoleRule::new(r"^_?analyze_(python|js|generic)_diff$", "language-specific code analyzer"),
                RoleRule::new(r"analyze_file_diff", "diff analysis engine"),
                RoleRule::new(r"^code_?change_?analyzer$", "AST-based change detector"),
                RoleRule::new(r"aggregate_changes", "change aggregator"),
                RoleRule::new(r"detect_relations", "dependency graph builder"),
                RoleRule::new(r"generate.*message", "commit message generator"),
                RoleRule::new(r"generate.*summary", "summary generator"),
                RoleRule::new(r"load_config", "config loader"),
                RoleRule::new(r"save_config", "config persistence"),
                RoleRule::new(r"config$", "configuration manager"),
                RoleRule::new(r"validate", "validation engine"),
                RoleRule::new(r"^main$", "entry point"),
                RoleRule::new(r"^(cmd|command)_|_command$", "CLI command"),
                RoleRule::new(r"^format_.*result", "output formatter"),
                RoleRule::new(r"markdown_?formatter", "markdown renderer"),
                RoleRule::new(r"complexity", "complexity analyzer"),
                RoleRule::new(r"coverage", "test coverage analyzer"),
                RoleRule::new(r"^test_", "test case"),
                RoleRule::new(r"handler$", "request handler"),
                RoleRule::new(r"manager$", "resource manager"),
                RoleRule::new(r"factory$", "object factory"),
                RoleRule::new(r"builder$", "builder pattern"),
                RoleRule::new(r"validator$", "input validator"),
                RoleRule::new(r"parser$", "parser"),
                RoleRule::new(r"generator$", "generator"),
                RoleRule::new(r"analyzer$", "analyzer"),
            ],
        }
    }
}

// ── Capabilities ───────────────────────────────────────────────────

/// A capability the scanner looks for in added text.
///
/// Signatures are plain text (case-insensitive substring), `re:<regex>`, or
/// `path:<glob>` (matches the path of an added or modified file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDef {
    pub id: String,
    pub description: String,
    pub impact: String,
    pub signatures: Vec<String>,
}

fn capability(id: &str, description: &str, impact: &str, signatures: &[&str]) -> CapabilityDef {
    CapabilityDef {
        id: id.to_string(),
        description: description.to_string(),
        impact: impact.to_string(),
        signatures: signatures.iter().map(|s| (*s).to_string()).collect(),
    }
}

fn default_capabilities() -> Vec<CapabilityDef> {
    vec![
        capability(
            "ast_analysis",
            "deep code analysis engine",
            "intelligent change detection",
            &["ast.parse", "ast.walk", "libcst", "tree-sitter", "tree_sitter", r"re:\bAST\b"],
        ),
        capability(
            "dependency_graph",
            "code relationship mapping",
            "architecture understanding",
            &["networkx", "petgraph", "detect_relations", "dependency graph", r"re:\bDiGraph\b"],
        ),
        capability(
            "quality_metrics",
            "code quality metrics",
            "maintainability tracking",
            &["radon", "cyclomatic", "complexity", "coverage"],
        ),
        capability(
            "multi_language",
            "multi-language support",
            "universal code analysis",
            &["_analyze_python", "_analyze_js", "detect_language", "language registry"],
        ),
        capability(
            "config_system",
            "configuration management",
            "customizable workflows",
            &["load_config", "yaml.safe_load", "toml::from_str", "tomllib", r"re:\b\w+Config\b"],
        ),
        capability(
            "cli_interface",
            "CLI interface",
            "improved user experience",
            &["@click.command", "@click.option", "argparse", "clap::", "#[command("],
        ),
        capability(
            "output_formatting",
            "output formatting",
            "readable reports",
            &["markdown", "render_template", "jinja2", "formatter"],
        ),
        capability(
            "changelog",
            "changelog generation",
            "release documentation",
            &["changelog", "path:**/CHANGELOG*"],
        ),
    ]
}

// ── Areas ──────────────────────────────────────────────────────────

/// One functional area. Matches a file by path glob, by a path-segment
/// token, or by a keyword found in most of the file's entity names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaDef {
    pub label: String,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

fn area(label: &str, paths: &[&str], keywords: &[&str]) -> AreaDef {
    AreaDef {
        label: label.to_string(),
        paths: paths.iter().map(|s| (*s).to_string()).collect(),
        keywords: keywords.iter().map(|s| (*s).to_string()).collect(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AreasSection {
    /// Area for files no configured area claims.
    pub default_area: String,
    /// Area whose share of files is reported as test impact.
    pub test_area: String,
    /// Evaluated in order; the first match wins.
    pub areas: Vec<AreaDef>,
}

impl Default for AreasSection {
    fn default() -> Self {
        Self {
            default_area: "core".into(),
            test_area: "tests".into(),
            areas: vec![
                area(
                    "tests",
                    &[
                        "**/tests/**",
                        "**/test/**",
                        "**/__tests__/**",
                        "**/*_test.*",
                        "**/test_*",
                        "**/*.test.*",
                        "**/*.spec.*",
                        "**/conftest.py",
                    ],
                    &["test", "tests", "spec"],
                ),
                area(
                    "docs",
                    &["**/*.md", "**/*.rst", "**/*.txt", "docs/**", "doc/**"],
                    &["docs", "doc"],
                ),
                area(
                    "build",
                    &[
                        ".github/**",
                        ".gitlab-ci.yml",
                        "**/Dockerfile",
                        "**/Makefile",
                        "**/Cargo.toml",
                        "**/Cargo.lock",
                        "**/build.rs",
                        "**/package.json",
                        "**/package-lock.json",
                        "**/pyproject.toml",
                        "**/setup.py",
                        "**/setup.cfg",
                        "**/go.mod",
                        "**/go.sum",
                        "**/pom.xml",
                        "**/build.gradle",
                    ],
                    &["ci", "build", "docker"],
                ),
                area(
                    "config",
                    &[
                        "**/*.toml",
                        "**/*.yaml",
                        "**/*.yml",
                        "**/*.ini",
                        "**/*.cfg",
                        "**/*.json",
                        "**/.env*",
                    ],
                    &["config", "settings", "configuration"],
                ),
                area("cli", &["bin/**", "cmd/**"], &["cli", "cmd", "command", "commands"]),
                area(
                    "output",
                    &["templates/**"],
                    &["format", "formatter", "render", "template", "report"],
                ),
            ],
        }
    }
}

// ── Classification ─────────────────────────────────────────────────

/// One ordered change-type rule. The first rule that fires decides the type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassificationRule {
    /// Share of files tagged `area` is at least `min_share`.
    Area {
        area: String,
        min_share: f64,
        #[serde(rename = "type")]
        change_type: String,
    },
    /// A whole-word keyword appears on a changed line of the diff.
    Keyword {
        keywords: Vec<String>,
        #[serde(rename = "type")]
        change_type: String,
    },
    /// Added files make up at least `min_ratio` of the change.
    NewFiles {
        min_ratio: f64,
        #[serde(rename = "type")]
        change_type: String,
    },
    /// More lines were removed than added.
    Deletions {
        #[serde(rename = "type")]
        change_type: String,
    },
}

impl ClassificationRule {
    pub fn change_type(&self) -> &str {
        match self {
            Self::Area { change_type, .. }
            | Self::Keyword { change_type, .. }
            | Self::NewFiles { change_type, .. }
            | Self::Deletions { change_type } => change_type,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.change_type().trim().is_empty() {
            return Err(invalid("classification rule with empty type"));
        }
        match self {
            Self::Area { min_share: share, .. } | Self::NewFiles { min_ratio: share, .. }
                if !(0.0..=1.0).contains(share) =>
            {
                Err(invalid(format!(
                    "classification rule '{}' needs a ratio within 0..=1, got {share}",
                    self.change_type()
                )))
            }
            Self::Keyword { keywords, .. } if keywords.is_empty() => Err(invalid(format!(
                "keyword rule for '{}' has no keywords",
                self.change_type()
            ))),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationSection {
    pub default_type: String,
    /// Scope used when two or more areas tie for the most files.
    pub default_scope: String,
    pub rules: Vec<ClassificationRule>,
}

impl Default for ClassificationSection {
    fn default() -> Self {
        let area_rule = |area: &str, change_type: &str| ClassificationRule::Area {
            area: area.into(),
            min_share: 0.75,
            change_type: change_type.into(),
        };
        let keyword_rule = |keywords: &[&str], change_type: &str| ClassificationRule::Keyword {
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
            change_type: change_type.into(),
        };
        Self {
            default_type: "chore".into(),
            default_scope: "core".into(),
            rules: vec![
                area_rule("tests", "test"),
                area_rule("docs", "docs"),
                area_rule("build", "build"),
                ClassificationRule::NewFiles {
                    min_ratio: 0.5,
                    change_type: "feat".into(),
                },
                keyword_rule(&["fix", "bug", "hotfix", "patch"], "fix"),
                keyword_rule(
                    &["refactor", "restructure", "reorganize", "simplify", "cleanup"],
                    "refactor",
                ),
                ClassificationRule::Deletions {
                    change_type: "refactor".into(),
                },
                area_rule("config", "chore"),
            ],
        }
    }
}

// ── Quality ────────────────────────────────────────────────────────

/// Title checks applied to the capability phrase before it becomes the
/// commit subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitySection {
    /// Stripped from a capability phrase.
    pub banned_title_words: Vec<String>,
    /// Vague words counted against the phrase.
    pub generic_terms: Vec<String>,
    /// More generic terms than this rejects the phrase.
    pub max_generic_terms: usize,
    /// A phrase shorter than this, after stripping, is rejected.
    pub min_title_words: usize,
}

impl Default for QualitySection {
    fn default() -> Self {
        let words = |list: &[&str]| -> Vec<String> { list.iter().map(|w| (*w).to_string()).collect() };
        Self {
            banned_title_words: words(&[
                "add", "logging", "testing", "performance", "update", "improve", "fix", "misc",
                "various", "some", "stuff",
            ]),
            generic_terms: words(&[
                "update", "improve", "enhance", "fix", "change", "modify", "cleaner", "better",
                "refactor", "cleanup", "misc",
            ]),
            max_generic_terms: 0,
            min_title_words: 2,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
