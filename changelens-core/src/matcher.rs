// Compiled configuration patterns.
//
// Role rules, noise filters, capability signatures and area globs are all
// strings in configuration. They are compiled once, when the pipeline is
// built, into `Matcher`s; any pattern that fails to compile is reported as
// `ConfigError::Invalid` before analysis starts.

use glob::{MatchOptions, Pattern};
use regex::{Regex, RegexBuilder};

use crate::error::ConfigError;

/// Prefix selecting a regex signature.
const REGEX_PREFIX: &str = "re:";
/// Prefix selecting a path-glob signature.
const PATH_PREFIX: &str = "path:";

/// `*` stays within one path segment; `**` crosses segments.
pub const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// One compiled pattern.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Case-insensitive substring.
    Literal(Regex),
    /// Regular expression, as written.
    Regex(Regex),
    /// Glob over a file path.
    Glob(Pattern),
}

impl Matcher {
    /// Compile a capability signature: plain text, `re:<regex>` or
    /// `path:<glob>`.
    pub fn signature(spec: &str) -> Result<Self, ConfigError> {
        if let Some(pattern) = spec.strip_prefix(REGEX_PREFIX) {
            return Regex::new(pattern)
                .map(Self::Regex)
                .map_err(|e| invalid_pattern(spec, &e));
        }
        if let Some(pattern) = spec.strip_prefix(PATH_PREFIX) {
            return Self::glob(pattern);
        }
        if spec.trim().is_empty() {
            return Err(ConfigError::Invalid("empty capability signature".into()));
        }
        Self::literal(spec)
    }

    /// Case-insensitive substring match on `needle`.
    pub fn literal(needle: &str) -> Result<Self, ConfigError> {
        RegexBuilder::new(&regex::escape(needle))
            .case_insensitive(true)
            .build()
            .map(Self::Literal)
            .map_err(|e| invalid_pattern(needle, &e))
    }

    /// Case-insensitive regex, as used by role and noise rules.
    pub fn name_pattern(pattern: &str) -> Result<Self, ConfigError> {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map(Self::Regex)
            .map_err(|e| invalid_pattern(pattern, &e))
    }

    pub fn glob(pattern: &str) -> Result<Self, ConfigError> {
        Pattern::new(pattern)
            .map(Self::Glob)
            .map_err(|e| invalid_pattern(pattern, &e))
    }

    /// Whether this matcher looks at file paths rather than text.
    pub fn is_path(&self) -> bool {
        matches!(self, Self::Glob(_))
    }

    /// Text matchers only; globs never match text.
    pub fn matches_text(&self, text: &str) -> bool {
        match self {
            Self::Literal(re) | Self::Regex(re) => re.is_match(text),
            Self::Glob(_) => false,
        }
    }

    /// Glob matchers only; text matchers never match paths.
    pub fn matches_path(&self, path: &str) -> bool {
        match self {
            Self::Glob(pattern) => pattern.matches_with(path, GLOB_OPTIONS),
            Self::Literal(_) | Self::Regex(_) => false,
        }
    }
}

fn invalid_pattern(pattern: &str, err: &dyn std::fmt::Display) -> ConfigError {
    ConfigError::Invalid(format!("pattern '{pattern}': {err}"))
}

// ── Tests ─────────────────────────────────────────────────────────────
