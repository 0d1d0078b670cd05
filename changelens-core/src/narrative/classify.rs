use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::config::{ClassificationRule, ClassificationSection};
use crate::error::ConfigError;
use crate::types::Classification;

static CONVENTIONAL_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<type>[A-Za-z]+)(?:\((?P<scope>[^()]*)\))?!?:\s*\S").unwrap()
});

/// Facts about the change set the classification rules look at.
#[derive(Debug, Clone)]
pub struct ChangeSignals<'a> {
    /// Primary area of each file.
    pub areas: Vec<&'a str>,
    pub added_files: usize,
    pub lines_added: usize,
    pub lines_removed: usize,
    /// Bodies of changed diff lines.
    pub changed_lines: &'a [String],
}

#[derive(Debug)]
enum CompiledRule {
    Area {
        area: String,
        min_share: f64,
        change_type: String,
    },
    Keyword {
        pattern: Regex,
        change_type: String,
    },
    NewFiles {
        min_ratio: f64,
        change_type: String,
    },
    Deletions {
        change_type: String,
    },
}

/// Decides change type and scope from ordered rules.
#[derive(Debug)]
pub struct Classifier {
    rules: Vec<CompiledRule>,
    default_type: String,
    default_scope: String,
}

impl Classifier {
    pub fn new(section: &ClassificationSection) -> Result<Self, ConfigError> {
        let rules = section
            .rules
            .iter()
            .map(compile_rule)
            .collect::<Result<_, ConfigError>>()?;
        Ok(Self {
            rules,
            default_type: section.default_type.clone(),
            default_scope: section.default_scope.clone(),
        })
    }

    /// Type from the first rule that fires, scope from the dominant area.
    pub fn classify(&self, signals: &ChangeSignals<'_>) -> Classification {
        let change_type = self
            .rules
            .iter()
            .find(|rule| rule_fires(rule, signals))
            .map_or(self.default_type.as_str(), rule_type)
            .to_string();
        Classification {
            change_type,
            scope: self.scope(&signals.areas),
        }
    }

    /// The area with the most files; the default scope on a tie.
    pub fn scope(&self, areas: &[&str]) -> String {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for &area in areas {
            *counts.entry(area).or_default() += 1;
        }
        let Some(max) = counts.values().copied().max() else {
            return self.default_scope.clone();
        };
        let mut leaders = counts.iter().filter(|(_, n)| **n == max);
        match (leaders.next(), leaders.next()) {
            (Some((area, _)), None) => (*area).to_string(),
            _ => self.default_scope.clone(),
        }
    }

    /// Title and classification for a caller-supplied message. A
    /// conventional `type(scope): subject` header is honoured; anything else
    /// keeps the default type and computed scope. `None` for a blank message.
    pub fn from_override(
        &self,
        message: &str,
        signals: &ChangeSignals<'_>,
    ) -> Option<(String, Classification)> {
        let title = message.lines().map(str::trim).find(|l| !l.is_empty())?;
        let computed_scope = self.scope(&signals.areas);

        let classification = match CONVENTIONAL_HEADER.captures(title) {
            Some(caps) => Classification {
                change_type: caps["type"].to_ascii_lowercase(),
                scope: caps
                    .name("scope")
                    .map(|m| m.as_str().trim())
                    .filter(|s| !s.is_empty())
                    .map_or(computed_scope, str::to_string),
            },
            None => Classification {
                change_type: self.default_type.clone(),
                scope: computed_scope,
            },
        };
        Some((title.to_string(), classification))
    }
}

fn compile_rule(rule: &ClassificationRule) -> Result<CompiledRule, ConfigError> {
    let change_type = rule.change_type().to_string();
    Ok(match rule {
        ClassificationRule::Area { area, min_share, .. } => CompiledRule::Area {
            area: area.clone(),
            min_share: *min_share,
            change_type,
        },
        ClassificationRule::Keyword { keywords, .. } => {
            let alternatives: Vec<String> = keywords.iter().map(|k| regex::escape(k)).collect();
            let pattern = RegexBuilder::new(&format!(r"\b(?:{})\b", alternatives.join("|")))
                .case_insensitive(true)
                .build()
                .map_err(|e| ConfigError::Invalid(format!("keyword rule '{change_type}': {e}")))?;
            CompiledRule::Keyword {
                pattern,
                change_type,
            }
        }
        ClassificationRule::NewFiles { min_ratio, .. } => CompiledRule::NewFiles {
            min_ratio: *min_ratio,
            change_type,
        },
        ClassificationRule::Deletions { .. } => CompiledRule::Deletions { change_type },
    })
}

#[allow(clippy::cast_precision_loss)]
fn share(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn rule_fires(rule: &CompiledRule, signals: &ChangeSignals<'_>) -> bool {
    let files = signals.areas.len();
    match rule {
        CompiledRule::Area { area, min_share, .. } => {
            let tagged = signals.areas.iter().filter(|a| **a == area.as_str()).count();
            files > 0 && share(tagged, files) >= *min_share
        }
        CompiledRule::Keyword { pattern, .. } => {
            signals.changed_lines.iter().any(|line| pattern.is_match(line))
        }
        CompiledRule::NewFiles { min_ratio, .. } => {
            files > 0 && share(signals.added_files, files) >= *min_ratio
        }
        CompiledRule::Deletions { .. } => signals.lines_removed > signals.lines_added,
    }
}

fn rule_type(rule: &CompiledRule) -> &str {
    match rule {
        CompiledRule::Area { change_type, .. }
        | CompiledRule::Keyword { change_type, .. }
        | CompiledRule::NewFiles { change_type, .. }
        | CompiledRule::Deletions { change_type } => change_type,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
