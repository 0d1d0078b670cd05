// Title checks: banned words are stripped from a capability phrase, vague
// or short phrases are rejected.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};

use crate::config::QualitySection;
use crate::error::ConfigError;
use crate::types::TitleQuality;

#[derive(Debug)]
pub struct TitleGate {
    banned: Option<Regex>,
    generic: HashSet<String>,
    max_generic_terms: usize,
    min_title_words: usize,
}

impl TitleGate {
    pub fn new(section: &QualitySection) -> Result<Self, ConfigError> {
        let banned = if section.banned_title_words.is_empty() {
            None
        } else {
            let alternatives: Vec<String> = section
                .banned_title_words
                .iter()
                .map(|w| regex::escape(w.trim()))
                .collect();
            let pattern = RegexBuilder::new(&format!(r"\b(?:{})\b", alternatives.join("|")))
                .case_insensitive(true)
                .build()
                .map_err(|e| ConfigError::Invalid(format!("quality.banned_title_words: {e}")))?;
            Some(pattern)
        };
        Ok(Self {
            banned,
            generic: section.generic_terms.iter().map(|w| w.trim().to_lowercase()).collect(),
            max_generic_terms: section.max_generic_terms,
            min_title_words: section.min_title_words,
        })
    }

    /// `phrase` without its banned words, or `None` when what is left is
    /// too vague or too short to stand as a subject.
    pub fn refine(&self, phrase: &str) -> Option<String> {
        let stripped = match &self.banned {
            Some(banned) => banned
                .replace_all(phrase, "")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" "),
            None => phrase.split_whitespace().collect::<Vec<_>>().join(" "),
        };
        let words = stripped.split_whitespace().count();
        let passes = words >= self.min_title_words.max(1)
            && self.generic_count(&stripped) <= self.max_generic_terms;
        passes.then_some(stripped)
    }

    /// Score the subject that ended up in the title.
    pub fn assess(&self, subject: &str, fell_back: bool) -> TitleQuality {
        let mut issues = Vec::new();
        let mut penalty = 0u32;

        let banned = self.banned_words(subject);
        if !banned.is_empty() {
            issues.push(format!("banned words in title: {}", banned.join(", ")));
            penalty += 20;
        }
        let generic = self.generic_count(subject);
        if generic > self.max_generic_terms {
            issues.push(format!("title contains {generic} generic terms"));
            penalty += 10;
        }
        let words = subject.split_whitespace().count();
        if words < self.min_title_words {
            issues.push(format!("title too short ({words} words)"));
            penalty += 10;
        }

        TitleQuality {
            score: u8::try_from(100u32.saturating_sub(penalty)).unwrap_or(0),
            issues,
            fell_back,
        }
    }

    /// Distinct banned words in order of appearance, lowercased.
    fn banned_words(&self, text: &str) -> Vec<String> {
        let Some(banned) = &self.banned else {
            return Vec::new();
        };
        let mut found: Vec<String> = Vec::new();
        for m in banned.find_iter(text) {
            let word = m.as_str().to_lowercase();
            if !found.contains(&word) {
                found.push(word);
            }
        }
        found
    }

    fn generic_count(&self, text: &str) -> usize {
        text.split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|w| self.generic.contains(w))
            .count()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
