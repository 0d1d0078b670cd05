// Entity extraction: per-file structural diffs, complexity deltas, reference
// statements and functional areas.

pub mod area;
pub mod diffstat;

use std::path::Path;
use std::time::{Duration, Instant};

use changelens_graphs::diff::diff_outlines;
use changelens_graphs::languages::heuristic;
use changelens_graphs::parse::Deadline;
use changelens_graphs::{LanguageRegistry, ResolutionTier, SourceOutline};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::config::ExtractionSection;
use crate::error::{DegradeReason, ExtractError};
use crate::types::{Entity, FileAnalysis, FileChange};

pub use area::AreaTagger;

/// Runs the structure engine over every file of a change set.
#[derive(Debug)]
pub struct EntityExtractor<'a> {
    registry: &'a LanguageRegistry,
    areas: &'a AreaTagger,
    budget: Option<Duration>,
    max_file_bytes: usize,
}

impl<'a> EntityExtractor<'a> {
    pub fn new(
        registry: &'a LanguageRegistry,
        areas: &'a AreaTagger,
        section: &ExtractionSection,
    ) -> Self {
        Self {
            registry,
            areas,
            budget: (section.timeout_ms > 0).then(|| Duration::from_millis(section.timeout_ms)),
            max_file_bytes: section.max_file_bytes,
        }
    }

    /// Extract every file in parallel. Results are sorted by path.
    #[instrument(skip_all, name = "extract_entities")]
    pub fn extract_all(&self, changes: &[&FileChange]) -> Vec<FileAnalysis> {
        let start = Instant::now();
        let mut analyses: Vec<FileAnalysis> =
            changes.par_iter().map(|change| self.extract(change)).collect();
        analyses.sort_by(|a, b| a.path.cmp(&b.path));

        info!(
            files = analyses.len(),
            entities = analyses.iter().map(|a| a.entities.len()).sum::<usize>(),
            degraded = analyses.iter().filter(|a| a.degraded.is_some()).count(),
            duration = ?start.elapsed(),
            "Entity extraction complete"
        );
        analyses
    }

    /// Extract one file. Failures degrade the file instead of propagating.
    pub fn extract(&self, change: &FileChange) -> FileAnalysis {
        let path = change.path();
        let language = change.language();
        let tier = if self.registry.is_structural(language) {
            ResolutionTier::Structural
        } else {
            ResolutionTier::Heuristic
        };

        match self.outline_both(change) {
            Ok((old, new)) => {
                let diff = diff_outlines(old.as_ref(), new.as_ref());
                let entities: Vec<Entity> = diff
                    .changes
                    .into_iter()
                    .map(|c| Entity {
                        name: c.qualified_name,
                        short_name: c.name,
                        kind: c.kind,
                        file: path.to_string(),
                        status: c.status,
                        complexity: c.complexity,
                    })
                    .collect();

                let current = new.as_ref().or(old.as_ref());
                let names: Vec<&str> = current
                    .map(|o| o.definitions.iter().map(|d| d.name.as_str()).collect())
                    .unwrap_or_default();
                let area = self.areas.tag(path, &names).to_string();
                let references = new.map(|o| o.references).unwrap_or_default();

                debug!(
                    path,
                    language,
                    entities = entities.len(),
                    delta = diff.complexity_delta,
                    "Extracted file"
                );

                FileAnalysis {
                    path: path.to_string(),
                    language: language.to_string(),
                    kind: change.kind(),
                    area,
                    tier,
                    entities,
                    complexity_delta: diff.complexity_delta,
                    references,
                    degraded: None,
                }
            }
            Err(err) => {
                warn!(path, error = %err, "Extraction degraded to statistics only");
                let references = match (&err, change.new_text()) {
                    (ExtractError::Timeout { .. }, _) | (_, None) => Vec::new(),
                    (ExtractError::Parse { .. }, Some(text)) => {
                        let deadline = Deadline::start(self.budget);
                        heuristic::references(text, Path::new(path), language, &deadline)
                            .unwrap_or_default()
                    }
                };
                FileAnalysis {
                    path: path.to_string(),
                    language: language.to_string(),
                    kind: change.kind(),
                    area: self.areas.tag(path, &[]).to_string(),
                    tier,
                    entities: Vec::new(),
                    complexity_delta: 0,
                    references,
                    degraded: Some(DegradeReason::from(&err)),
                }
            }
        }
    }

    /// Outline both versions under one per-file deadline. References are
    /// only read from the new version.
    fn outline_both(
        &self,
        change: &FileChange,
    ) -> Result<(Option<SourceOutline>, Option<SourceOutline>), ExtractError> {
        let deadline = Deadline::start(self.budget);
        let old = change
            .old()
            .map(|text| self.outline(change, text, false, &deadline))
            .transpose()?;
        let new = change
            .new_text()
            .map(|text| self.outline(change, text, true, &deadline))
            .transpose()?;
        Ok((old, new))
    }

    fn outline(
        &self,
        change: &FileChange,
        text: &str,
        with_references: bool,
        deadline: &Deadline,
    ) -> Result<SourceOutline, ExtractError> {
        if text.len() > self.max_file_bytes {
            return Err(ExtractError::Parse {
                path: change.path().to_string(),
                message: format!(
                    "{} bytes exceeds the {} byte limit",
                    text.len(),
                    self.max_file_bytes
                ),
            });
        }
        self.registry
            .outline(
                change.language(),
                text,
                Path::new(change.path()),
                with_references,
                deadline,
            )
            .map_err(|e| ExtractError::from_graph(change.path(), e))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
