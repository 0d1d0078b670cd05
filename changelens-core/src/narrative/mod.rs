// Commit narrative synthesis: classification, rendering mode and body.

pub mod classify;
pub mod quality;
pub mod render;

use std::collections::BTreeMap;

use tracing::debug;

use crate::analyze::RelationAnalysis;
use crate::config::{LensConfig, Thresholds};
use crate::error::ConfigError;
use crate::types::{
    ChangeKind, CommitNarrative, Component, DegradedFile, DetectedCapability, DiffStats,
    FileAnalysis, QualityMetrics, RenderMode,
};

pub use classify::{ChangeSignals, Classifier};
pub use quality::TitleGate;

/// Everything the analysis stages produced for one change set.
#[derive(Debug)]
pub struct NarrativeInputs<'a> {
    pub analyses: &'a [FileAnalysis],
    pub capabilities: Vec<DetectedCapability>,
    pub components: Vec<Component>,
    pub relations: RelationAnalysis,
    pub metrics: QualityMetrics,
    pub stats: DiffStats,
    pub changed_lines: &'a [String],
    pub message_override: Option<&'a str>,
    /// Skip the gate and render statistics only.
    pub force_legacy: bool,
}

/// Assembles the final [`CommitNarrative`].
#[derive(Debug)]
pub struct NarrativeSynthesizer {
    classifier: Classifier,
    title_gate: TitleGate,
    thresholds: Thresholds,
    max_listed_files: usize,
}

impl NarrativeSynthesizer {
    pub fn new(config: &LensConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            classifier: Classifier::new(&config.classification)?,
            title_gate: TitleGate::new(&config.quality)?,
            thresholds: config.scoring.thresholds.clone(),
            max_listed_files: config.legacy.max_listed_files,
        })
    }

    /// Enhanced when enough capabilities were found and the value score
    /// clears its threshold.
    pub fn render_mode(
        &self,
        capabilities: &[DetectedCapability],
        metrics: &QualityMetrics,
    ) -> RenderMode {
        if capabilities.len() >= self.thresholds.min_capabilities
            && metrics.value_score >= self.thresholds.min_value_score
        {
            RenderMode::Enhanced
        } else {
            RenderMode::Legacy
        }
    }

    /// Description of the leading capability when it passes the gate.
    fn capability_phrase<'c>(
        &self,
        capabilities: &'c [DetectedCapability],
        metrics: &QualityMetrics,
    ) -> Option<&'c str> {
        capabilities
            .first()
            .filter(|c| c.strength >= self.thresholds.min_match_strength)
            .filter(|_| metrics.value_score >= self.thresholds.min_value_score)
            .map(|c| c.description.as_str())
    }

    pub fn synthesize(&self, inputs: NarrativeInputs<'_>) -> CommitNarrative {
        let NarrativeInputs {
            analyses,
            capabilities,
            components,
            relations,
            metrics,
            stats,
            changed_lines,
            message_override,
            force_legacy,
        } = inputs;

        let signals = ChangeSignals {
            areas: analyses.iter().map(|a| a.area.as_str()).collect(),
            added_files: analyses
                .iter()
                .filter(|a| a.kind == ChangeKind::Added)
                .count(),
            lines_added: stats.lines_added,
            lines_removed: stats.lines_removed,
            changed_lines,
        };

        let mode = if force_legacy {
            RenderMode::Legacy
        } else {
            self.render_mode(&capabilities, &metrics)
        };

        let (title, classification, title_quality) = match message_override
            .and_then(|message| self.classifier.from_override(message, &signals))
        {
            Some((title, classification)) => {
                let subject = title.split_once(": ").map_or(title.as_str(), |(_, s)| s);
                let quality = self.title_gate.assess(subject, false);
                (title, classification, quality)
            }
            None => {
                let classification = self.classifier.classify(&signals);
                let candidate = match mode {
                    RenderMode::Enhanced => self.capability_phrase(&capabilities, &metrics),
                    RenderMode::Legacy => None,
                };
                let refined = candidate.and_then(|phrase| self.title_gate.refine(phrase));
                let rejected = candidate.filter(|_| refined.is_none());
                if let Some(phrase) = rejected {
                    debug!(phrase, "Capability phrase failed the title checks");
                }
                let fell_back = rejected.is_some();
                let phrase = refined.unwrap_or_else(|| render::update_phrase(analyses.len()));
                let quality = self.title_gate.assess(&phrase, fell_back);
                (render::title(&classification, &phrase), classification, quality)
            }
        };

        let body = match mode {
            RenderMode::Enhanced => {
                render::enhanced_body(&capabilities, &components, &metrics, &relations.chain)
            }
            RenderMode::Legacy => render::legacy_body(&stats, self.max_listed_files),
        };

        debug!(%title, ?mode, "Narrative synthesized");

        let areas: BTreeMap<String, String> = analyses
            .iter()
            .map(|a| (a.path.clone(), a.area.clone()))
            .collect();
        let degraded = analyses
            .iter()
            .filter_map(|a| {
                a.degraded.clone().map(|reason| DegradedFile {
                    path: a.path.clone(),
                    reason,
                })
            })
            .collect();

        CommitNarrative {
            title,
            classification,
            capabilities,
            components,
            metrics,
            relations: relations.relations,
            chain: relations.chain,
            areas,
            stats,
            degraded,
            mode,
            title_quality,
            body,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
