// Pipeline orchestrator: Extract → Map → Relate → Measure → Narrate.

use std::time::Instant;

use changelens_graphs::{LanguageRegistry, ResolutionTier};
use tracing::{info, instrument, warn};

use crate::analyze::{
    CapabilityScanner, RelationAnalysis, RoleMapper, compute_metrics, detect_relations,
};
use crate::config::LensConfig;
use crate::error::{LensError, Result};
use crate::extract::diffstat::{compute_stats, parse_unified_diff, synthesized_changed_lines};
use crate::extract::{AreaTagger, EntityExtractor};
use crate::narrative::{NarrativeInputs, NarrativeSynthesizer};
use crate::types::{CommitNarrative, FileAnalysis, FileChange};

/// Per-call options for [`LensPipeline::analyze`].
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// Caller-supplied commit message; its first line becomes the title.
    pub message_override: Option<String>,
}

/// A validated configuration with every pattern compiled, ready to analyze
/// any number of change sets.
#[derive(Debug)]
pub struct LensPipeline {
    config: LensConfig,
    registry: LanguageRegistry,
    areas: AreaTagger,
    roles: RoleMapper,
    capabilities: CapabilityScanner,
    synthesizer: NarrativeSynthesizer,
}

impl LensPipeline {
    /// Validate `config` and compile its rules. Every configuration problem
    /// surfaces here, before any file is looked at.
    pub fn new(config: LensConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry: LanguageRegistry::new(),
            areas: AreaTagger::new(&config.areas)?,
            roles: RoleMapper::new(&config.roles)?,
            capabilities: CapabilityScanner::new(&config.capabilities)?,
            synthesizer: NarrativeSynthesizer::new(&config)?,
            config,
        })
    }

    pub fn config(&self) -> &LensConfig {
        &self.config
    }

    /// Full analysis of one change set. `diff_text` may be empty, in which
    /// case line statistics come from diffing the file versions.
    #[instrument(skip_all, name = "analyze", fields(files = changes.len()))]
    pub fn analyze(
        &self,
        changes: &[FileChange],
        diff_text: &str,
        options: &AnalyzeOptions,
    ) -> Result<CommitNarrative> {
        let start = Instant::now();
        let changes = unique_changes(changes)?;

        let extractor =
            EntityExtractor::new(&self.registry, &self.areas, &self.config.extraction);
        let analyses = extractor.extract_all(&changes);
        let components = self.roles.components(&analyses);
        let capabilities = self.capabilities.detect(&changes);
        let relations = detect_relations(&analyses, self.config.relations.max_search_steps);
        let metrics = compute_metrics(
            &analyses,
            &capabilities,
            relations.density,
            self.areas.test_area(),
            &self.config.scoring,
        );

        let parsed = (!diff_text.trim().is_empty()).then(|| parse_unified_diff(diff_text));
        let stats = compute_stats(&changes, parsed.as_ref());
        let changed_lines =
            parsed.map_or_else(|| synthesized_changed_lines(&changes), |p| p.changed_lines);

        let narrative = self.synthesizer.synthesize(NarrativeInputs {
            analyses: &analyses,
            capabilities,
            components,
            relations,
            metrics,
            stats,
            changed_lines: &changed_lines,
            message_override: options.message_override.as_deref(),
            force_legacy: false,
        });

        info!(
            title = %narrative.title,
            mode = ?narrative.mode,
            capabilities = narrative.capabilities.len(),
            relations = narrative.relations.len(),
            value_score = narrative.metrics.value_score,
            degraded = narrative.degraded.len(),
            duration = ?start.elapsed(),
            "Analysis complete"
        );
        Ok(narrative)
    }

    /// Statistics-only narrative. No parsing, capability scanning or
    /// relation detection; areas come from paths alone.
    #[instrument(skip_all, name = "summarize_statistics", fields(files = changes.len()))]
    pub fn summarize_statistics(&self, changes: &[FileChange]) -> Result<CommitNarrative> {
        let changes = unique_changes(changes)?;

        let analyses: Vec<FileAnalysis> = changes
            .iter()
            .map(|change| FileAnalysis {
                path: change.path().to_string(),
                language: change.language().to_string(),
                kind: change.kind(),
                area: self.areas.tag(change.path(), &[]).to_string(),
                tier: ResolutionTier::Heuristic,
                entities: Vec::new(),
                complexity_delta: 0,
                references: Vec::new(),
                degraded: None,
            })
            .collect();
        let metrics = compute_metrics(
            &analyses,
            &[],
            0.0,
            self.areas.test_area(),
            &self.config.scoring,
        );
        let stats = compute_stats(&changes, None);
        let changed_lines = synthesized_changed_lines(&changes);

        let narrative = self.synthesizer.synthesize(NarrativeInputs {
            analyses: &analyses,
            capabilities: Vec::new(),
            components: Vec::new(),
            relations: RelationAnalysis::default(),
            metrics,
            stats,
            changed_lines: &changed_lines,
            message_override: None,
            force_legacy: true,
        });

        info!(title = %narrative.title, files = analyses.len(), "Statistics summary complete");
        Ok(narrative)
    }
}

/// Analyze one change set with `config`.
pub fn analyze(
    changes: &[FileChange],
    diff_text: &str,
    config: &LensConfig,
) -> Result<CommitNarrative> {
    LensPipeline::new(config.clone())?.analyze(changes, diff_text, &AnalyzeOptions::default())
}

/// Statistics-only narrative under the default configuration.
pub fn summarize_statistics(changes: &[FileChange]) -> Result<CommitNarrative> {
    LensPipeline::new(LensConfig::default())?.summarize_statistics(changes)
}

/// Changes sorted by path with later duplicates dropped.
fn unique_changes(changes: &[FileChange]) -> Result<Vec<&FileChange>> {
    if changes.is_empty() {
        return Err(LensError::EmptyChangeSet);
    }
    let mut unique: Vec<&FileChange> = changes.iter().collect();
    unique.sort_by(|a, b| a.path().cmp(b.path()));
    unique.dedup_by(|later, earlier| {
        let duplicate = later.path() == earlier.path();
        if duplicate {
            warn!(path = later.path(), "Duplicate path in change set, keeping the first");
        }
        duplicate
    });
    Ok(unique)
}

// ── Tests ─────────────────────────────────────────────────────────────
