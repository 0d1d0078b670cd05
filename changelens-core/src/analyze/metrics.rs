// Quality metrics: coverage, density, complexity, test impact and the
// composite value score.

use std::collections::BTreeSet;

use crate::config::ScoringSection;
use crate::types::{DetectedCapability, FileAnalysis, QualityMetrics};

/// Aggregate extractor, mapper and detector outputs into bounded metrics.
pub fn compute_metrics(
    analyses: &[FileAnalysis],
    capabilities: &[DetectedCapability],
    relation_density: f64,
    test_area: &str,
    scoring: &ScoringSection,
) -> QualityMetrics {
    let touched: BTreeSet<&str> = analyses.iter().map(|a| a.area.as_str()).collect();
    let covered: BTreeSet<&str> = capabilities
        .iter()
        .flat_map(|cap| &cap.files)
        .filter_map(|file| analyses.iter().find(|a| &a.path == file))
        .map(|a| a.area.as_str())
        .collect();

    let functional_coverage = ratio_percent(covered.len(), touched.len());
    let test_files = analyses.iter().filter(|a| a.area == test_area).count();
    let test_impact = ratio_percent(test_files, analyses.len());
    let complexity_delta = analyses.iter().map(|a| a.complexity_delta).sum();
    let relation_density = round2(relation_density.max(0.0));

    let value_score = value_score(
        scoring,
        capabilities.len(),
        functional_coverage,
        relation_density,
        complexity_delta,
    );

    QualityMetrics {
        functional_coverage,
        relation_density,
        complexity_delta,
        test_impact,
        value_score,
    }
}

/// Weighted sum of the score factors, clamped to 0..=100. Non-decreasing in
/// each factor as long as the weights are non-negative.
#[allow(clippy::cast_precision_loss)]
pub fn value_score(
    scoring: &ScoringSection,
    capability_count: usize,
    coverage: u8,
    density: f64,
    complexity_delta: i64,
) -> u8 {
    let cap = usize::try_from(scoring.capability_cap).unwrap_or(usize::MAX);
    let capabilities = capability_count.min(cap) as f64;
    let complexity = (complexity_delta.unsigned_abs() as f64 / scoring.complexity_scale).min(1.0);

    let raw = scoring.base
        + scoring.capability * capabilities
        + scoring.coverage * f64::from(coverage) / 100.0
        + scoring.density * density.min(scoring.density_cap)
        + scoring.complexity * complexity;

    clamp_percent(raw)
}

#[allow(clippy::cast_precision_loss)]
fn ratio_percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    clamp_percent(100.0 * part as f64 / whole as f64)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_percent(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use changelens_graphs::ResolutionTier;
    use proptest::prelude::*;

    use super::*;
    use crate::types::ChangeKind;

    fn analysis(path: &str, area: &str, delta: i64) -> FileAnalysis {
        FileAnalysis {
            path: path.into(),
            language: "python".into(),
            kind: ChangeKind::Modified,
            area: area.into(),
            tier: ResolutionTier::Structural,
            entities: vec![],
            complexity_delta: delta,
            references: vec![],
            degraded: None,
        }
    }

    fn capability(files: &[&str]) -> DetectedCapability {
        DetectedCapability {
            id: "cap".into(),
            description: "d".into(),
            impact: "i".into(),
            strength: 1,
            signatures: vec!["s".into()],
            files: files.iter().map(|f| (*f).to_string()).collect(),
        }
    }

    #[test]
    fn coverage_counts_areas_with_capabilities() {
        let analyses = [
            analysis("src/a.py", "core", 3),
            analysis("src/cli.py", "cli", -1),
            analysis("tests/test_a.py", "tests", 2),
            analysis("tests/test_b.py", "tests", 0),
        ];
        let metrics = compute_metrics(
            &analyses,
            &[capability(&["src/a.py"])],
            0.5,
            "tests",
            &ScoringSection::default(),
        );
        assert_eq!(metrics.functional_coverage, 33);
        assert_eq!(metrics.test_impact, 50);
        assert_eq!(metrics.complexity_delta, 4);
        assert!((metrics.relation_density - 0.5).abs() < f64::EPSILON);
        // 20 + 10 + 30·0.33 + 10·0.5 + 10·0.2
        assert_eq!(metrics.value_score, 47);
    }

    #[test]
    fn empty_inputs_stay_in_bounds() {
        let metrics = compute_metrics(&[], &[], 0.0, "tests", &ScoringSection::default());
        assert_eq!(metrics.functional_coverage, 0);
        assert_eq!(metrics.test_impact, 0);
        assert_eq!(metrics.value_score, 20);
    }

    #[test]
    fn score_is_clamped() {
        let scoring = ScoringSection {
            base: 500.0,
            ..ScoringSection::default()
        };
        assert_eq!(value_score(&scoring, 10, 100, 5.0, 1000), 100);
        assert_eq!(clamp_percent(f64::NAN), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn score_is_monotonic_in_each_factor(
            caps in 0usize..6,
            coverage in 0u8..=100,
            density in 0.0f64..3.0,
            delta in -50i64..50,
        ) {
            let scoring = ScoringSection::default();
            let base = value_score(&scoring, caps, coverage, density, delta);
            prop_assert!(value_score(&scoring, caps + 1, coverage, density, delta) >= base);
            prop_assert!(value_score(&scoring, caps, coverage.saturating_add(1).min(100), density, delta) >= base);
            prop_assert!(value_score(&scoring, caps, coverage, density + 0.1, delta) >= base);
            let wider = if delta >= 0 { delta + 1 } else { delta - 1 };
            prop_assert!(value_score(&scoring, caps, coverage, density, wider) >= base);
            prop_assert!(base <= 100);
        }
    }
}
