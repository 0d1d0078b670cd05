use changelens_core::config::LensConfig;
use changelens_core::error::DegradeReason;
use changelens_core::extract::{AreaTagger, EntityExtractor};
use changelens_core::types::EntityStatus;
use changelens_core::{LensError, RenderMode, analyze, summarize_statistics};
use changelens_graphs::LanguageRegistry;
use changelens_test::{
    deep_analysis_addition, mutual_references, narrate, one_malformed_two_healthy, tests_only,
};

// ── Single capability addition ───────────────────────────────────

#[test]
fn added_ast_module_is_a_deep_analysis_feature() {
    let narrative = narrate(&deep_analysis_addition());

    assert_eq!(narrative.title, "feat(core): deep code analysis engine");
    assert_eq!(narrative.mode, RenderMode::Enhanced);
    assert_eq!(narrative.capabilities.len(), 1);
    assert_eq!(narrative.capabilities[0].id, "ast_analysis");
    assert_eq!(narrative.capabilities[0].strength, 2);
    assert_eq!(narrative.metrics.functional_coverage, 100);
    assert!(narrative.metrics.value_score >= 30);

    let roles: Vec<&str> = narrative.components.iter().map(|c| c.role.as_str()).collect();
    assert_eq!(roles, vec!["function outline"]);

    let message = narrative.message();
    assert!(message.contains("CAPABILITIES:\n- ast_analysis: intelligent change detection"));
    assert!(message.contains("COMPONENTS:\n- function outline (outline)"));
    assert!(message.contains("METRICS:"));
    assert!(!message.contains("RELATIONS:"));
}

// ── Empty change set ─────────────────────────────────────────────

#[test]
fn empty_change_set_is_an_error() {
    let err = analyze(&[], "", &LensConfig::default()).unwrap_err();
    assert!(matches!(err, LensError::EmptyChangeSet));
    assert!(matches!(
        summarize_statistics(&[]),
        Err(LensError::EmptyChangeSet)
    ));
}

// ── Mutual references ────────────────────────────────────────────

#[test]
fn mutual_imports_form_a_two_file_chain() {
    let narrative = narrate(&mutual_references());

    assert_eq!(narrative.relations.len(), 2);
    assert_eq!(narrative.chain, vec!["a.py", "b.py"]);
    assert!((narrative.metrics.relation_density - 1.0).abs() < f64::EPSILON);
}

// ── Malformed file isolation ─────────────────────────────────────

#[test]
fn malformed_file_degrades_alone() {
    let changes = one_malformed_two_healthy();
    let narrative = narrate(&changes);

    assert_eq!(narrative.stats.files_changed, 3);
    assert_eq!(narrative.degraded.len(), 1);
    assert_eq!(narrative.degraded[0].path, "src/broken.py");
    assert!(matches!(
        narrative.degraded[0].reason,
        DegradeReason::ParseFailure { .. }
    ));

    assert!(narrative.components.iter().all(|c| c.file != "src/broken.py"));
    assert!(
        narrative
            .components
            .iter()
            .any(|c| c.file == "src/calc.py" && c.name == "add")
    );
    assert!(narrative.components.iter().any(|c| c.file == "src/shapes.rs"));
}

#[test]
fn malformed_file_has_no_entities_and_no_delta() {
    let config = LensConfig::default();
    let registry = LanguageRegistry::new();
    let areas = AreaTagger::new(&config.areas).unwrap();
    let extractor = EntityExtractor::new(&registry, &areas, &config.extraction);

    let changes = one_malformed_two_healthy();
    let refs: Vec<_> = changes.iter().collect();
    let analyses = extractor.extract_all(&refs);

    let broken = analyses.iter().find(|a| a.path == "src/broken.py").unwrap();
    assert!(broken.entities.is_empty());
    assert_eq!(broken.complexity_delta, 0);
    assert!(broken.degraded.is_some());

    let calc = analyses.iter().find(|a| a.path == "src/calc.py").unwrap();
    assert!(calc.degraded.is_none());
    assert_eq!(calc.entities.len(), 1);
    assert_eq!(calc.entities[0].status, EntityStatus::Modified);
    assert_eq!(calc.complexity_delta, 1);

    let shapes = analyses.iter().find(|a| a.path == "src/shapes.rs").unwrap();
    assert!(shapes.degraded.is_none());
    assert!(!shapes.entities.is_empty());
}

// ── Test-only changes ────────────────────────────────────────────

#[test]
fn test_only_changes_are_classified_as_tests() {
    let narrative = narrate(&tests_only());

    assert_eq!(narrative.metrics.test_impact, 100);
    assert_eq!(narrative.classification.change_type, "test");
    assert_eq!(narrative.classification.scope, "tests");
    assert!(narrative.title.starts_with("test(tests): "));
    assert!(narrative.areas.values().all(|area| area == "tests"));
}
