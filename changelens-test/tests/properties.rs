use std::collections::HashSet;

use changelens_core::{AnalyzeOptions, FileChange, LensConfig, LensPipeline, RenderMode};
use changelens_test::{default_pipeline, mixed_change_set};
use proptest::prelude::*;

/// Python module `f{index}` importing the given siblings.
fn module(index: usize, imports: &[usize]) -> FileChange {
    let mut text: String = imports.iter().map(|j| format!("import f{j}\n")).collect();
    text.push_str(&format!("\n\ndef fn_{index}(x):\n    if x:\n        return {index}\n    return 0\n"));
    FileChange::added(format!("f{index}.py"), text)
}

fn module_graph() -> impl Strategy<Value = Vec<FileChange>> {
    (2usize..7).prop_flat_map(|files| {
        prop::collection::vec(prop::collection::vec(0..files, 0..4), files).prop_map(|imports| {
            imports
                .iter()
                .enumerate()
                .map(|(i, targets)| {
                    let targets: Vec<usize> = targets.iter().copied().filter(|t| *t != i).collect();
                    module(i, &targets)
                })
                .collect()
        })
    })
}

fn subset_of_mixed() -> impl Strategy<Value = Vec<FileChange>> {
    let all = mixed_change_set();
    let len = all.len();
    prop::sample::subsequence(all, 1..=len)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn identical_inputs_give_identical_narratives(changes in subset_of_mixed()) {
        let pipeline = default_pipeline();
        let first = pipeline.analyze(&changes, "", &AnalyzeOptions::default()).unwrap();

        let mut reversed = changes.clone();
        reversed.reverse();
        let second = pipeline.analyze(&reversed, "", &AnalyzeOptions::default()).unwrap();

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn complexity_delta_is_additive_over_files(changes in subset_of_mixed()) {
        let pipeline = default_pipeline();
        let options = AnalyzeOptions::default();
        let whole = pipeline.analyze(&changes, "", &options).unwrap();
        let parts: i64 = changes
            .iter()
            .map(|c| {
                pipeline
                    .analyze(std::slice::from_ref(c), "", &options)
                    .unwrap()
                    .metrics
                    .complexity_delta
            })
            .sum();
        prop_assert_eq!(whole.metrics.complexity_delta, parts);
    }

    #[test]
    fn relation_chains_are_simple_paths(changes in module_graph()) {
        let narrative = default_pipeline()
            .analyze(&changes, "", &AnalyzeOptions::default())
            .unwrap();

        let unique: HashSet<&String> = narrative.chain.iter().collect();
        prop_assert_eq!(unique.len(), narrative.chain.len());
        prop_assert!(narrative.chain.len() <= changes.len());
        prop_assert_eq!(narrative.chain.is_empty(), narrative.relations.is_empty());
        for pair in narrative.chain.windows(2) {
            prop_assert!(
                narrative.relations.iter().any(|r| r.from == pair[0] && r.to == pair[1])
            );
        }
    }

    #[test]
    fn without_capabilities_output_is_statistics_only(changes in subset_of_mixed()) {
        let config = LensConfig {
            capabilities: Vec::new(),
            ..LensConfig::default()
        };
        let narrative = LensPipeline::new(config)
            .unwrap()
            .analyze(&changes, "", &AnalyzeOptions::default())
            .unwrap();

        prop_assert_eq!(narrative.mode, RenderMode::Legacy);
        prop_assert!(narrative.body.starts_with("Statistics:"));
        for section in ["CAPABILITIES:", "COMPONENTS:", "RELATIONS:"] {
            prop_assert!(!narrative.body.contains(section));
        }
    }

    #[test]
    fn legacy_output_never_lists_analysis_sections(changes in subset_of_mixed()) {
        let narrative = default_pipeline()
            .analyze(&changes, "", &AnalyzeOptions::default())
            .unwrap();
        if narrative.mode == RenderMode::Legacy {
            for section in ["CAPABILITIES:", "COMPONENTS:", "RELATIONS:", "METRICS:"] {
                prop_assert!(!narrative.body.contains(section));
            }
        } else {
            prop_assert!(!narrative.capabilities.is_empty());
            prop_assert!(narrative.metrics.value_score >= 30);
        }
    }
}
