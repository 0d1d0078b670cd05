// Relation detection among the changed files.
//
// Edges come from resolved reference statements. The representative chain is
// the longest simple path, found by an explicit-stack DFS with an on-path
// visited set so cycles (mutual imports) always terminate.

use changelens_graphs::references::{ReferenceIndex, project_reference_graph};
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, instrument, warn};

use crate::types::{FileAnalysis, Relation, RelationKind};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationAnalysis {
    /// Sorted by (from, to).
    pub relations: Vec<Relation>,
    pub chain: Vec<String>,
    /// Edges per changed file.
    pub density: f64,
}

/// File graph over the change set: one node per file, in lexical order.
#[derive(Debug)]
pub struct RelationGraph {
    pub graph: DiGraph<String, ()>,
    /// Out-neighbours of each node in lexical order.
    adjacency: Vec<Vec<NodeIndex>>,
}

impl RelationGraph {
    /// `paths` must be sorted and free of duplicates.
    pub fn new(paths: &[&str], relations: &[Relation]) -> Self {
        let mut graph = DiGraph::with_capacity(paths.len(), relations.len());
        for path in paths {
            graph.add_node((*path).to_string());
        }
        let index_of = |path: &str| paths.binary_search(&path).ok().map(NodeIndex::new);

        let mut adjacency = vec![Vec::new(); paths.len()];
        for relation in relations {
            let endpoints = (
                index_of(relation.from.as_str()),
                index_of(relation.to.as_str()),
            );
            if let (Some(from), Some(to)) = endpoints {
                graph.add_edge(from, to, ());
                adjacency[from.index()].push(to);
            }
        }
        for neighbours in &mut adjacency {
            neighbours.sort_unstable();
            neighbours.dedup();
        }

        Self { graph, adjacency }
    }

    /// Longest simple path. Starts are tried in lexical order and the first
    /// longest path found is kept. Gives up after `max_steps` node visits,
    /// keeping the best path so far.
    pub fn longest_chain(&self, max_steps: usize) -> Vec<String> {
        if self.graph.edge_count() == 0 {
            return Vec::new();
        }

        let node_count = self.graph.node_count();
        let mut best: Vec<NodeIndex> = Vec::new();
        let mut steps = 0usize;
        let mut on_path = vec![false; node_count];

        'starts: for start in self.graph.node_indices() {
            if self.adjacency[start.index()].is_empty() {
                continue;
            }
            // Each frame: node and position of the next neighbour to try.
            let mut stack: Vec<(NodeIndex, usize)> = vec![(start, 0)];
            on_path[start.index()] = true;
            let mut path = vec![start];

            while let Some(frame) = stack.last_mut() {
                let (node, next) = *frame;
                if let Some(&neighbour) = self.adjacency[node.index()].get(next) {
                    frame.1 += 1;
                    if on_path[neighbour.index()] {
                        continue;
                    }
                    steps += 1;
                    if steps > max_steps {
                        warn!(max_steps, "Relation chain search budget exhausted");
                        break 'starts;
                    }
                    on_path[neighbour.index()] = true;
                    path.push(neighbour);
                    stack.push((neighbour, 0));
                    if path.len() > best.len() {
                        best.clone_from(&path);
                        if best.len() == node_count {
                            break 'starts;
                        }
                    }
                } else {
                    on_path[node.index()] = false;
                    path.pop();
                    stack.pop();
                }
            }
        }

        debug!(length = best.len(), steps, "Relation chain search complete");
        best.into_iter().map(|n| self.graph[n].clone()).collect()
    }
}

/// Resolve every file's references against the change set and derive the
/// relation chain and density.
#[instrument(skip_all, name = "detect_relations")]
pub fn detect_relations(analyses: &[FileAnalysis], max_steps: usize) -> RelationAnalysis {
    let mut paths: Vec<&str> = analyses.iter().map(|a| a.path.as_str()).collect();
    paths.sort_unstable();
    paths.dedup();

    let index = ReferenceIndex::new(paths.iter().copied());
    let projected = project_reference_graph(
        &index,
        analyses
            .iter()
            .map(|a| (a.path.as_str(), a.references.as_slice())),
    );

    let relations: Vec<Relation> = projected
        .edges
        .into_iter()
        .map(|edge| Relation {
            from: edge.source_file,
            to: edge.target_file,
            kind: RelationKind::Reference,
            specifiers: edge.specifiers,
        })
        .collect();

    let chain = RelationGraph::new(&paths, &relations).longest_chain(max_steps);

    #[allow(clippy::cast_precision_loss)]
    let density = if paths.is_empty() {
        0.0
    } else {
        relations.len() as f64 / paths.len() as f64
    };

    RelationAnalysis {
        relations,
        chain,
        density,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use changelens_graphs::{Reference, ResolutionTier};
    use proptest::prelude::*;

    use super::*;
    use crate::types::ChangeKind;

    fn analysis(path: &str, references: Vec<Reference>) -> FileAnalysis {
        FileAnalysis {
            path: path.to_string(),
            language: "python".into(),
            kind: ChangeKind::Added,
            area: "core".into(),
            tier: ResolutionTier::Structural,
            entities: vec![],
            complexity_delta: 0,
            references,
            degraded: None,
        }
    }

    fn relation(from: &str, to: &str) -> Relation {
        Relation {
            from: from.into(),
            to: to.into(),
            kind: RelationKind::Reference,
            specifiers: vec![],
        }
    }

    #[test]
    fn mutual_references_form_a_two_node_chain() {
        let result = detect_relations(
            &[
                analysis("a.py", vec![Reference::module("b", 0)]),
                analysis("b.py", vec![Reference::module("a", 0)]),
            ],
            1000,
        );
        assert_eq!(result.relations.len(), 2);
        assert_eq!(result.chain, vec!["a.py", "b.py"]);
        assert!((result.density - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn external_references_produce_no_edges() {
        let result = detect_relations(
            &[analysis("a.py", vec![Reference::module("os", 0)])],
            1000,
        );
        assert!(result.relations.is_empty());
        assert!(result.chain.is_empty());
        assert!(result.density.abs() < f64::EPSILON);
    }

    #[test]
    fn picks_the_longest_path_with_lexical_tie_break() {
        let paths = ["a", "b", "c", "d", "e"];
        let relations = [
            relation("a", "d"),
            relation("b", "c"),
            relation("c", "d"),
            relation("d", "e"),
            relation("e", "b"),
        ];
        let graph = RelationGraph::new(&paths, &relations);
        // a→d→e→b→c is the only five-node path.
        assert_eq!(graph.longest_chain(1000), vec!["a", "d", "e", "b", "c"]);

        let tie = RelationGraph::new(&["x", "y", "z"], &[relation("y", "z"), relation("x", "y")]);
        assert_eq!(tie.longest_chain(1000), vec!["x", "y", "z"]);
    }

    #[test]
    fn exhausted_budget_keeps_the_best_path_so_far() {
        let paths = ["a", "b", "c", "d"];
        let relations = [relation("a", "b"), relation("b", "c"), relation("c", "d")];
        let graph = RelationGraph::new(&paths, &relations);
        assert_eq!(graph.longest_chain(2), vec!["a", "b", "c"]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn chains_never_repeat_nodes(edges in prop::collection::vec((0usize..6, 0usize..6), 0..20)) {
            let names = ["f0", "f1", "f2", "f3", "f4", "f5"];
            let relations: Vec<Relation> = edges
                .iter()
                .filter(|(a, b)| a != b)
                .map(|&(a, b)| relation(names[a], names[b]))
                .collect();
            let chain = RelationGraph::new(&names, &relations).longest_chain(100_000);
            let unique: HashSet<&String> = chain.iter().collect();
            prop_assert_eq!(unique.len(), chain.len());
            prop_assert!(chain.len() <= names.len());
            prop_assert_eq!(chain.is_empty(), relations.is_empty());
            for pair in chain.windows(2) {
                prop_assert!(relations.iter().any(|r| r.from == pair[0] && r.to == pair[1]));
            }
        }
    }
}
