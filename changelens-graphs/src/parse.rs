// Budgeted parsing.
//
// Malformed input and parses that run past their budget are both reported as
// errors so callers can degrade the file instead of trusting a partial tree.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::debug;
use tree_sitter::{Node, ParseOptions, ParseState, Parser, Tree};

use crate::{GraphError, Result};

/// A per-file time budget shared by every stage that reads the file.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    /// Start the clock now. `None` never expires.
    pub fn start(budget: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn unbounded() -> Self {
        Self::start(None)
    }

    pub fn expired(&self) -> bool {
        self.budget.is_some_and(|limit| self.started.elapsed() >= limit)
    }

    /// [`GraphError::Timeout`] for `path` once the budget has run out.
    pub fn check(&self, path: &Path) -> Result<()> {
        match self.budget {
            Some(limit) if self.started.elapsed() >= limit => {
                debug!(path = %path.display(), budget = ?limit, "Budget exhausted");
                Err(GraphError::Timeout {
                    path: path.to_string_lossy().to_string(),
                    budget_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Parse `source`, cancelling once `deadline` has passed.
///
/// Returns [`GraphError::Parse`] when the tree contains syntax errors and
/// [`GraphError::Timeout`] when the budget ran out.
pub fn parse_with_budget(
    language: &tree_sitter::Language,
    source: &str,
    path: &Path,
    deadline: &Deadline,
) -> Result<Tree> {
    deadline.check(path)?;

    let mut parser = Parser::new();
    parser
        .set_language(language)
        .map_err(|e| GraphError::TreeSitter(format!("Failed to set language: {e}")))?;

    let bytes = source.as_bytes();
    let mut read = |offset: usize, _: tree_sitter::Point| bytes.get(offset..).unwrap_or_default();

    let tree = if deadline.budget.is_some() {
        let mut cancel = |_: &ParseState| deadline.expired();
        let options = ParseOptions::new().progress_callback(&mut cancel);
        parser.parse_with_options(&mut read, None, Some(options))
    } else {
        parser.parse_with_options(&mut read, None, None)
    };

    let Some(tree) = tree else {
        deadline.check(path)?;
        return Err(GraphError::TreeSitter("tree-sitter parse returned None".to_string()));
    };

    let root = tree.root_node();
    if root.has_error() {
        let row = first_error_row(root).unwrap_or(0);
        return Err(GraphError::Parse {
            path: path.to_string_lossy().to_string(),
            message: format!("syntax error near line {}", row + 1),
        });
    }

    Ok(tree)
}

/// Row of the first `ERROR` or missing node, depth-first.
fn first_error_row(node: Node<'_>) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    node.children(&mut cursor).find_map(first_error_row)
}
