use tree_sitter::Node;

use crate::{Definition, SymbolKind, TextRange};

/// Extract the source text for a tree-sitter node.
pub fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

/// Find the first child with a specific kind.
pub fn find_child_by_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|child| child.kind() == kind)
}

/// Find a child by field name.
pub fn child_by_field<'a>(node: Node<'a>, field: &str) -> Option<Node<'a>> {
    node.child_by_field_name(field)
}

/// Build a qualified name from a context stack using `::` separator (Rust).
pub fn qualified_name(context: &[String], name: &str) -> String {
    if context.is_empty() {
        name.to_string()
    } else {
        format!("{}::{name}", context.join("::"))
    }
}

/// Build a qualified name from a context stack using `.` separator (most languages).
pub fn dotted_name(context: &[String], name: &str) -> String {
    if context.is_empty() {
        name.to_string()
    } else {
        format!("{}.{name}", context.join("."))
    }
}

/// Convert a tree-sitter node to a `TextRange`.
pub fn node_range(node: Node<'_>) -> TextRange {
    node.range().into()
}

/// Simple string hash for body comparison.
pub fn hash_string(s: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

/// Build a [`Definition`] for `node`, counting branches in its subtree.
pub fn definition(
    node: Node<'_>,
    source: &str,
    name: String,
    qualified_name: String,
    kind: SymbolKind,
    rules: &BranchRules,
) -> Definition {
    Definition {
        name,
        qualified_name,
        kind,
        span: node_range(node),
        complexity: count_branches(node, source, rules),
        body_hash: hash_string(node_text(node, source)),
    }
}

/// Per-language description of what counts as a branch and what counts as a
/// nested definition.
#[derive(Debug)]
pub struct BranchRules {
    /// Node kinds that each add one to complexity.
    pub branch_kinds: &'static [&'static str],
    /// Node kinds whose `operator` field may be a short-circuit operator.
    pub logical_kinds: &'static [&'static str],
    /// Operators counted on `logical_kinds` nodes.
    pub logical_operators: &'static [&'static str],
    /// Returns true for nodes that are definitions in their own right.
    pub is_definition: fn(Node<'_>) -> bool,
}

/// Count branching nodes below `root`, skipping nested definitions.
pub fn count_branches(root: Node<'_>, source: &str, rules: &BranchRules) -> u32 {
    let mut count = 0u32;
    let mut stack = Vec::new();
    let mut cursor = root.walk();
    stack.extend(root.children(&mut cursor));

    while let Some(node) = stack.pop() {
        if (rules.is_definition)(node) {
            continue;
        }
        if is_branch(node, source, rules) {
            count = count.saturating_add(1);
        }
        let mut cursor = node.walk();
        stack.extend(node.children(&mut cursor));
    }

    count
}

fn is_branch(node: Node<'_>, source: &str, rules: &BranchRules) -> bool {
    let kind = node.kind();
    if rules.branch_kinds.contains(&kind) {
        return true;
    }
    if rules.logical_kinds.contains(&kind) {
        return child_by_field(node, "operator")
            .is_some_and(|op| rules.logical_operators.contains(&node_text(op, source)));
    }
    false
}

/// Strip one layer of matching quotes from a string literal.
pub fn unquote(text: &str) -> &str {
    let trimmed = text.trim();
    for quote in ['"', '\'', '`'] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    trimmed
}
