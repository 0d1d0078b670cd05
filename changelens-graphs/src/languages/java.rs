use std::path::Path;

use tree_sitter::Node;

use crate::{Reference, ResolutionTier, Result, SourceOutline, SymbolKind};

use super::LanguageSupport;
use super::helpers::{BranchRules, child_by_field, definition, dotted_name, node_text};

#[derive(Debug)]
pub struct JavaSupport;

impl LanguageSupport for JavaSupport {
    fn id(&self) -> &'static str {
        "java"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["java"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_java::LANGUAGE.into()
    }

    fn outline_tree(
        &self,
        tree: &tree_sitter::Tree,
        source: &str,
        path: &Path,
    ) -> Result<SourceOutline> {
        let mut walker = JavaWalker {
            source,
            context: Vec::new(),
            outline: SourceOutline::empty(path.to_path_buf(), ResolutionTier::Structural),
        };
        walker.walk_children(tree.root_node());
        Ok(walker.outline)
    }
}

const BRANCHES: BranchRules = BranchRules {
    branch_kinds: &[
        "if_statement",
        "for_statement",
        "enhanced_for_statement",
        "while_statement",
        "do_statement",
        "switch_label",
        "catch_clause",
        "ternary_expression",
    ],
    logical_kinds: &["binary_expression"],
    logical_operators: &["&&", "||"],
    is_definition,
};

fn is_definition(node: Node<'_>) -> bool {
    matches!(
        node.kind(),
        "class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "record_declaration"
            | "method_declaration"
            | "constructor_declaration"
    )
}

struct JavaWalker<'s> {
    source: &'s str,
    context: Vec<String>,
    outline: SourceOutline,
}

impl JavaWalker<'_> {
    fn walk_children(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
    }

    fn visit(&mut self, node: Node<'_>) {
        match node.kind() {
            "class_declaration" | "interface_declaration" | "enum_declaration"
            | "record_declaration" => {
                if let Some(name) = self.push_named(node, SymbolKind::Class) {
                    self.context.push(name);
                    if let Some(body) = child_by_field(node, "body") {
                        self.walk_children(body);
                    }
                    self.context.pop();
                }
            }
            "method_declaration" | "constructor_declaration" => {
                self.push_named(node, SymbolKind::Function);
            }
            "import_declaration" => {
                if let Some(spec) = import_path(node_text(node, self.source)) {
                    self.outline
                        .references
                        .push(Reference::module(spec, node.start_position().row));
                }
            }
            "block" => {}
            _ => self.walk_children(node),
        }
    }

    fn push_named(&mut self, node: Node<'_>, kind: SymbolKind) -> Option<String> {
        let name = node_text(child_by_field(node, "name")?, self.source).to_string();
        let qname = dotted_name(&self.context, &name);
        self.outline.definitions.push(definition(
            node,
            self.source,
            name.clone(),
            qname,
            kind,
            &BRANCHES,
        ));
        Some(name)
    }
}

/// `import static a.b.C.*;` → `a.b.C`.
fn import_path(statement: &str) -> Option<String> {
    let body = statement.trim().strip_prefix("import")?.trim();
    let body = body.strip_prefix("static").unwrap_or(body).trim();
    let body = body.trim_end_matches(';').trim().trim_end_matches(".*");
    (!body.is_empty()).then(|| body.split_whitespace().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outline(source: &str) -> SourceOutline {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_java::LANGUAGE.into())
            .unwrap();
        let tree = parser.parse(source, None).unwrap();
        JavaSupport
            .outline_tree(&tree, source, Path::new("src/main/java/app/Service.java"))
            .unwrap()
    }

    #[test]
    fn extracts_classes_methods_and_inner_types() {
        let source = r"
package app;

import java.util.List;
import static app.util.Strings.*;

public class Service {
    public Service() {}

    int score(List<Integer> xs) {
        int total = 0;
        for (int x : xs) {
            total += x > 0 ? x : 0;
        }
        return total;
    }

    enum Mode { FAST, SLOW }
}
";
        let outline = outline(source);
        let defs: Vec<_> = outline
            .definitions
            .iter()
            .map(|d| (d.qualified_name.as_str(), d.kind))
            .collect();
        assert_eq!(
            defs,
            vec![
                ("Service", SymbolKind::Class),
                ("Service.Service", SymbolKind::Function),
                ("Service.score", SymbolKind::Function),
                ("Service.Mode", SymbolKind::Class),
            ]
        );
        assert_eq!(outline.definitions[2].complexity, 2);
        assert_eq!(
            outline.references,
            vec![
                Reference::module("java.util.List", 3),
                Reference::module("app.util.Strings", 4),
            ]
        );
    }

    #[test]
    fn parses_import_statements() {
        assert_eq!(import_path("import a.b.C;").as_deref(), Some("a.b.C"));
        assert_eq!(import_path("import static a.B.*;").as_deref(), Some("a.B"));
        assert_eq!(import_path("package a;"), None);
    }
}
