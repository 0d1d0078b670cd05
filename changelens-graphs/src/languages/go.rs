use std::path::Path;

use tree_sitter::Node;

use crate::{Reference, ResolutionTier, Result, SourceOutline, SymbolKind};

use super::LanguageSupport;
use super::helpers::{
    BranchRules, child_by_field, definition, dotted_name, find_child_by_kind, node_text, unquote,
};

#[derive(Debug)]
pub struct GoSupport;

impl LanguageSupport for GoSupport {
    fn id(&self) -> &'static str {
        "go"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_go::LANGUAGE.into()
    }

    fn outline_tree(
        &self,
        tree: &tree_sitter::Tree,
        source: &str,
        path: &Path,
    ) -> Result<SourceOutline> {
        let mut outline = SourceOutline::empty(path.to_path_buf(), ResolutionTier::Structural);
        let root = tree.root_node();
        let mut cursor = root.walk();
        for node in root.children(&mut cursor) {
            visit_top_level(node, source, &mut outline);
        }
        Ok(outline)
    }
}

const BRANCHES: BranchRules = BranchRules {
    branch_kinds: &[
        "if_statement",
        "for_statement",
        "expression_case",
        "type_case",
        "communication_case",
    ],
    logical_kinds: &["binary_expression"],
    logical_operators: &["&&", "||"],
    is_definition,
};

fn is_definition(node: Node<'_>) -> bool {
    matches!(
        node.kind(),
        "function_declaration" | "method_declaration" | "type_spec"
    )
}

fn visit_top_level(node: Node<'_>, source: &str, outline: &mut SourceOutline) {
    match node.kind() {
        "function_declaration" => {
            if let Some(name) = child_by_field(node, "name") {
                let name = node_text(name, source).to_string();
                outline.definitions.push(definition(
                    node,
                    source,
                    name.clone(),
                    name,
                    SymbolKind::Function,
                    &BRANCHES,
                ));
            }
        }
        "method_declaration" => {
            if let Some(name) = child_by_field(node, "name") {
                let name = node_text(name, source).to_string();
                let context: Vec<String> = receiver_type(node, source).into_iter().collect();
                let qname = dotted_name(&context, &name);
                outline.definitions.push(definition(
                    node,
                    source,
                    name,
                    qname,
                    SymbolKind::Function,
                    &BRANCHES,
                ));
            }
        }
        "type_declaration" => {
            let mut cursor = node.walk();
            for spec in node.children(&mut cursor) {
                if !matches!(spec.kind(), "type_spec" | "type_alias") {
                    continue;
                }
                if let Some(name) = child_by_field(spec, "name") {
                    let name = node_text(name, source).to_string();
                    outline.definitions.push(definition(
                        spec,
                        source,
                        name.clone(),
                        name,
                        SymbolKind::Class,
                        &BRANCHES,
                    ));
                }
            }
        }
        "import_declaration" => collect_imports(node, source, &mut outline.references),
        _ => {}
    }
}

/// `func (s *Server) Run()` → `Server`.
fn receiver_type(node: Node<'_>, source: &str) -> Option<String> {
    let receiver = child_by_field(node, "receiver")?;
    let param = find_child_by_kind(receiver, "parameter_declaration")?;
    let ty = node_text(child_by_field(param, "type")?, source);
    let ty = ty.trim_start_matches('*');
    let end = ty.find('[').unwrap_or(ty.len());
    Some(ty[..end].to_string())
}

fn collect_imports(node: Node<'_>, source: &str, out: &mut Vec<Reference>) {
    if node.kind() == "import_spec" {
        if let Some(path) = child_by_field(node, "path") {
            out.push(Reference::module(
                unquote(node_text(path, source)),
                node.start_position().row,
            ));
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_imports(child, source, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outline(source: &str) -> SourceOutline {
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&tree_sitter_go::LANGUAGE.into()).unwrap();
        let tree = parser.parse(source, None).unwrap();
        GoSupport
            .outline_tree(&tree, source, Path::new("pkg/server/server.go"))
            .unwrap()
    }

    #[test]
    fn extracts_functions_methods_and_types() {
        let source = r#"
package server

import (
	"fmt"
	"example.com/app/pkg/store"
)

type Server struct{ addr string }

func (s *Server) Run(ok bool) error {
	if ok && s.addr != "" {
		return nil
	}
	return fmt.Errorf("bad")
}

func New() *Server { return &Server{} }
"#;
        let outline = outline(source);
        let defs: Vec<_> = outline
            .definitions
            .iter()
            .map(|d| (d.qualified_name.as_str(), d.kind))
            .collect();
        assert_eq!(
            defs,
            vec![
                ("Server", SymbolKind::Class),
                ("Server.Run", SymbolKind::Function),
                ("New", SymbolKind::Function),
            ]
        );
        assert_eq!(outline.definitions[1].complexity, 2);
        assert_eq!(
            outline.references,
            vec![
                Reference::module("fmt", 4),
                Reference::module("example.com/app/pkg/store", 5),
            ]
        );
    }

    #[test]
    fn switch_cases_add_complexity() {
        let source = "package x\nfunc f(n int) int {\n\tswitch n {\n\tcase 1:\n\t\treturn 1\n\tcase 2:\n\t\treturn 2\n\t}\n\treturn 0\n}\n";
        let outline = outline(source);
        assert_eq!(outline.definitions[0].complexity, 2);
    }
}
