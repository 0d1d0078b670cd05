use std::path::Path;

use tree_sitter::Node;

use crate::{Reference, ResolutionTier, Result, SourceOutline, SymbolKind};

use super::LanguageSupport;
use super::helpers::{BranchRules, child_by_field, definition, dotted_name, node_text, unquote};

#[derive(Debug)]
pub struct JavaScriptSupport;

impl LanguageSupport for JavaScriptSupport {
    fn id(&self) -> &'static str {
        "javascript"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["js", "jsx", "mjs", "cjs"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_javascript::LANGUAGE.into()
    }

    fn outline_tree(
        &self,
        tree: &tree_sitter::Tree,
        source: &str,
        path: &Path,
    ) -> Result<SourceOutline> {
        Ok(outline_ecma(tree, source, path))
    }
}

/// Outline a JavaScript or TypeScript tree. TypeScript-only node kinds never
/// occur in JavaScript trees, so one walker serves both grammars.
pub(super) fn outline_ecma(tree: &tree_sitter::Tree, source: &str, path: &Path) -> SourceOutline {
    let mut walker = EcmaWalker {
        source,
        context: Vec::new(),
        outline: SourceOutline::empty(path.to_path_buf(), ResolutionTier::Structural),
    };
    walker.walk_children(tree.root_node());
    collect_references(tree.root_node(), source, &mut walker.outline.references);
    walker.outline
}

const BRANCHES: BranchRules = BranchRules {
    branch_kinds: &[
        "if_statement",
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
        "switch_case",
        "catch_clause",
        "ternary_expression",
    ],
    logical_kinds: &["binary_expression"],
    logical_operators: &["&&", "||", "??"],
    is_definition,
};

fn is_definition(node: Node<'_>) -> bool {
    match node.kind() {
        "function_declaration"
        | "generator_function_declaration"
        | "class_declaration"
        | "abstract_class_declaration"
        | "class"
        | "method_definition"
        | "interface_declaration"
        | "enum_declaration"
        | "internal_module" => true,
        "arrow_function" | "function_expression" | "function" => node
            .parent()
            .is_some_and(|parent| parent.kind() == "variable_declarator"),
        _ => false,
    }
}

struct EcmaWalker<'s> {
    source: &'s str,
    context: Vec<String>,
    outline: SourceOutline,
}

impl EcmaWalker<'_> {
    fn walk_children(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
    }

    fn visit(&mut self, node: Node<'_>) {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" | "method_definition" => {
                self.push_named(node, SymbolKind::Function);
            }
            "class_declaration" | "abstract_class_declaration" => {
                if let Some(name) = self.push_named(node, SymbolKind::Class) {
                    self.with_context(name, node);
                }
            }
            "interface_declaration" | "type_alias_declaration" | "enum_declaration" => {
                self.push_named(node, SymbolKind::Class);
            }
            "internal_module" | "module" => {
                if let Some(name) = self.push_named(node, SymbolKind::Module) {
                    self.with_context(name, node);
                }
            }
            "variable_declarator" => {
                let value = child_by_field(node, "value").filter(|value| {
                    matches!(
                        value.kind(),
                        "arrow_function" | "function_expression" | "function"
                    )
                });
                if let (Some(value), Some(name)) = (value, child_by_field(node, "name")) {
                    let name = node_text(name, self.source).to_string();
                    self.push_definition(value, name, SymbolKind::Function);
                }
            }
            // Function bodies are opaque; nested helpers count toward their parent.
            "statement_block" => {}
            _ => self.walk_children(node),
        }
    }

    fn push_named(&mut self, node: Node<'_>, kind: SymbolKind) -> Option<String> {
        let name = node_text(child_by_field(node, "name")?, self.source).to_string();
        self.push_definition(node, name.clone(), kind);
        Some(name)
    }

    fn push_definition(&mut self, node: Node<'_>, name: String, kind: SymbolKind) {
        let qname = dotted_name(&self.context, &name);
        self.outline
            .definitions
            .push(definition(node, self.source, name, qname, kind, &BRANCHES));
    }

    fn with_context(&mut self, name: String, node: Node<'_>) {
        self.context.push(name);
        if let Some(body) = child_by_field(node, "body") {
            self.walk_children(body);
        }
        self.context.pop();
    }
}

/// `import … from "x"`, `export … from "x"`, `require("x")`, `import("x")`.
fn collect_references(node: Node<'_>, source: &str, out: &mut Vec<Reference>) {
    match node.kind() {
        "import_statement" | "export_statement" => {
            if let Some(src) = child_by_field(node, "source") {
                out.push(reference(unquote(node_text(src, source)), node));
            }
        }
        "call_expression" => {
            let is_loader = child_by_field(node, "function").is_some_and(|f| {
                f.kind() == "import" || (f.kind() == "identifier" && node_text(f, source) == "require")
            });
            if is_loader {
                let first_arg = child_by_field(node, "arguments")
                    .and_then(|args| args.named_child(0))
                    .filter(|arg| arg.kind() == "string");
                if let Some(arg) = first_arg {
                    out.push(reference(unquote(node_text(arg, source)), node));
                }
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_references(child, source, out);
    }
}

fn reference(specifier: &str, node: Node<'_>) -> Reference {
    let line = node.start_position().row;
    if specifier.starts_with('.') || specifier.starts_with('/') {
        Reference::path(specifier, line)
    } else {
        Reference::module(specifier, line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outline(source: &str) -> SourceOutline {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_javascript::LANGUAGE.into())
            .unwrap();
        let tree = parser.parse(source, None).unwrap();
        JavaScriptSupport
            .outline_tree(&tree, source, Path::new("src/app.js"))
            .unwrap()
    }

    fn names(outline: &SourceOutline) -> Vec<&str> {
        outline
            .definitions
            .iter()
            .map(|d| d.qualified_name.as_str())
            .collect()
    }

    #[test]
    fn extracts_functions_classes_and_arrows() {
        let source = r"
export function render(view) { return view; }
class Store {
  get(key) { return this.map[key]; }
}
const handler = (req) => req.ok ? 1 : 0;
";
        let outline = outline(source);
        assert_eq!(names(&outline), vec!["render", "Store", "Store.get", "handler"]);
        assert_eq!(outline.definitions[3].complexity, 1);
    }

    #[test]
    fn callbacks_count_toward_their_function() {
        let source = r"
function run(items) {
  items.forEach((x) => { if (x && x.ok) { go(x); } });
}
";
        let outline = outline(source);
        assert_eq!(names(&outline), vec!["run"]);
        assert_eq!(outline.definitions[0].complexity, 2);
    }

    #[test]
    fn collects_import_require_and_reexport() {
        let source = r#"
import { a } from "./a";
export { b } from "../lib/b";
const fs = require("fs");
async function lazy() { return import("./lazy"); }
"#;
        let outline = outline(source);
        let specs: Vec<_> = outline
            .references
            .iter()
            .map(|r| (r.specifier.as_str(), r.style))
            .collect();
        assert_eq!(
            specs,
            vec![
                ("./a", crate::ReferenceStyle::Path),
                ("../lib/b", crate::ReferenceStyle::Path),
                ("fs", crate::ReferenceStyle::Module),
                ("./lazy", crate::ReferenceStyle::Path),
            ]
        );
    }
}
