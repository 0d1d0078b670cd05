use std::path::Path;

use tree_sitter::Node;

use crate::{Reference, ResolutionTier, Result, SourceOutline, SymbolKind};

use super::LanguageSupport;
use super::helpers::{
    BranchRules, child_by_field, definition, dotted_name, find_child_by_kind, node_text,
};

#[derive(Debug)]
pub struct PythonSupport;

impl LanguageSupport for PythonSupport {
    fn id(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py", "pyi"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_python::LANGUAGE.into()
    }

    fn outline_tree(
        &self,
        tree: &tree_sitter::Tree,
        source: &str,
        path: &Path,
    ) -> Result<SourceOutline> {
        let mut walker = PythonWalker {
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
        "elif_clause",
        "for_statement",
        "while_statement",
        "except_clause",
        "conditional_expression",
        "case_clause",
        "boolean_operator",
    ],
    logical_kinds: &[],
    logical_operators: &[],
    is_definition,
};

fn is_definition(node: Node<'_>) -> bool {
    matches!(node.kind(), "function_definition" | "class_definition")
}

struct PythonWalker<'s> {
    source: &'s str,
    context: Vec<String>,
    outline: SourceOutline,
}

impl PythonWalker<'_> {
    fn walk_children(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
    }

    fn visit(&mut self, node: Node<'_>) {
        match node.kind() {
            "function_definition" => {
                // Nested functions belong to their enclosing function's body.
                self.push_named(node, SymbolKind::Function);
            }
            "class_definition" => {
                if let Some(name) = self.push_named(node, SymbolKind::Class) {
                    self.context.push(name);
                    if let Some(body) = child_by_field(node, "body") {
                        self.walk_children(body);
                    }
                    self.context.pop();
                }
            }
            "import_statement" => self.import(node),
            "import_from_statement" => self.import_from(node),
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

    /// `import a.b, c as d`
    fn import(&mut self, node: Node<'_>) {
        let line = node.start_position().row;
        let mut cursor = node.walk();
        for child in node.children_by_field_name("name", &mut cursor) {
            if let Some(module) = imported_module(child, self.source) {
                self.outline.references.push(Reference::module(module, line));
            }
        }
    }

    /// `from a.b import c`, `from .x import y`, `from .. import z`
    fn import_from(&mut self, node: Node<'_>) {
        let line = node.start_position().row;
        let Some(module_node) = child_by_field(node, "module_name") else {
            return;
        };

        let mut names = Vec::new();
        let mut cursor = node.walk();
        for child in node.children_by_field_name("name", &mut cursor) {
            if let Some(name) = imported_module(child, self.source) {
                names.push(name);
            }
        }

        if module_node.kind() == "relative_import" {
            let dots = find_child_by_kind(module_node, "import_prefix")
                .map_or(1, |prefix| node_text(prefix, self.source).trim().len());
            let base = relative_prefix(dots);
            match find_child_by_kind(module_node, "dotted_name") {
                Some(module) => {
                    let module = node_text(module, self.source).replace('.', "/");
                    self.outline
                        .references
                        .push(Reference::path(format!("{base}{module}"), line));
                }
                None => {
                    for name in names {
                        self.outline
                            .references
                            .push(Reference::path(format!("{base}{name}"), line));
                    }
                }
            }
            return;
        }

        let module = node_text(module_node, self.source).to_string();
        if names.is_empty() {
            self.outline.references.push(Reference::module(module, line));
        } else {
            // `from pkg import sub` may name a submodule; resolution tries the
            // longest module path first and falls back to `pkg`.
            for name in names {
                self.outline
                    .references
                    .push(Reference::module(format!("{module}.{name}"), line));
            }
        }
    }
}

fn imported_module(node: Node<'_>, source: &str) -> Option<String> {
    match node.kind() {
        "dotted_name" => Some(node_text(node, source).to_string()),
        "aliased_import" => child_by_field(node, "name").map(|n| node_text(n, source).to_string()),
        _ => None,
    }
}

/// `.` → `./`, `..` → `../`, `...` → `../../`
fn relative_prefix(dots: usize) -> String {
    if dots <= 1 {
        "./".to_string()
    } else {
        "../".repeat(dots - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outline(source: &str) -> SourceOutline {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .unwrap();
        let tree = parser.parse(source, None).unwrap();
        PythonSupport
            .outline_tree(&tree, source, Path::new("pkg/mod.py"))
            .unwrap()
    }

    #[test]
    fn extracts_classes_and_methods() {
        let source = r#"
class Greeter:
    def greet(self, name):
        if name:
            return "hi " + name
        return "hi"

def main():
    Greeter().greet("x")
"#;
        let outline = outline(source);
        let names: Vec<_> = outline
            .definitions
            .iter()
            .map(|d| (d.qualified_name.as_str(), d.kind))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Greeter", SymbolKind::Class),
                ("Greeter.greet", SymbolKind::Function),
                ("main", SymbolKind::Function),
            ]
        );
        assert_eq!(outline.definitions[0].complexity, 0, "method branches stay on the method");
        assert_eq!(outline.definitions[1].complexity, 1);
    }

    #[test]
    fn decorated_definitions_are_found() {
        let outline = outline("@cache\ndef load():\n    pass\n");
        assert_eq!(outline.definitions[0].name, "load");
    }

    #[test]
    fn counts_python_branch_constructs() {
        let source = r"
def f(a, b):
    if a and b:
        pass
    elif a or b:
        pass
    for x in a:
        while x:
            try:
                pass
            except ValueError:
                pass
";
        let outline = outline(source);
        // if, and, elif, or, for, while, except
        assert_eq!(outline.definitions[0].complexity, 7);
    }

    #[test]
    fn extracts_absolute_and_relative_imports() {
        let source = "import os, app.models as m\nfrom .util import slugify\nfrom .. import config\nfrom app.core import engine\n";
        let outline = outline(source);
        assert_eq!(
            outline.references,
            vec![
                Reference::module("os", 0),
                Reference::module("app.models", 0),
                Reference::path("./util", 1),
                Reference::path("../config", 2),
                Reference::module("app.core.engine", 3),
            ]
        );
    }
}
