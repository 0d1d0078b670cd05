use std::path::Path;

use tree_sitter::Node;

use crate::{Definition, Reference, ResolutionTier, Result, SourceOutline, SymbolKind};

use super::LanguageSupport;
use super::helpers::{BranchRules, child_by_field, definition, node_text, qualified_name};

#[derive(Debug)]
pub struct RustSupport;

impl LanguageSupport for RustSupport {
    fn id(&self) -> &'static str {
        "rust"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn tier(&self) -> ResolutionTier {
        ResolutionTier::Structural
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_rust::LANGUAGE.into()
    }

    fn outline_tree(
        &self,
        tree: &tree_sitter::Tree,
        source: &str,
        path: &Path,
    ) -> Result<SourceOutline> {
        let mut walker = RustWalker {
            source,
            module_dir: module_dir(path),
            context: Vec::new(),
            outline: SourceOutline::empty(path.to_path_buf(), ResolutionTier::Structural),
        };
        walker.walk_children(tree.root_node());
        Ok(walker.outline)
    }
}

const BRANCHES: BranchRules = BranchRules {
    branch_kinds: &[
        "if_expression",
        "for_expression",
        "while_expression",
        "loop_expression",
        "match_arm",
    ],
    logical_kinds: &["binary_expression"],
    logical_operators: &["&&", "||"],
    is_definition,
};

fn is_definition(node: Node<'_>) -> bool {
    matches!(
        node.kind(),
        "function_item"
            | "struct_item"
            | "enum_item"
            | "union_item"
            | "trait_item"
            | "impl_item"
            | "mod_item"
    )
}

/// Directory that `mod foo;` declarations in `path` resolve against.
///
/// `lib.rs`, `main.rs` and `mod.rs` own their directory; any other file
/// `a/b.rs` owns `a/b/`.
pub(super) fn module_dir(path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    if matches!(stem, "lib" | "main" | "mod") {
        ".".to_string()
    } else {
        format!("./{stem}")
    }
}

struct RustWalker<'s> {
    source: &'s str,
    module_dir: String,
    context: Vec<String>,
    outline: SourceOutline,
}

impl RustWalker<'_> {
    fn walk_children(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
    }

    fn visit(&mut self, node: Node<'_>) {
        match node.kind() {
            "function_item" | "function_signature_item" => {
                self.push_named(node, SymbolKind::Function);
            }
            "struct_item" | "enum_item" | "union_item" | "type_item" => {
                self.push_named(node, SymbolKind::Class);
            }
            "trait_item" => {
                if let Some(name) = self.push_named(node, SymbolKind::Class) {
                    self.with_context(name, node);
                }
            }
            "impl_item" => {
                if let Some(type_node) = child_by_field(node, "type") {
                    let type_name = base_type_name(node_text(type_node, self.source));
                    self.with_context(type_name, node);
                }
            }
            "mod_item" => {
                let has_body = child_by_field(node, "body").is_some();
                if let Some(name) = self.push_named(node, SymbolKind::Module) {
                    if has_body {
                        self.with_context(name, node);
                    } else if self.context.is_empty() {
                        let line = node.start_position().row;
                        self.outline
                            .references
                            .push(Reference::path(format!("{}/{name}", self.module_dir), line));
                    }
                }
            }
            "use_declaration" => {
                if let Some(argument) = child_by_field(node, "argument") {
                    let spec = use_path(node_text(argument, self.source));
                    if !spec.is_empty() {
                        self.outline
                            .references
                            .push(Reference::module(spec, node.start_position().row));
                    }
                }
            }
            // Definitions inside function bodies are not tracked.
            "block" => {}
            _ => self.walk_children(node),
        }
    }

    /// Push a definition for a node with a `name` field, returning the name.
    fn push_named(&mut self, node: Node<'_>, kind: SymbolKind) -> Option<String> {
        let name = node_text(child_by_field(node, "name")?, self.source).to_string();
        let qname = qualified_name(&self.context, &name);
        let def: Definition = definition(node, self.source, name.clone(), qname, kind, &BRANCHES);
        self.outline.definitions.push(def);
        Some(name)
    }

    fn with_context(&mut self, name: String, node: Node<'_>) {
        self.context.push(name);
        if let Some(body) = child_by_field(node, "body") {
            self.walk_children(body);
        }
        self.context.pop();
    }
}

/// `Vec<T>` and `&'a Foo` both key their methods under the bare type name.
fn base_type_name(text: &str) -> String {
    let trimmed = text.trim_start_matches('&').trim_start_matches("mut ").trim();
    let end = trimmed.find('<').unwrap_or(trimmed.len());
    trimmed[..end].trim().to_string()
}

/// Module portion of a `use` argument: `crate::a::{B, C}` → `crate::a`.
fn use_path(argument: &str) -> String {
    let mut spec = argument.trim();
    if let Some(idx) = spec.find(" as ") {
        spec = &spec[..idx];
    }
    if let Some(idx) = spec.find("::{") {
        spec = &spec[..idx];
    }
    spec.trim_end_matches("::*").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReferenceStyle;

    fn outline(source: &str, path: &str) -> SourceOutline {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_rust::LANGUAGE.into())
            .unwrap();
        let tree = parser.parse(source, None).unwrap();
        RustSupport
            .outline_tree(&tree, source, Path::new(path))
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
    fn extracts_functions_types_and_methods() {
        let source = r"
pub struct Config { path: String }

impl Config {
    pub fn load(path: &str) -> Self { Config { path: path.into() } }
}

pub enum Mode { Fast, Slow }

fn helper() {}
";
        let outline = outline(source, "src/config.rs");
        assert_eq!(names(&outline), vec!["Config", "Config::load", "Mode", "helper"]);
        assert_eq!(outline.definitions[0].kind, SymbolKind::Class);
        assert_eq!(outline.definitions[1].kind, SymbolKind::Function);
    }

    #[test]
    fn inline_modules_qualify_their_items() {
        let outline = outline("pub mod inner {\n    pub fn foo() {}\n}\n", "src/lib.rs");
        assert_eq!(names(&outline), vec!["inner", "inner::foo"]);
        assert!(outline.references.is_empty());
    }

    #[test]
    fn counts_branches_per_function() {
        let source = r"
fn decide(a: bool, b: bool) -> u8 {
    if a && b {
        1
    } else if a {
        2
    } else {
        match b {
            true => 3,
            false => 4,
        }
    }
}
";
        let outline = outline(source, "src/decide.rs");
        // if, &&, else-if, two match arms
        assert_eq!(outline.definitions[0].complexity, 5);
    }

    #[test]
    fn impl_methods_are_not_counted_on_the_type() {
        let source = r"
struct S;
impl S {
    fn f(&self, x: bool) { if x {} }
}
";
        let outline = outline(source, "src/s.rs");
        assert_eq!(outline.definitions[0].complexity, 0);
        assert_eq!(outline.definitions[1].complexity, 1);
        assert_eq!(outline.total_complexity(), 1);
    }

    #[test]
    fn collects_use_and_mod_references() {
        let source = "mod parser;\nuse crate::config::{Config, Mode};\nuse std::fmt;\n";
        let outline = outline(source, "src/lib.rs");
        assert_eq!(
            outline.references,
            vec![
                Reference::path("./parser", 0),
                Reference::module("crate::config", 1),
                Reference::module("std::fmt", 2),
            ]
        );
        assert!(
            outline.references[1..]
                .iter()
                .all(|r| r.style == ReferenceStyle::Module)
        );
    }

    #[test]
    fn nested_mod_declarations_resolve_under_the_file() {
        let outline = outline("mod lexer;\n", "src/parser.rs");
        assert_eq!(outline.references, vec![Reference::path("./parser/lexer", 0)]);
    }

    #[test]
    fn body_hash_tracks_body_changes() {
        let before = outline("fn f() { let x = 1; }\n", "a.rs");
        let after = outline("fn f() { let x = 2; }\n", "a.rs");
        assert_ne!(
            before.definitions[0].body_hash,
            after.definitions[0].body_hash
        );
    }
}
