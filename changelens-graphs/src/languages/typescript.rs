use std::path::Path;

use crate::{Result, SourceOutline};

use super::LanguageSupport;
use super::javascript::outline_ecma;

#[derive(Debug)]
pub struct TypeScriptSupport;

impl LanguageSupport for TypeScriptSupport {
    fn id(&self) -> &'static str {
        "typescript"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["ts", "mts", "cts"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
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

/// TSX needs its own grammar: `<T>expr` casts and JSX elements conflict.
#[derive(Debug)]
pub struct TsxSupport;

impl LanguageSupport for TsxSupport {
    fn id(&self) -> &'static str {
        "tsx"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["tsx"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_typescript::LANGUAGE_TSX.into()
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
