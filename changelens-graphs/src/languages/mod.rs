pub mod go;
pub mod heuristic;
mod helpers;
pub mod java;
pub mod javascript;
pub mod python;
pub mod rust;
pub mod typescript;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::parse::{Deadline, parse_with_budget};
use crate::{ResolutionTier, Result, SourceOutline};

/// Trait implemented by each language with a tree-sitter grammar.
pub trait LanguageSupport: Send + Sync + std::fmt::Debug {
    /// Language identifier (e.g., "rust", "python").
    fn id(&self) -> &'static str;

    /// File extensions this language handles.
    fn extensions(&self) -> &'static [&'static str];

    /// Resolution tier this implementation provides.
    fn tier(&self) -> ResolutionTier {
        ResolutionTier::Structural
    }

    /// Tree-sitter language for parsing.
    fn tree_sitter_language(&self) -> tree_sitter::Language;

    /// Collect definitions and references from a parsed tree.
    fn outline_tree(
        &self,
        tree: &tree_sitter::Tree,
        source: &str,
        path: &Path,
    ) -> Result<SourceOutline>;
}

/// Registry of all structural languages.
#[derive(Debug)]
pub struct LanguageRegistry {
    languages: HashMap<String, Arc<dyn LanguageSupport>>,
    extension_map: HashMap<String, String>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        let mut reg = Self {
            languages: HashMap::new(),
            extension_map: HashMap::new(),
        };
        reg.register(Arc::new(rust::RustSupport));
        reg.register(Arc::new(python::PythonSupport));
        reg.register(Arc::new(typescript::TypeScriptSupport));
        reg.register(Arc::new(typescript::TsxSupport));
        reg.register(Arc::new(javascript::JavaScriptSupport));
        reg.register(Arc::new(go::GoSupport));
        reg.register(Arc::new(java::JavaSupport));
        reg
    }

    fn register(&mut self, lang: Arc<dyn LanguageSupport>) {
        for ext in lang.extensions() {
            self.extension_map
                .insert((*ext).to_string(), lang.id().to_string());
        }
        self.languages.insert(lang.id().to_string(), lang);
    }

    /// Look up the language support for a file by its extension.
    pub fn for_file(&self, path: &Path) -> Option<Arc<dyn LanguageSupport>> {
        let ext = path.extension()?.to_str()?;
        let lang_id = self.extension_map.get(&ext.to_ascii_lowercase())?;
        self.languages.get(lang_id).cloned()
    }

    /// Get a language by its identifier.
    pub fn get(&self, id: &str) -> Option<Arc<dyn LanguageSupport>> {
        self.languages.get(id).cloned()
    }

    /// Whether `id` has a tree-sitter grammar.
    pub fn is_structural(&self, id: &str) -> bool {
        self.languages.contains_key(id)
    }

    /// List all registered language IDs, sorted.
    pub fn language_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.languages.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Outline one version of a file within `deadline`.
    ///
    /// Structural languages are parsed with tree-sitter; parse failures and
    /// timeouts are returned as errors. Every other language goes through the
    /// signature-line heuristics, which only fail on timeout. References are
    /// collected only when `with_references` is set.
    pub fn outline(
        &self,
        language: &str,
        source: &str,
        path: &Path,
        with_references: bool,
        deadline: &Deadline,
    ) -> Result<SourceOutline> {
        let Some(support) = self.get(language) else {
            debug!(language, path = %path.display(), bytes = source.len(), "Heuristic outline");
            return heuristic::outline(source, path, language, with_references, deadline);
        };

        debug!(language, path = %path.display(), bytes = source.len(), "Structural outline");
        let tree = parse_with_budget(&support.tree_sitter_language(), source, path, deadline)?;
        let mut outline = support.outline_tree(&tree, source, path)?;
        deadline.check(path)?;
        if !with_references {
            outline.references.clear();
        }
        Ok(outline)
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}
