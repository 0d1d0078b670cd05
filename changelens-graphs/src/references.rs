// Reference resolution among the files of one change set.
//
// Projects a file-level reference graph: edges from referencing files to
// referenced files, with the specifiers that produced each edge.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Reference, ReferenceStyle};

/// A directed edge: file A references file B.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEdge {
    pub source_file: String,
    pub target_file: String,
    pub specifiers: Vec<String>,
}

/// Projected reference graph at the file level, sorted by (source, target).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceGraph {
    pub edges: Vec<ReferenceEdge>,
}

/// File stems that stand for their directory.
const INDEX_STEMS: &[&str] = &["mod", "__init__", "index"];

#[derive(Debug)]
struct IndexedFile {
    path: String,
    /// Path without extension.
    stem_key: Vec<String>,
    /// Directory key for index files and Go packages.
    dir_key: Option<Vec<String>>,
}

/// Lookup structure over the changed files' paths.
#[derive(Debug)]
pub struct ReferenceIndex {
    files: Vec<IndexedFile>,
}

impl ReferenceIndex {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut files: Vec<IndexedFile> = paths
            .into_iter()
            .map(|p| index_file(&normalize_separators(p.as_ref())))
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files.dedup_by(|a, b| a.path == b.path);
        Self { files }
    }

    /// Resolve `reference` made from `importer` to another indexed file.
    pub fn resolve(&self, importer: &str, reference: &Reference) -> Option<&str> {
        let importer = normalize_separators(importer);
        let resolved = match reference.style {
            ReferenceStyle::Path => self.resolve_path(&importer, &reference.specifier),
            ReferenceStyle::Module => self.resolve_module(&importer, &reference.specifier),
        }?;
        (resolved != importer).then_some(resolved)
    }

    fn resolve_path(&self, importer: &str, specifier: &str) -> Option<&str> {
        let importer_dir = parent_segments(importer);
        let spec = normalize_separators(specifier);

        let mut bases = Vec::new();
        if let Some(rooted) = spec.strip_prefix('/') {
            bases.push(join(&[], rooted));
        } else if spec.starts_with("./") || spec.starts_with("../") || spec == "." || spec == ".."
        {
            bases.push(join(&importer_dir, &spec));
        } else {
            bases.push(join(&importer_dir, &spec));
            bases.push(join(&[], &spec));
        }

        bases.into_iter().flatten().find_map(|base| {
            let joined = base.join("/");
            self.files
                .iter()
                .find(|f| f.path == joined)
                .or_else(|| self.files.iter().find(|f| f.stem_key == base))
                .or_else(|| {
                    self.files
                        .iter()
                        .find(|f| f.dir_key.as_ref().is_some_and(|key| *key == base))
                })
                .map(|f| f.path.as_str())
        })
    }

    fn resolve_module(&self, importer: &str, specifier: &str) -> Option<&str> {
        let segments = module_segments(specifier);
        let importer_dir = parent_segments(importer);

        // Longest module prefix first: `a.b.c` may name module `a.b`'s item `c`.
        for len in (1..=segments.len()).rev() {
            let prefix = &segments[..len];
            let mut candidates: Vec<&IndexedFile> = self
                .files
                .iter()
                .filter(|f| f.keys().any(|key| matches_module(key, prefix)))
                .collect();
            if candidates.is_empty() {
                continue;
            }
            candidates.sort_by(|a, b| {
                let shared_a = shared_prefix(&parent_segments(&a.path), &importer_dir);
                let shared_b = shared_prefix(&parent_segments(&b.path), &importer_dir);
                shared_b.cmp(&shared_a).then_with(|| a.path.cmp(&b.path))
            });
            return candidates.first().map(|f| f.path.as_str());
        }
        None
    }
}

impl IndexedFile {
    fn keys(&self) -> impl Iterator<Item = &[String]> {
        std::iter::once(self.stem_key.as_slice()).chain(self.dir_key.as_deref())
    }
}

/// Project a file-level reference graph.
///
/// Groups resolved references by (`source_file`, `target_file`) and collects
/// the specifiers. Unresolved and same-file references produce no edge.
pub fn project_reference_graph<'a, I>(index: &ReferenceIndex, files: I) -> ReferenceGraph
where
    I: IntoIterator<Item = (&'a str, &'a [Reference])>,
{
    let mut grouped: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();

    for (importer, references) in files {
        for reference in references {
            let Some(target) = index.resolve(importer, reference) else {
                continue;
            };
            let key = (normalize_separators(importer), target.to_string());
            let specifiers = grouped.entry(key).or_default();
            if !specifiers.contains(&reference.specifier) {
                specifiers.push(reference.specifier.clone());
            }
        }
    }

    let edges = grouped
        .into_iter()
        .map(|((source_file, target_file), specifiers)| ReferenceEdge {
            source_file,
            target_file,
            specifiers,
        })
        .collect();

    ReferenceGraph { edges }
}

fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

fn index_file(path: &str) -> IndexedFile {
    let mut segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .map(str::to_string)
        .collect();
    let file_name = segments.pop().unwrap_or_default();
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), ext.to_string()),
        _ => (file_name.clone(), String::new()),
    };

    let dir_key = (INDEX_STEMS.contains(&stem.as_str()) || ext == "go")
        .then(|| segments.clone())
        .filter(|dir| !dir.is_empty());

    let mut stem_key = segments;
    stem_key.push(stem);

    IndexedFile {
        path: path.to_string(),
        stem_key,
        dir_key,
    }
}

fn parent_segments(path: &str) -> Vec<String> {
    let mut segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .map(str::to_string)
        .collect();
    segments.pop();
    segments
}

/// Join `relative` onto `base`, resolving `.` and `..`. `None` when the path
/// climbs above the root.
fn join(base: &[String], relative: &str) -> Option<Vec<String>> {
    let mut out = base.to_vec();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop()?;
            }
            other => out.push(other.to_string()),
        }
    }
    (!out.is_empty()).then_some(out)
}

/// Split a module specifier into path segments.
///
/// `crate::a::b` → `[a, b]`, `pkg.mod` → `[pkg, mod]`, `github.com/o/r` →
/// `[github.com, o, r]`.
fn module_segments(specifier: &str) -> Vec<String> {
    let segments: Vec<&str> = if specifier.contains("::") {
        let mut parts: Vec<&str> = specifier.split("::").collect();
        while parts
            .first()
            .is_some_and(|p| matches!(*p, "crate" | "self" | "super"))
        {
            parts.remove(0);
        }
        parts
    } else if specifier.contains('/') {
        specifier.split('/').collect()
    } else {
        specifier.split('.').collect()
    };
    segments
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Either side may be the longer path: `app.models` names `src/app/models.py`,
/// while Go's `example.com/app/store` names the package directory `store`.
fn matches_module(key: &[String], prefix: &[String]) -> bool {
    !key.is_empty() && (key.ends_with(prefix) || prefix.ends_with(key))
}

fn shared_prefix(a: &[String], b: &[String]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn index(paths: &[&str]) -> ReferenceIndex {
        ReferenceIndex::new(paths.iter().copied())
    }

    #[test]
    fn resolves_relative_paths_with_and_without_extension() {
        let idx = index(&["src/app.js", "src/util.js", "lib/b.ts", "src/views/index.js"]);
        assert_eq!(
            idx.resolve("src/app.js", &Reference::path("./util", 0)),
            Some("src/util.js")
        );
        assert_eq!(
            idx.resolve("src/app.js", &Reference::path("../lib/b", 0)),
            Some("lib/b.ts")
        );
        assert_eq!(
            idx.resolve("src/app.js", &Reference::path("./views", 0)),
            Some("src/views/index.js")
        );
        assert_eq!(idx.resolve("src/app.js", &Reference::path("../../x", 0)), None);
    }

    #[test]
    fn bare_paths_fall_back_to_root() {
        let idx = index(&["README.md", "docs/guide.md"]);
        assert_eq!(
            idx.resolve("README.md", &Reference::path("docs/guide.md", 0)),
            Some("docs/guide.md")
        );
    }

    #[test]
    fn resolves_python_and_rust_modules() {
        let idx = index(&[
            "src/app/models/user.py",
            "src/app/__init__.py",
            "src/main.rs",
            "src/config.rs",
        ]);
        assert_eq!(
            idx.resolve("src/app/views.py", &Reference::module("app.models.user.User", 0)),
            Some("src/app/models/user.py")
        );
        assert_eq!(
            idx.resolve("src/app/views.py", &Reference::module("app", 0)),
            Some("src/app/__init__.py")
        );
        assert_eq!(
            idx.resolve("src/main.rs", &Reference::module("crate::config", 0)),
            Some("src/config.rs")
        );
        assert_eq!(idx.resolve("src/main.rs", &Reference::module("std::fmt", 0)), None);
    }

    #[test]
    fn resolves_go_packages_by_directory() {
        let idx = index(&["cmd/main.go", "pkg/store/store.go", "pkg/store/cache.go"]);
        assert_eq!(
            idx.resolve("cmd/main.go", &Reference::module("example.com/app/pkg/store", 0)),
            Some("pkg/store/cache.go")
        );
    }

    #[test]
    fn ambiguity_prefers_nearest_directory() {
        let idx = index(&["a/util.py", "b/util.py", "b/main.py"]);
        assert_eq!(
            idx.resolve("b/main.py", &Reference::module("util", 0)),
            Some("b/util.py")
        );
        assert_eq!(
            idx.resolve("c/main.py", &Reference::module("util", 0)),
            Some("a/util.py")
        );
    }

    #[test]
    fn self_references_are_dropped() {
        let idx = index(&["src/a.py"]);
        assert_eq!(idx.resolve("src/a.py", &Reference::path("./a", 0)), None);
    }

    #[test]
    fn groups_edges_and_deduplicates_specifiers() {
        let idx = index(&["main.py", "lib.py", "other.py"]);
        let main_refs = vec![
            Reference::module("lib", 0),
            Reference::module("lib.helper", 1),
            Reference::module("lib", 2),
            Reference::module("os", 3),
        ];
        let lib_refs = vec![Reference::module("main", 0)];
        let graph = project_reference_graph(
            &idx,
            [
                ("main.py", main_refs.as_slice()),
                ("lib.py", lib_refs.as_slice()),
            ],
        );
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.edges[0].source_file, "lib.py");
        assert_eq!(graph.edges[1].source_file, "main.py");
        assert_eq!(graph.edges[1].target_file, "lib.py");
        assert_eq!(graph.edges[1].specifiers, vec!["lib", "lib.helper"]);
    }
}
