// Signature-line heuristics for languages without a tree-sitter grammar.
//
// Declarations are found line by line; a declaration's body runs up to the
// next declaration line, so nested definitions never double count.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::parse::Deadline;
use crate::{Definition, Reference, ResolutionTier, Result, SourceOutline, SymbolKind, TextRange};

use super::helpers::{dotted_name, hash_string};
use super::rust::module_dir;

static DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:async\s+)?def\s+(?:self\.)?([A-Za-z_]\w*[?!=]?)").unwrap()
});
static CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:export\s+)?(?:default\s+)?(?:(?:public|private|protected|abstract|final|static|sealed|data)\s+)*class\s+([A-Za-z_]\w*)",
    )
    .unwrap()
});
static FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\b\s*\*?\s*([A-Za-z_$][\w$-]*)")
        .unwrap()
});
static FN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+([A-Za-z_]\w*)"#,
    )
    .unwrap()
});
static FUNC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*func\s+(?:\([^)]*\)\s*)?([A-Za-z_]\w*)").unwrap());
static SUB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*sub\s+([A-Za-z_][\w:]*)").unwrap());
static MODULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*module\s+([A-Za-z_][\w:.]*)").unwrap());
static SHELL_FN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Za-z_][\w.-]*)\s*\(\)\s*\{?\s*$").unwrap());
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+?)\s*#*\s*$").unwrap());

static BRANCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:if|elif|for|while|case|catch|except)\b|&&|\|\|").unwrap()
});

static C_INCLUDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*#\s*include\s*"([^"]+)""#).unwrap());
static RUBY_REQUIRE_RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*require_relative\s*\(?\s*['"]([^'"]+)['"]"#).unwrap()
});
static RUBY_REQUIRE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*require\s*\(?\s*['"]([^'"]+)['"]"#).unwrap());
static SHELL_SOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:source|\.)[ \t]+(.+?)[ \t]*(?:[;&|#].*)?$").unwrap()
});
static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]\(\s*<?([^)\s>]+)>?").unwrap());
static RST_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*\.\.\s+(?:include|literalinclude|image|figure)::\s*(\S+)").unwrap()
});
static RST_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`[^`<]*<([^>`]+)>`_").unwrap());
static PY_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*import\s+([\w.]+(?:\s*,\s*[\w.]+)*)").unwrap());
static PY_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*from[ \t]+(\.*)([\w.]*)[ \t]+import[ \t]+\(?([\w \t,]+)").unwrap()
});
static ES_FROM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bfrom\s*['"]([^'"\n]+)['"]"#).unwrap());
static ES_SIDE_EFFECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*import\s*['"]([^'"\n]+)['"]"#).unwrap());
static ES_LOADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:require|import)\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#).unwrap()
});
static RUST_USE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+((?:\w+::)*\w+)").unwrap()
});
static RUST_MOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?:pub(?:\([^)]*\))?\s+)?mod\s+(\w+)\s*;").unwrap()
});
static GO_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*import\s+(?:[\w.]+\s+)?"([^"]+)""#).unwrap());
static GO_IMPORT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?ms)^\s*import\s*\((.*?)\)").unwrap());
static GO_QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"]+)""#).unwrap());
static JAVA_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*import\s+(?:static\s+)?([\w.]+?)(?:\.\*)?\s*;").unwrap()
});

/// Lines between deadline checks.
const CHECK_EVERY: usize = 512;

/// Outline `source` with signature-line patterns. Only fails when
/// `deadline` runs out; references are skipped unless `with_references`.
pub fn outline(
    source: &str,
    path: &Path,
    language: &str,
    with_references: bool,
    deadline: &Deadline,
) -> Result<SourceOutline> {
    let mut outline = SourceOutline::empty(path.to_path_buf(), ResolutionTier::Heuristic);
    outline.definitions = definitions(source, path, language, deadline)?;
    if with_references {
        outline.references = references(source, path, language, deadline)?;
    }
    Ok(outline)
}

/// Start offset of every line, for offset to line lookups.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts }
    }

    /// Zero-based line holding byte `offset`.
    fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|start| *start <= offset).saturating_sub(1)
    }
}

struct Declaration {
    line: usize,
    depth: usize,
    name: String,
    kind: SymbolKind,
}

fn declaration(line: &str, language: &str) -> Option<(usize, String, SymbolKind)> {
    if language == "markdown" {
        let caps = HEADING.captures(line)?;
        return Some((caps[1].len() - 1, caps[2].to_string(), SymbolKind::Module));
    }

    let depth = line.len() - line.trim_start().len();
    let patterns: [(&Regex, SymbolKind); 8] = [
        (&*DEF, SymbolKind::Function),
        (&*CLASS, SymbolKind::Class),
        (&*FUNCTION, SymbolKind::Function),
        (&*FN, SymbolKind::Function),
        (&*FUNC, SymbolKind::Function),
        (&*SUB, SymbolKind::Function),
        (&*MODULE, SymbolKind::Module),
        (&*SHELL_FN, SymbolKind::Function),
    ];
    patterns.iter().find_map(|(regex, kind)| {
        regex
            .captures(line)
            .map(|caps| (depth, caps[1].to_string(), *kind))
    })
}

fn definitions(
    source: &str,
    path: &Path,
    language: &str,
    deadline: &Deadline,
) -> Result<Vec<Definition>> {
    let lines: Vec<&str> = source.split_inclusive('\n').collect();
    let mut offsets = Vec::with_capacity(lines.len() + 1);
    let mut offset = 0;
    for line in &lines {
        offsets.push(offset);
        offset += line.len();
    }
    offsets.push(offset);

    let decls = if language == "rst" {
        rst_headings(&lines, path, deadline)?
    } else {
        line_declarations(&lines, path, language, deadline)?
    };

    let mut scope: Vec<(usize, String)> = Vec::new();
    let mut defs = Vec::with_capacity(decls.len());

    for (i, decl) in decls.iter().enumerate() {
        if i % CHECK_EVERY == 0 {
            deadline.check(path)?;
        }
        while scope.last().is_some_and(|(depth, _)| *depth >= decl.depth) {
            scope.pop();
        }
        let context: Vec<String> = scope.iter().map(|(_, name)| name.clone()).collect();
        let qualified_name = dotted_name(&context, &decl.name);

        let end_line = decls.get(i + 1).map_or(lines.len(), |next| next.line);
        let body = &source[offsets[decl.line]..offsets[end_line]];
        let complexity = if matches!(language, "markdown" | "rst") {
            0
        } else {
            count_branches(body)
        };

        let last_line = end_line.saturating_sub(1).max(decl.line);
        defs.push(Definition {
            name: decl.name.clone(),
            qualified_name,
            kind: decl.kind,
            span: TextRange {
                start_byte: offsets[decl.line],
                end_byte: offsets[end_line],
                start_row: decl.line,
                start_col: 0,
                end_row: last_line,
                end_col: lines.get(last_line).map_or(0, |l| l.trim_end().len()),
            },
            complexity,
            body_hash: hash_string(body.trim_end()),
        });

        if decl.kind != SymbolKind::Function {
            scope.push((decl.depth, decl.name.clone()));
        }
    }

    Ok(defs)
}

fn line_declarations(
    lines: &[&str],
    path: &Path,
    language: &str,
    deadline: &Deadline,
) -> Result<Vec<Declaration>> {
    let mut decls = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if idx % CHECK_EVERY == 0 {
            deadline.check(path)?;
        }
        if let Some((depth, name, kind)) = declaration(line.trim_end_matches(['\n', '\r']), language)
        {
            decls.push(Declaration {
                line: idx,
                depth,
                name,
                kind,
            });
        }
    }
    Ok(decls)
}

/// Title lines underlined by an adornment at least as long as the title.
/// Levels follow the order in which adornment characters first appear.
fn rst_headings(lines: &[&str], path: &Path, deadline: &Deadline) -> Result<Vec<Declaration>> {
    let mut levels: Vec<char> = Vec::new();
    let mut decls = Vec::new();
    for (idx, pair) in lines.windows(2).enumerate() {
        if idx % CHECK_EVERY == 0 {
            deadline.check(path)?;
        }
        let title = pair[0].trim_end();
        let underline = pair[1].trim_end();
        let Some(mark) = adornment(underline) else {
            continue;
        };
        if title.trim().is_empty()
            || adornment(title).is_some()
            || title.starts_with(char::is_whitespace)
            || underline.chars().count() < title.chars().count()
        {
            continue;
        }
        let depth = match levels.iter().position(|c| *c == mark) {
            Some(level) => level,
            None => {
                levels.push(mark);
                levels.len() - 1
            }
        };
        decls.push(Declaration {
            line: idx,
            depth,
            name: title.to_string(),
            kind: SymbolKind::Module,
        });
    }
    Ok(decls)
}

/// The punctuation character repeated across a section adornment line.
fn adornment(line: &str) -> Option<char> {
    let mark = line.chars().next()?;
    let punctuation = "=-~^\"'`#*+:.";
    (punctuation.contains(mark) && line.chars().count() >= 3 && line.chars().all(|c| c == mark))
        .then_some(mark)
}

/// Count branch keywords and short-circuit operators, ignoring comment lines.
fn count_branches(body: &str) -> u32 {
    let count = body
        .lines()
        .filter(|line| !is_comment(line))
        .map(|line| BRANCH.find_iter(line).count())
        .sum::<usize>();
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn is_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    ["#", "//", "/*", "*", "--", ";"]
        .iter()
        .any(|prefix| trimmed.starts_with(prefix))
        && !trimmed.starts_with("#if")
}

/// Reference statements found with line patterns for `language`.
///
/// Also serves structural languages whose source failed to parse.
pub fn references(
    source: &str,
    path: &Path,
    language: &str,
    deadline: &Deadline,
) -> Result<Vec<Reference>> {
    let mut scanner = Scanner {
        source,
        path,
        lines: LineIndex::new(source),
        deadline,
        out: Vec::new(),
    };
    match language {
        "c" | "cpp" => scanner.scan(&C_INCLUDE, |s, line| {
            Some(Reference::path(s, line))
        })?,
        "ruby" => {
            scanner.scan(&RUBY_REQUIRE_RELATIVE, |s, line| {
                Some(Reference::path(relative(s), line))
            })?;
            scanner.scan(&RUBY_REQUIRE, |s, line| {
                Some(Reference::module(s, line))
            })?;
        }
        "shell" => scanner.scan(&SHELL_SOURCE, |s, line| {
            shell_target(s).map(|target| Reference::path(target, line))
        })?,
        "markdown" => scanner.scan(&MARKDOWN_LINK, |s, line| {
            link_target(s).map(|target| Reference::path(target, line))
        })?,
        "rst" => {
            scanner.scan(&RST_DIRECTIVE, |s, line| {
                link_target(s).map(|target| Reference::path(target, line))
            })?;
            scanner.scan(&RST_LINK, |s, line| {
                link_target(s).map(|target| Reference::path(target, line))
            })?;
        }
        "python" => python_references(&mut scanner)?,
        "javascript" | "typescript" | "tsx" => {
            for regex in [&*ES_FROM, &*ES_SIDE_EFFECT, &*ES_LOADER] {
                scanner.scan(regex, |s, line| Some(es_reference(s, line)))?;
            }
        }
        "rust" => {
            scanner.scan(&RUST_USE, |s, line| {
                Some(Reference::module(s, line))
            })?;
            let dir = module_dir(path);
            scanner.scan(&RUST_MOD, |s, line| {
                Some(Reference::path(format!("{dir}/{s}"), line))
            })?;
        }
        "go" => {
            scanner.scan(&GO_IMPORT, |s, line| {
                Some(Reference::module(s, line))
            })?;
            for block in GO_IMPORT_BLOCK.captures_iter(source) {
                scanner.deadline.check(path)?;
                let Some(body) = block.get(1) else { continue };
                for quoted in GO_QUOTED.captures_iter(body.as_str()) {
                    if let Some(spec) = quoted.get(1) {
                        let line = scanner.lines.line_of(body.start() + spec.start());
                        scanner.out.push(Reference::module(spec.as_str(), line));
                    }
                }
            }
        }
        "java" => scanner.scan(&JAVA_IMPORT, |s, line| {
            Some(Reference::module(s, line))
        })?,
        _ => {}
    }
    let mut out = scanner.out;
    out.sort_by_key(|r| r.line);
    Ok(out)
}

struct Scanner<'s> {
    source: &'s str,
    path: &'s Path,
    lines: LineIndex,
    deadline: &'s Deadline,
    out: Vec<Reference>,
}

impl Scanner<'_> {
    fn scan(&mut self, regex: &Regex, make: impl Fn(&str, usize) -> Option<Reference>) -> Result<()> {
        for (n, caps) in regex.captures_iter(self.source).enumerate() {
            if n % CHECK_EVERY == 0 {
                self.deadline.check(self.path)?;
            }
            let Some(spec) = caps.get(1) else { continue };
            if let Some(reference) = make(spec.as_str().trim(), self.lines.line_of(spec.start())) {
                self.out.push(reference);
            }
        }
        Ok(())
    }
}

fn relative(spec: &str) -> String {
    if spec.starts_with('.') {
        spec.to_string()
    } else {
        format!("./{spec}")
    }
}

/// `"$(dirname "$0")/lib/util.sh"` → `./lib/util.sh`; variables are dropped.
fn shell_target(spec: &str) -> Option<String> {
    let unquoted: String = spec.chars().filter(|c| !matches!(c, '"' | '\'')).collect();
    let segments: Vec<&str> = unquoted
        .split('/')
        .skip_while(|seg| seg.contains('$') || seg.contains('(') || seg.contains(')'))
        .collect();
    if segments.is_empty() || segments.iter().any(|seg| seg.contains('$')) {
        return None;
    }
    Some(relative(&segments.join("/")))
}

fn link_target(spec: &str) -> Option<String> {
    let lowered = spec.to_ascii_lowercase();
    if spec.starts_with('#')
        || lowered.contains("://")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("data:")
    {
        return None;
    }
    let target = spec.split(['#', '?']).next().unwrap_or_default();
    (!target.is_empty()).then(|| target.to_string())
}

fn python_references(scanner: &mut Scanner<'_>) -> Result<()> {
    let (source, path, deadline) = (scanner.source, scanner.path, scanner.deadline);
    let lines = &scanner.lines;
    let out = &mut scanner.out;

    for (seen, caps) in PY_IMPORT.captures_iter(source).enumerate() {
        if seen % CHECK_EVERY == 0 {
            deadline.check(path)?;
        }
        let Some(list) = caps.get(1) else { continue };
        let line = lines.line_of(list.start());
        for module in list.as_str().split(',') {
            out.push(Reference::module(module.trim(), line));
        }
    }

    for (seen, caps) in PY_FROM.captures_iter(source).enumerate() {
        if seen % CHECK_EVERY == 0 {
            deadline.check(path)?;
        }
        let (Some(dots), Some(module), Some(names)) = (caps.get(1), caps.get(2), caps.get(3))
        else {
            continue;
        };
        let line = lines.line_of(dots.start());
        let names: Vec<&str> = names
            .as_str()
            .split(',')
            .filter_map(|n| n.split_whitespace().next())
            .collect();
        let module = module.as_str();

        if dots.as_str().is_empty() {
            for name in &names {
                out.push(Reference::module(format!("{module}.{name}"), line));
            }
            continue;
        }

        let base = match dots.as_str().len() {
            1 => "./".to_string(),
            n => "../".repeat(n - 1),
        };
        if module.is_empty() {
            for name in &names {
                out.push(Reference::path(format!("{base}{name}"), line));
            }
        } else {
            out.push(Reference::path(
                format!("{base}{}", module.replace('.', "/")),
                line,
            ));
        }
    }
    Ok(())
}

fn es_reference(spec: &str, line: usize) -> Reference {
    if spec.starts_with('.') || spec.starts_with('/') {
        Reference::path(spec, line)
    } else {
        Reference::module(spec, line)
    }
}
