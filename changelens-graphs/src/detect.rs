// Language detection: extension table first, then file names, then shebangs.

use std::path::Path;

/// Identifier used when nothing recognizes the file.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

const EXTENSIONS: &[(&str, &str)] = &[
    ("rs", "rust"),
    ("py", "python"),
    ("pyi", "python"),
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("mjs", "javascript"),
    ("cjs", "javascript"),
    ("ts", "typescript"),
    ("mts", "typescript"),
    ("cts", "typescript"),
    ("tsx", "tsx"),
    ("go", "go"),
    ("java", "java"),
    ("rb", "ruby"),
    ("c", "c"),
    ("h", "c"),
    ("cc", "cpp"),
    ("cpp", "cpp"),
    ("hpp", "cpp"),
    ("sh", "shell"),
    ("bash", "shell"),
    ("md", "markdown"),
    ("markdown", "markdown"),
    ("rst", "rst"),
    ("toml", "toml"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("json", "json"),
];

/// Well-known file names without a telling extension.
const FILE_NAMES: &[(&str, &str)] = &[
    ("Makefile", "make"),
    ("Dockerfile", "docker"),
    ("Rakefile", "ruby"),
    ("Gemfile", "ruby"),
];

/// Detect the language of a file from its path, falling back to a shebang
/// line in `content`.
pub fn detect_language(path: &Path, content: Option<&str>) -> &'static str {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        let ext = ext.to_ascii_lowercase();
        if let Some((_, lang)) = EXTENSIONS.iter().find(|(e, _)| *e == ext) {
            return lang;
        }
    }

    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        if let Some((_, lang)) = FILE_NAMES.iter().find(|(n, _)| *n == name) {
            return lang;
        }
    }

    content.and_then(shebang_language).unwrap_or(UNKNOWN_LANGUAGE)
}

fn shebang_language(content: &str) -> Option<&'static str> {
    let first = content.lines().next()?;
    let interpreter = first.strip_prefix("#!")?;
    // `#!/usr/bin/env python3` and `#!/usr/bin/python3` both end in the interpreter name.
    let program = interpreter
        .split_whitespace()
        .filter(|part| !part.starts_with('-'))
        .last()?
        .rsplit('/')
        .next()?;

    if program.starts_with("python") {
        Some("python")
    } else if program == "node" || program == "deno" {
        Some("javascript")
    } else if matches!(program, "sh" | "bash" | "zsh" | "dash") {
        Some("shell")
    } else if program == "ruby" {
        Some("ruby")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_by_extension() {
        assert_eq!(detect_language(Path::new("src/main.rs"), None), "rust");
        assert_eq!(detect_language(Path::new("app/View.TSX"), None), "tsx");
        assert_eq!(detect_language(Path::new("README.md"), None), "markdown");
        assert_eq!(detect_language(Path::new("docs/index.rst"), None), "rst");
    }

    #[test]
    fn detects_by_file_name() {
        assert_eq!(detect_language(Path::new("docker/Dockerfile"), None), "docker");
    }

    #[test]
    fn falls_back_to_shebang() {
        let script = "#!/usr/bin/env python3\nprint('hi')\n";
        assert_eq!(detect_language(Path::new("bin/tool"), Some(script)), "python");

        let shell = "#!/bin/bash\necho hi\n";
        assert_eq!(detect_language(Path::new("run"), Some(shell)), "shell");
    }

    #[test]
    fn unknown_without_signals() {
        assert_eq!(
            detect_language(Path::new("LICENSE"), Some("MIT License")),
            UNKNOWN_LANGUAGE
        );
    }
}
