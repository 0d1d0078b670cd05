// Integration test utilities and change-set fixtures for changelens.

use changelens_core::{AnalyzeOptions, CommitNarrative, FileChange, LensConfig, LensPipeline};

/// A Python module whose only new capability signatures are `ast.parse` and
/// `ast.walk`.
pub const INSPECT_PY: &str = "import ast\n\n\ndef outline(source):\n    tree = ast.parse(source)\n    return [node for node in ast.walk(tree)]\n";

/// One added file carrying the deep-analysis signatures.
pub fn deep_analysis_addition() -> Vec<FileChange> {
    vec![FileChange::added("src/inspect.py", INSPECT_PY)]
}

/// Two modules importing each other.
pub fn mutual_references() -> Vec<FileChange> {
    vec![
        FileChange::added(
            "a.py",
            "from b import helper\n\n\ndef run():\n    return helper()\n",
        ),
        FileChange::added("b.py", "import a\n\n\ndef helper():\n    return 1\n"),
    ]
}

/// A file the Python grammar rejects next to two well-formed ones.
pub fn one_malformed_two_healthy() -> Vec<FileChange> {
    vec![
        FileChange::added("src/broken.py", "def broken(:\n    pass\n"),
        FileChange::modified(
            "src/calc.py",
            "def add(a, b):\n    return a + b\n",
            "def add(a, b):\n    if a is None:\n        return b\n    return a + b\n",
        ),
        FileChange::added(
            "src/shapes.rs",
            "pub struct Square(f64);\n\nimpl Square {\n    pub fn area(&self) -> f64 {\n        self.0 * self.0\n    }\n}\n",
        ),
    ]
}

/// Changes confined to the test area.
pub fn tests_only() -> Vec<FileChange> {
    vec![
        FileChange::added(
            "tests/test_calc.py",
            "from calc import add\n\n\ndef test_add():\n    assert add(1, 2) == 3\n",
        ),
        FileChange::modified(
            "tests/test_io.py",
            "def test_read():\n    pass\n",
            "def test_read():\n    assert True\n",
        ),
    ]
}

/// A broader change set touching several areas and languages.
pub fn mixed_change_set() -> Vec<FileChange> {
    let mut changes = deep_analysis_addition();
    changes.extend(mutual_references());
    changes.extend(one_malformed_two_healthy());
    changes.push(FileChange::modified(
        "README.md",
        "# Tool\n",
        "# Tool\n\nRun `tool inspect` on a source file.\n",
    ));
    changes.push(FileChange::deleted(
        "cmd/legacy.go",
        "package main\n\nfunc main() {}\n",
    ));
    changes
}

/// A pipeline compiled from the default configuration.
pub fn default_pipeline() -> LensPipeline {
    LensPipeline::new(LensConfig::default()).expect("default config compiles")
}

/// Analyze `changes` with defaults and no diff text.
pub fn narrate(changes: &[FileChange]) -> CommitNarrative {
    default_pipeline()
        .analyze(changes, "", &AnalyzeOptions::default())
        .expect("analysis succeeds")
}
