use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use changelens_core::extract::diffstat::synthesize_unified_diff;
use changelens_core::{AnalyzeOptions, FileChange, LensConfig, LensPipeline};
use clap::{Args, ValueEnum};
use tracing::{debug, info};

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// JSON manifest: an array of {path, old?, new?} file changes
    #[arg(long, conflicts_with_all = ["old", "new"], required_unless_present = "new")]
    pub changes: Option<PathBuf>,

    /// Directory holding the previous version of the tree
    #[arg(long, requires = "new")]
    pub old: Option<PathBuf>,

    /// Directory holding the changed version of the tree
    #[arg(long, requires = "old")]
    pub new: Option<PathBuf>,

    /// Unified diff for line statistics (synthesized when omitted)
    #[arg(long)]
    pub diff: Option<PathBuf>,

    /// Configuration file (TOML); defaults are used when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Use this commit message instead of a generated title
    #[arg(long)]
    pub message: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Message)]
    pub format: OutputFormat,

    /// Skip structural analysis and report line statistics only
    #[arg(long)]
    pub stats_only: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain commit message
    Message,
    /// Full narrative as JSON
    Json,
}

pub fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => LensConfig::load(path)
            .with_context(|| format!("Cannot load config from {}", path.display()))?,
        None => LensConfig::default(),
    };
    let pipeline = LensPipeline::new(config)?;

    let changes = match (&args.changes, &args.old, &args.new) {
        (Some(manifest), _, _) => read_manifest(manifest)?,
        (None, Some(old), Some(new)) => changes_between(old, new)?,
        _ => bail!("Either --changes or both --old and --new are required"),
    };
    info!(files = changes.len(), "Loaded change set");

    let narrative = if args.stats_only {
        pipeline.summarize_statistics(&changes)?
    } else {
        let diff_text = match &args.diff {
            Some(path) => {
                ensure_exists(path)?;
                std::fs::read_to_string(path)
                    .with_context(|| format!("Cannot read diff {}", path.display()))?
            }
            None => synthesize_unified_diff(&changes),
        };
        let options = AnalyzeOptions {
            message_override: args.message.clone(),
        };
        pipeline.analyze(&changes, &diff_text, &options)?
    };

    match args.format {
        OutputFormat::Message => println!("{}", narrative.message()),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&narrative).context("Cannot serialize narrative")?
        ),
    }
    Ok(())
}

fn ensure_exists(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        bail!("Input not found: {}", path.display());
    }
    Ok(())
}

fn read_manifest(path: &Path) -> anyhow::Result<Vec<FileChange>> {
    ensure_exists(path)?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read manifest {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid change manifest {}", path.display()))
}

/// Pair up files of two directory trees by relative path. Identical files
/// are left out.
fn changes_between(old: &Path, new: &Path) -> anyhow::Result<Vec<FileChange>> {
    let mut before = read_tree(old)?;
    let mut after = read_tree(new)?;

    let paths: BTreeSet<String> = before.keys().chain(after.keys()).cloned().collect();
    let changes = paths
        .into_iter()
        .filter_map(|path| {
            let old_text = before.remove(&path);
            let new_text = after.remove(&path);
            if old_text == new_text {
                return None;
            }
            FileChange::from_parts(path, old_text, new_text)
        })
        .collect();
    Ok(changes)
}

/// Every UTF-8 file under `root`, keyed by slash-separated relative path.
fn read_tree(root: &Path) -> anyhow::Result<BTreeMap<String, String>> {
    if !root.is_dir() {
        bail!("Input not found: {} is not a directory", root.display());
    }
    let pattern = format!("{}/**/*", glob::Pattern::escape(&root.to_string_lossy()));
    let entries = glob::glob(&pattern)
        .with_context(|| format!("Cannot walk directory {}", root.display()))?;

    let mut files = BTreeMap::new();
    for entry in entries {
        let path = entry.with_context(|| format!("Cannot walk directory {}", root.display()))?;
        if !path.is_file() {
            continue;
        }
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        if relative.components().any(|c| c.as_os_str() == ".git") {
            continue;
        }
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let bytes =
            std::fs::read(&path).with_context(|| format!("Cannot read {}", path.display()))?;
        match String::from_utf8(bytes) {
            Ok(text) => {
                files.insert(key, text);
            }
            Err(_) => debug!(path = %key, "Skipping non-UTF-8 file"),
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use changelens_core::ChangeKind;

    use super::*;

    #[test]
    fn trees_are_paired_by_relative_path() {
        let old = tempfile::tempdir().unwrap();
        let new = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(old.path().join("src")).unwrap();
        std::fs::create_dir_all(new.path().join("src")).unwrap();
        std::fs::write(old.path().join("src/same.py"), "x = 1\n").unwrap();
        std::fs::write(new.path().join("src/same.py"), "x = 1\n").unwrap();
        std::fs::write(old.path().join("src/edit.py"), "x = 1\n").unwrap();
        std::fs::write(new.path().join("src/edit.py"), "x = 2\n").unwrap();
        std::fs::write(old.path().join("gone.md"), "# Gone\n").unwrap();
        std::fs::write(new.path().join("fresh.rs"), "fn main() {}\n").unwrap();

        let changes = changes_between(old.path(), new.path()).unwrap();
        let summary: Vec<(&str, ChangeKind)> =
            changes.iter().map(|c| (c.path(), c.kind())).collect();
        assert_eq!(
            summary,
            vec![
                ("fresh.rs", ChangeKind::Added),
                ("gone.md", ChangeKind::Deleted),
                ("src/edit.py", ChangeKind::Modified),
            ]
        );
    }

    #[test]
    fn missing_directory_is_input_not_found() {
        let err = read_tree(Path::new("/nonexistent/changelens-tree")).unwrap_err();
        assert!(err.to_string().contains("Input not found"));
    }
}
