use crate::config::AreasSection;
use crate::error::ConfigError;
use crate::matcher::Matcher;

#[derive(Debug)]
struct CompiledArea {
    label: String,
    paths: Vec<Matcher>,
    /// Lowercased.
    keywords: Vec<String>,
}

/// Assigns each file exactly one primary functional area.
#[derive(Debug)]
pub struct AreaTagger {
    areas: Vec<CompiledArea>,
    default_area: String,
    test_area: String,
}

impl AreaTagger {
    pub fn new(section: &AreasSection) -> Result<Self, ConfigError> {
        let areas = section
            .areas
            .iter()
            .map(|def| {
                Ok(CompiledArea {
                    label: def.label.clone(),
                    paths: def
                        .paths
                        .iter()
                        .map(|p| Matcher::glob(p))
                        .collect::<Result<_, ConfigError>>()?,
                    keywords: def.keywords.iter().map(|k| k.to_lowercase()).collect(),
                })
            })
            .collect::<Result<_, ConfigError>>()?;

        Ok(Self {
            areas,
            default_area: section.default_area.clone(),
            test_area: section.test_area.clone(),
        })
    }

    pub fn test_area(&self) -> &str {
        &self.test_area
    }

    /// First configured area matching `path` or the file's entity names.
    pub fn tag(&self, path: &str, entity_names: &[&str]) -> &str {
        let tokens = path_tokens(path);
        let names: Vec<String> = entity_names.iter().map(|n| n.to_lowercase()).collect();

        self.areas
            .iter()
            .find(|area| {
                area.paths.iter().any(|m| m.matches_path(path))
                    || area.keywords.iter().any(|k| tokens.contains(k))
                    || area.keywords.iter().any(|k| dominates(k, &names))
            })
            .map_or(self.default_area.as_str(), |area| area.label.as_str())
    }
}

/// Lowercased alphanumeric tokens of the directory segments and file stem.
fn path_tokens(path: &str) -> Vec<String> {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if let Some(file_name) = segments.pop() {
        let stem = match file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => file_name,
        };
        segments.push(stem);
    }
    segments
        .iter()
        .flat_map(|segment| segment.split(|c: char| !c.is_ascii_alphanumeric()))
        .filter(|token| !token.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

/// `keyword` appears in more than half of `names`.
fn dominates(keyword: &str, names: &[String]) -> bool {
    !names.is_empty() && names.iter().filter(|n| n.contains(keyword)).count() * 2 > names.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagger() -> AreaTagger {
        AreaTagger::new(&AreasSection::default()).unwrap()
    }

    #[test]
    fn globs_claim_files_in_priority_order() {
        let t = tagger();
        assert_eq!(t.tag("tests/test_app.py", &[]), "tests");
        assert_eq!(t.tag("src/app.test.ts", &[]), "tests");
        assert_eq!(t.tag("README.md", &[]), "docs");
        assert_eq!(t.tag("Cargo.toml", &[]), "build");
        assert_eq!(t.tag(".github/workflows/ci.yml", &[]), "build");
        assert_eq!(t.tag("settings/app.yaml", &[]), "config");
        assert_eq!(t.tag("src/engine.rs", &[]), "core");
    }

    #[test]
    fn keywords_match_whole_path_tokens() {
        let t = tagger();
        assert_eq!(t.tag("src/cli/run.rs", &[]), "cli");
        assert_eq!(t.tag("src/config_loader.py", &[]), "config");
        assert_eq!(t.tag("src/latest.rs", &[]), "core");
        assert_eq!(t.tag("src/formatting.rs", &[]), "core");
    }

    #[test]
    fn dominant_entity_names_decide_when_the_path_is_silent() {
        let t = tagger();
        assert_eq!(
            t.tag("src/engine.py", &["render_table", "render_row", "parse"]),
            "output"
        );
        assert_eq!(t.tag("src/engine.py", &["render_table", "parse"]), "core");
    }

    #[test]
    fn invalid_globs_are_rejected() {
        let mut section = AreasSection::default();
        section.areas[0].paths.push("[a-".into());
        assert!(AreaTagger::new(&section).is_err());
    }
}
