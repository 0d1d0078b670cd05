use crate::config::RolesSection;
use crate::error::ConfigError;
use crate::matcher::Matcher;
use crate::types::{Component, Entity, EntityStatus, FileAnalysis};

/// Ordered `(pattern, role)` rules; the first match names the role.
#[derive(Debug)]
pub struct RoleMapper {
    rules: Vec<(Matcher, String)>,
    noise: Vec<Matcher>,
    max_components: usize,
}

impl RoleMapper {
    pub fn new(section: &RolesSection) -> Result<Self, ConfigError> {
        let rules = section
            .rules
            .iter()
            .map(|rule| Ok((Matcher::name_pattern(&rule.pattern)?, rule.role.clone())))
            .collect::<Result<_, ConfigError>>()?;
        let noise = section
            .noise_patterns
            .iter()
            .map(|p| Matcher::name_pattern(p))
            .collect::<Result<_, ConfigError>>()?;
        Ok(Self {
            rules,
            noise,
            max_components: section.max_components,
        })
    }

    /// Role for one entity, falling back to `"{kind} {name}"`.
    pub fn role_for(&self, entity: &Entity) -> String {
        self.rules
            .iter()
            .find(|(matcher, _)| matcher.matches_text(&entity.short_name))
            .map_or_else(
                || format!("{} {}", entity.kind, entity.short_name),
                |(_, role)| role.clone(),
            )
    }

    pub fn is_noise(&self, entity: &Entity) -> bool {
        self.noise.iter().any(|m| m.matches_text(&entity.short_name))
    }

    /// Role-labelled components for the narrative: added and modified
    /// entities that are not noise, in file then source order, capped.
    pub fn components(&self, analyses: &[FileAnalysis]) -> Vec<Component> {
        analyses
            .iter()
            .flat_map(|analysis| &analysis.entities)
            .filter(|entity| entity.status != EntityStatus::Removed)
            .filter(|entity| !self.is_noise(entity))
            .take(self.max_components)
            .map(|entity| Component {
                name: entity.name.clone(),
                kind: entity.kind,
                file: entity.file.clone(),
                status: entity.status,
                role: self.role_for(entity),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use changelens_graphs::SymbolKind;

    use super::*;
    use crate::config::RoleRule;

    fn entity(name: &str, kind: SymbolKind, status: EntityStatus) -> Entity {
        Entity {
            name: name.to_string(),
            short_name: name.rsplit(['.', ':']).next().unwrap_or(name).to_string(),
            kind,
            file: "src/a.py".into(),
            status,
            complexity: 0,
        }
    }

    #[test]
    fn first_matching_rule_wins() {
        let mapper = RoleMapper::new(&RolesSection::default()).unwrap();
        let load = entity("Settings.load_config", SymbolKind::Function, EntityStatus::Added);
        assert_eq!(mapper.role_for(&load), "config loader");
        let cfg = entity("LensConfig", SymbolKind::Class, EntityStatus::Added);
        assert_eq!(mapper.role_for(&cfg), "configuration manager");
        let main = entity("main", SymbolKind::Function, EntityStatus::Added);
        assert_eq!(mapper.role_for(&main), "entry point");
    }

    #[test]
    fn declared_order_is_respected() {
        let section = RolesSection {
            rules: vec![
                RoleRule {
                    pattern: "load".into(),
                    role: "first".into(),
                },
                RoleRule {
                    pattern: "load_config".into(),
                    role: "second".into(),
                },
            ],
            ..RolesSection::default()
        };
        let mapper = RoleMapper::new(&section).unwrap();
        let e = entity("load_config", SymbolKind::Function, EntityStatus::Added);
        assert_eq!(mapper.role_for(&e), "first");
    }

    #[test]
    fn unmatched_entities_get_a_generic_role() {
        let mapper = RoleMapper::new(&RolesSection::default()).unwrap();
        let e = entity("Greeter.greet", SymbolKind::Function, EntityStatus::Added);
        assert_eq!(mapper.role_for(&e), "function greet");
    }

    #[test]
    fn components_skip_noise_and_removed_entities() {
        let mapper = RoleMapper::new(&RolesSection {
            max_components: 2,
            ..RolesSection::default()
        })
        .unwrap();
        let analysis = FileAnalysis {
            path: "src/a.py".into(),
            language: "python".into(),
            kind: crate::types::ChangeKind::Modified,
            area: "core".into(),
            tier: changelens_graphs::ResolutionTier::Structural,
            entities: vec![
                entity("_private", SymbolKind::Function, EntityStatus::Added),
                entity("gone", SymbolKind::Function, EntityStatus::Removed),
                entity("run", SymbolKind::Function, EntityStatus::Modified),
                entity("Parser", SymbolKind::Class, EntityStatus::Added),
                entity("extra", SymbolKind::Function, EntityStatus::Added),
            ],
            complexity_delta: 0,
            references: vec![],
            degraded: None,
        };
        let components = mapper.components(std::slice::from_ref(&analysis));
        let roles: Vec<(&str, &str)> = components
            .iter()
            .map(|c| (c.name.as_str(), c.role.as_str()))
            .collect();
        assert_eq!(roles, vec![("run", "function run"), ("Parser", "parser")]);
    }

    #[test]
    fn malformed_rules_are_config_errors() {
        let section = RolesSection {
            rules: vec![RoleRule {
                pattern: "(".into(),
                role: "x".into(),
            }],
            ..RolesSection::default()
        };
        assert!(matches!(RoleMapper::new(&section), Err(ConfigError::Invalid(_))));
    }
}
