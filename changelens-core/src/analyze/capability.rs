// Capability detection over text added by the change.
//
// A signature counts only when it shows up in some file's inserted lines and
// in none of the old texts of the change set. Strength is the number of
// distinct such signatures in one file, maximised over files.

use std::collections::BTreeSet;

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::config::CapabilityDef;
use crate::error::ConfigError;
use crate::extract::diffstat::inserted_text;
use crate::matcher::Matcher;
use crate::types::{ChangeKind, DetectedCapability, FileChange};

#[derive(Debug)]
struct CompiledCapability {
    def: CapabilityDef,
    matchers: Vec<Matcher>,
}

/// Scans changed content for configured capability signatures.
#[derive(Debug)]
pub struct CapabilityScanner {
    capabilities: Vec<CompiledCapability>,
}

/// Signature hits of one file: `(capability, signature)` index pairs.
#[derive(Debug, Default)]
struct FileHits {
    added: BTreeSet<(usize, usize)>,
    old: BTreeSet<(usize, usize)>,
}

impl CapabilityScanner {
    pub fn new(defs: &[CapabilityDef]) -> Result<Self, ConfigError> {
        let capabilities = defs
            .iter()
            .map(|def| {
                let matchers = def
                    .signatures
                    .iter()
                    .map(|s| {
                        Matcher::signature(s).map_err(|e| {
                            ConfigError::Invalid(format!("capability '{}': {e}", def.id))
                        })
                    })
                    .collect::<Result<_, ConfigError>>()?;
                Ok(CompiledCapability {
                    def: def.clone(),
                    matchers,
                })
            })
            .collect::<Result<_, ConfigError>>()?;
        Ok(Self { capabilities })
    }

    /// Detected capabilities, strongest first, ties in declaration order.
    #[instrument(skip_all, name = "detect_capabilities")]
    pub fn detect(&self, changes: &[&FileChange]) -> Vec<DetectedCapability> {
        let hits: Vec<FileHits> = changes.par_iter().map(|c| self.scan(c)).collect();
        let seen_before: BTreeSet<(usize, usize)> =
            hits.iter().flat_map(|h| h.old.iter().copied()).collect();

        let mut detected = Vec::new();
        for (cap_idx, cap) in self.capabilities.iter().enumerate() {
            let mut strength = 0u32;
            let mut signatures = BTreeSet::new();
            let mut files = Vec::new();

            for (change, file_hits) in changes.iter().zip(&hits) {
                let fresh: Vec<usize> = file_hits
                    .added
                    .iter()
                    .filter(|key| key.0 == cap_idx && !seen_before.contains(*key))
                    .map(|&(_, sig_idx)| sig_idx)
                    .collect();
                if fresh.is_empty() {
                    continue;
                }
                strength = strength.max(u32::try_from(fresh.len()).unwrap_or(u32::MAX));
                signatures.extend(fresh);
                files.push(change.path().to_string());
            }

            if strength > 0 {
                debug!(id = %cap.def.id, strength, "Capability detected");
                files.sort();
                detected.push(DetectedCapability {
                    id: cap.def.id.clone(),
                    description: cap.def.description.clone(),
                    impact: cap.def.impact.clone(),
                    strength,
                    signatures: signatures
                        .into_iter()
                        .map(|i| cap.def.signatures[i].clone())
                        .collect(),
                    files,
                });
            }
        }

        // Stable: equal strengths keep declaration order.
        detected.sort_by(|a, b| b.strength.cmp(&a.strength));
        detected
    }

    fn scan(&self, change: &FileChange) -> FileHits {
        let added = inserted_text(change.old(), change.new_text());
        let path_eligible = change.kind() != ChangeKind::Deleted;
        let mut hits = FileHits::default();

        for (cap_idx, cap) in self.capabilities.iter().enumerate() {
            for (sig_idx, matcher) in cap.matchers.iter().enumerate() {
                let found = if matcher.is_path() {
                    path_eligible && matcher.matches_path(change.path())
                } else {
                    matcher.matches_text(&added)
                };
                if found {
                    hits.added.insert((cap_idx, sig_idx));
                }
                if change.old().is_some_and(|old| matcher.matches_text(old)) {
                    hits.old.insert((cap_idx, sig_idx));
                }
            }
        }
        hits
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
