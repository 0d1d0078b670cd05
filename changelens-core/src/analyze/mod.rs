//! Analysis stages that run after extraction: role and capability mapping,
//! relation detection and quality metrics.

pub mod capability;
pub mod metrics;
pub mod relations;
pub mod roles;

pub use capability::CapabilityScanner;
pub use metrics::compute_metrics;
pub use relations::{RelationAnalysis, detect_relations};
pub use roles::RoleMapper;
