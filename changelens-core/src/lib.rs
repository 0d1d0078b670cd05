//! changelens core library: change analysis and commit narrative synthesis.
//!
//! The main entry point is [`pipeline::LensPipeline`], which runs
//! Extract → Map → Relate → Measure → Narrate over one change set. The free
//! functions [`analyze`] and [`summarize_statistics`] compile a pipeline for a
//! single call.

pub mod analyze;
pub mod config;
pub mod error;
pub mod extract;
pub mod matcher;
pub mod narrative;
pub mod pipeline;
pub mod types;

pub use config::LensConfig;
pub use error::{ConfigError, LensError, Result};
pub use pipeline::{AnalyzeOptions, LensPipeline, analyze, summarize_statistics};
pub use types::{ChangeKind, CommitNarrative, FileChange, RenderMode, TitleQuality};
