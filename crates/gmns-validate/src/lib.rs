//! Readiness validation for GMNS networks.
//!
//! [`NetworkValidator`] runs cumulative readiness levels over node, link and
//! demand files: structure (1), demand and zones (2), network attributes (3),
//! configuration (4), ODME inputs (5), and three levels over the outputs of
//! an external assignment engine (6 to 8). Every problem is reported as a
//! [`gmns_model::ValidationResult`]; only an unusable link file stops a run.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use gmns_ingest::discover_network_files;
//! use gmns_model::ReadinessLevel;
//! use gmns_validate::{ExecutionConfig, NetworkValidator};
//!
//! let files = discover_network_files(Path::new("networks/tempe"))?;
//! let mut validator = NetworkValidator::new(files.into(), ExecutionConfig::default());
//! let report = validator.validate(ReadinessLevel::AssignmentFit);
//! println!("{} errors", report.error_count());
//! ```

mod cache;
pub mod checks;
mod engine;
mod error;
mod execution;
mod export;
pub mod post_run;
mod stats;
mod util;
mod validator;

// === Error Types ===
pub use error::{CheckError, EngineError, Result};

// === Execution ===
pub use engine::{EngineRunner, ProcessRunner, wait_for_file};
pub use execution::{EngineMode, ExecutionConfig};

// === Orchestration ===
pub use cache::{LevelCache, input_fingerprint};
pub use validator::{NetworkPaths, NetworkValidator};

// === Reporting ===
pub use export::{
    DISCONNECTED_OD_PAIRS, Exporter, PROBLEM_OBS_VOLUME_LINKS, PROBLEM_VOLUME_LINKS,
    PROBLEMATIC_OD_DISTANCES,
};
pub use stats::{column_statistic, field_statistics};

// === Statistics ===
pub use post_run::fit::{FitMetrics, VolumeSource, coefficient_of_determination, geh};
