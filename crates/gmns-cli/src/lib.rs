//! CLI library components for the GMNS readiness validator.

pub mod logging;
pub mod report;
