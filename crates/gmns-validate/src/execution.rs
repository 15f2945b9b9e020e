//! How a validation run treats the external assignment engine.

use std::fmt;
use std::time::Duration;

/// Which assignment engine levels 6 and above trigger.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EngineMode {
    /// Never run an engine; only inspect outputs already on disk.
    #[default]
    Disabled,
    /// Call the engine runner registered on the validator.
    InProcess,
    /// Spawn an executable in the working directory.
    Executable { program: String, args: Vec<String> },
}

impl EngineMode {
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }
}

impl fmt::Display for EngineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled"),
            Self::InProcess => f.write_str("in-process"),
            Self::Executable { program, .. } => write!(f, "executable ({program})"),
        }
    }
}

/// Execution settings passed into [`crate::NetworkValidator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionConfig {
    pub engine: EngineMode,
    /// Run the engine for the accessibility level.
    pub accessibility_enabled: bool,
    /// Delay between checks for an engine output file.
    pub poll_interval: Duration,
    /// How long to wait for an engine output file before giving up.
    pub output_timeout: Duration,
    /// Write diagnostic CSV files into the working directory.
    pub export_diagnostics: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            engine: EngineMode::Disabled,
            accessibility_enabled: true,
            poll_interval: Duration::from_secs(1),
            output_timeout: Duration::from_secs(120),
            export_diagnostics: true,
        }
    }
}

impl ExecutionConfig {
    #[must_use]
    pub fn with_engine(mut self, engine: EngineMode) -> Self {
        self.engine = engine;
        self
    }

    #[must_use]
    pub fn with_accessibility(mut self, enabled: bool) -> Self {
        self.accessibility_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_output_timeout(mut self, timeout: Duration) -> Self {
        self.output_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_export_diagnostics(mut self, enabled: bool) -> Self {
        self.export_diagnostics = enabled;
        self
    }

    /// Whether the accessibility level should launch the engine.
    pub fn runs_engine(&self) -> bool {
        self.accessibility_enabled && !self.engine.is_disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExecutionConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.output_timeout, Duration::from_secs(120));
        assert!(config.export_diagnostics);
        assert!(!config.runs_engine());
    }

    #[test]
    fn test_builders() {
        let config = ExecutionConfig::default()
            .with_engine(EngineMode::Executable {
                program: "DTALite".to_string(),
                args: Vec::new(),
            })
            .with_output_timeout(Duration::from_secs(5));
        assert!(config.runs_engine());
        assert_eq!(config.engine.to_string(), "executable (DTALite)");
        assert!(!config.with_accessibility(false).runs_engine());
    }
}
