//! Launching the external assignment engine and waiting for its outputs.

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::EngineError;

/// Runs a traffic assignment in a working directory.
///
/// Implementations write their outputs (od_performance.csv and friends) into
/// `working_dir`. Tests register a double instead of a real engine.
pub trait EngineRunner: Send + Sync {
    fn run(&self, working_dir: &Path) -> Result<(), EngineError>;
}

/// Spawns an engine executable and streams its output into the log.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
    args: Vec<String>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl EngineRunner for ProcessRunner {
    fn run(&self, working_dir: &Path) -> Result<(), EngineError> {
        tracing::info!(program = %self.program, dir = %working_dir.display(), "launching assignment engine");
        let started = Instant::now();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| EngineError::Launch {
                program: self.program.clone(),
                source,
            })?;

        let stderr = child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    tracing::warn!(target: "gmns_validate::engine", "{line}");
                }
            })
        });
        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                tracing::info!(target: "gmns_validate::engine", "{line}");
            }
        }

        let status = child.wait().map_err(|source| EngineError::Wait {
            program: self.program.clone(),
            source,
        })?;
        if let Some(handle) = stderr
            && handle.join().is_err()
        {
            tracing::debug!("engine stderr reader panicked");
        }
        tracing::info!(
            program = %self.program,
            duration_ms = started.elapsed().as_millis() as u64,
            %status,
            "assignment engine finished"
        );
        if status.success() {
            Ok(())
        } else {
            Err(EngineError::Failed {
                program: self.program.clone(),
                status,
            })
        }
    }
}

/// Poll until `path` exists or `timeout` elapses. Returns whether it appeared.
pub fn wait_for_file(path: &Path, timeout: Duration, interval: Duration) -> bool {
    let started = Instant::now();
    loop {
        if path.exists() {
            tracing::debug!(path = %path.display(), "engine output found");
            return true;
        }
        let elapsed = started.elapsed();
        if elapsed >= timeout {
            tracing::warn!(
                path = %path.display(),
                timeout_secs = timeout.as_secs_f64(),
                "timed out waiting for engine output"
            );
            return false;
        }
        tracing::debug!(path = %path.display(), waited_ms = elapsed.as_millis() as u64, "waiting for engine output");
        thread::sleep(interval.min(timeout - elapsed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_wait_for_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("od_performance.csv");
        fs::write(&path, "o_zone_id\n").unwrap();
        assert!(wait_for_file(&path, Duration::ZERO, Duration::from_millis(1)));
    }

    #[test]
    fn test_wait_times_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.csv");
        assert!(!wait_for_file(&path, Duration::from_millis(20), Duration::from_millis(5)));
    }

    #[test]
    fn test_missing_program_fails_to_launch() {
        let dir = TempDir::new().unwrap();
        let runner = ProcessRunner::new("gmns-engine-that-does-not-exist", Vec::new());
        let err = runner.run(dir.path()).unwrap_err();
        assert!(matches!(err, EngineError::Launch { .. }));
    }
}
