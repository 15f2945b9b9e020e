//! Memoized results of the engine-backed levels.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use gmns_model::{ReadinessLevel, ValidationResult};
use sha2::{Digest, Sha256};

/// SHA-256 over each input's path and content, hex-encoded.
///
/// A missing or unreadable file contributes only its path and a marker, so
/// creating or deleting an input changes the fingerprint.
pub fn input_fingerprint<'a>(paths: impl IntoIterator<Item = Option<&'a Path>>) -> String {
    let mut hasher = Sha256::new();
    for path in paths {
        let Some(path) = path else {
            hasher.update(b"<absent>\0");
            continue;
        };
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(b"\0");
        match fs::read(path) {
            Ok(bytes) => {
                hasher.update((bytes.len() as u64).to_le_bytes());
                hasher.update(&bytes);
            }
            Err(_) => hasher.update(b"<unreadable>"),
        }
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}

/// Results produced by levels 6 to 8, tagged with the inputs they came from.
#[derive(Debug, Clone, Default)]
pub struct LevelCache {
    fingerprint: Option<String>,
    levels: BTreeMap<u8, Vec<ValidationResult>>,
}

impl LevelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt `fingerprint`. Returns `true` and clears the cache when it changed.
    pub fn refresh(&mut self, fingerprint: &str) -> bool {
        if self.fingerprint.as_deref() == Some(fingerprint) {
            return false;
        }
        if !self.levels.is_empty() {
            tracing::debug!(cached = self.levels.len(), "inputs changed, clearing level cache");
        }
        self.levels.clear();
        self.fingerprint = Some(fingerprint.to_string());
        true
    }

    pub fn get(&self, level: ReadinessLevel) -> Option<&[ValidationResult]> {
        self.levels.get(&level.ordinal()).map(Vec::as_slice)
    }

    /// Store a level's own results. Levels below 6 are not memoized.
    pub fn insert(&mut self, level: ReadinessLevel, results: Vec<ValidationResult>) {
        if level.is_memoized() {
            self.levels.insert(level.ordinal(), results);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fingerprint_tracks_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("link.csv");
        fs::write(&path, "link_id\n1\n").unwrap();
        let first = input_fingerprint([Some(path.as_path()), None]);
        assert_eq!(first, input_fingerprint([Some(path.as_path()), None]));
        assert_eq!(first.len(), 64);

        fs::write(&path, "link_id\n2\n").unwrap();
        assert_ne!(first, input_fingerprint([Some(path.as_path()), None]));
    }

    #[test]
    fn test_refresh_clears_on_change() {
        let mut cache = LevelCache::new();
        assert!(cache.refresh("a"));
        cache.insert(ReadinessLevel::Accessibility, vec![ValidationResult::info("cached")]);
        cache.insert(ReadinessLevel::Structural, vec![ValidationResult::info("ignored")]);
        assert!(cache.get(ReadinessLevel::Accessibility).is_some());
        assert!(cache.get(ReadinessLevel::Structural).is_none());

        assert!(!cache.refresh("a"));
        assert_eq!(cache.get(ReadinessLevel::Accessibility).map(<[_]>::len), Some(1));

        assert!(cache.refresh("b"));
        assert!(cache.get(ReadinessLevel::Accessibility).is_none());
    }
}
