//! File-backed storage: the read-only content catalog and the learner's
//! progress record.

use chrono::Local;
use echomaster_core::catalog::Catalog;
use echomaster_core::progress::ProgressState;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed JSON in {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Loads the practice catalog. A missing or malformed catalog is fatal: there
/// is nothing to practice without it.
pub fn load_catalog(path: &Path) -> Result<Catalog, StoreError> {
    let raw = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Owns the progress record's location on disk.
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads the stored record, or a fresh one if none exists yet.
    ///
    /// A record that fails to parse is treated like a missing one: progress
    /// corruption must never prevent the application from starting. The daily
    /// reset is applied here so the record is current before the session sees
    /// it.
    pub fn load_or_default(&self) -> ProgressState {
        let today = Local::now().date_naive();
        let mut progress = match fs::read_to_string(&self.path) {
            Ok(raw) => match serde_json::from_str::<ProgressState>(&raw) {
                Ok(progress) => progress,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Progress record is malformed, starting fresh");
                    ProgressState::new(today)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No progress record found, starting fresh");
                ProgressState::new(today)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not read progress record, starting fresh");
                ProgressState::new(today)
            }
        };

        if progress.apply_daily_reset(today) {
            info!("New practice day, daily counter reset");
        }
        progress
    }

    /// Writes the record out, via a sibling temp file and a rename so a crash
    /// mid-write cannot truncate the previous record.
    pub fn save(&self, progress: &ProgressState) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let json = serde_json::to_string_pretty(progress).map_err(|source| {
            StoreError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        let mut tmp = fs::File::create(&tmp_path).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.sync_all().map_err(io_err)?;
        drop(tmp);
        fs::rename(&tmp_path, &self.path).map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    #[test]
    fn test_load_catalog_valid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(
            &path,
            r#"{
                "dialogues": [],
                "words": [
                    { "id": 1, "text_target": "Hello", "text_native": "...", "category": "Greeting" }
                ]
            }"#,
        )
        .unwrap();

        let catalog = load_catalog(&path).unwrap();
        assert_eq!(catalog.words.len(), 1);
        assert!(catalog.dialogues.is_empty());
    }

    #[test]
    fn test_load_catalog_missing_is_an_error() {
        let dir = tempdir().unwrap();
        let err = load_catalog(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn test_load_catalog_malformed_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_catalog(&path).unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }

    #[test]
    fn test_progress_round_trip() {
        let dir = tempdir().unwrap();
        let store = ProgressStore::new(dir.path().join("progress.json"));

        let mut progress = ProgressState::new(Local::now().date_naive());
        progress.complete_word(1001);
        progress.complete_turn(101);
        store.save(&progress).unwrap();

        let loaded = store.load_or_default();
        assert_eq!(loaded, progress);
        // No leftover temp file after a successful save.
        assert!(!dir.path().join("progress.json.tmp").exists());
    }

    #[test]
    fn test_missing_record_starts_fresh() {
        let dir = tempdir().unwrap();
        let store = ProgressStore::new(dir.path().join("progress.json"));

        let progress = store.load_or_default();
        assert_eq!(progress.daily_count, 0);
        assert!(progress.completed_word_ids.is_empty());
        assert_eq!(progress.last_practice_date, Local::now().date_naive());
    }

    #[test]
    fn test_corrupt_record_starts_fresh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress.json");
        fs::write(&path, "not valid json at all").unwrap();

        let store = ProgressStore::new(path);
        let progress = store.load_or_default();
        assert_eq!(progress.daily_count, 0);
    }

    #[test]
    fn test_stale_record_gets_daily_reset() {
        let dir = tempdir().unwrap();
        let store = ProgressStore::new(dir.path().join("progress.json"));

        let mut progress = ProgressState::new(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        progress.complete_word(1001);
        progress.daily_count = 7;
        store.save(&progress).unwrap();

        let loaded = store.load_or_default();
        assert_eq!(loaded.daily_count, 0);
        assert_eq!(loaded.last_practice_date, Local::now().date_naive());
        // Completion sets survive the reset.
        assert_eq!(loaded.completed_word_ids, vec![1001]);
    }
}
