use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{NaiveDate, NaiveDateTime};
use moka::sync::Cache;

use crate::error::AppError;
use crate::models::Snapshot;
use crate::services::excel::ExcelProcessor;

/// Identity of a workbook on disk plus the day it was processed for.
///
/// Contact recency and contract expiry are relative to the processing day,
/// so a new day forces a reload even when the file is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub path: PathBuf,
    pub len: u64,
    pub modified: Option<SystemTime>,
    pub day: NaiveDate,
}

impl SourceKey {
    pub fn for_path(path: &Path, day: NaiveDate) -> Result<Self, AppError> {
        let path = std::fs::canonicalize(path)?;
        let metadata = std::fs::metadata(&path)?;
        Ok(Self {
            path,
            len: metadata.len(),
            modified: metadata.modified().ok(),
            day,
        })
    }
}

/// Caller-owned cache of whole-workbook snapshots. Entries are never patched,
/// only replaced.
pub struct SnapshotCache {
    processor: ExcelProcessor,
    cache: Cache<SourceKey, Arc<Snapshot>>,
}

impl SnapshotCache {
    pub fn new(processor: ExcelProcessor, capacity: u64) -> Self {
        Self {
            processor,
            cache: Cache::new(capacity.max(1)),
        }
    }

    pub fn get_or_load(&self, path: &Path, now: NaiveDateTime) -> Arc<Snapshot> {
        match SourceKey::for_path(path, now.date()) {
            Ok(key) => self.cache.get_with(key, || {
                tracing::info!("Snapshot cache miss for {}, loading", path.display());
                Arc::new(self.processor.process_path(path, now))
            }),
            Err(e) => {
                tracing::error!("Workbook {} unavailable: {}", path.display(), e);
                Arc::new(Snapshot::empty(&e.to_string(), now))
            }
        }
    }

    /// Drops every snapshot of `path` regardless of the file version it came from.
    pub fn invalidate(&self, path: &Path) {
        let target = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let stale: Vec<Arc<SourceKey>> = self
            .cache
            .iter()
            .filter(|(key, _)| key.path == target)
            .map(|(key, _)| key)
            .collect();
        for key in stale {
            self.cache.invalidate(key.as_ref());
        }
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn reload(&self, path: &Path, now: NaiveDateTime) -> Arc<Snapshot> {
        self.invalidate(path);
        self.get_or_load(path, now)
    }

    pub fn contains(&self, path: &Path, day: NaiveDate) -> bool {
        SourceKey::for_path(path, day)
            .map(|key| self.cache.contains_key(&key))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::excel::SheetLayout;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 30)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn cache() -> SnapshotCache {
        SnapshotCache::new(ExcelProcessor::new(SheetLayout::default(), 1024 * 1024), 4)
    }

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("cs-health-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_unavailable_snapshot_and_is_not_cached() {
        let cache = cache();
        let path = Path::new("/nonexistent/BASE-CS.xlsx");
        let snapshot = cache.get_or_load(path, now());
        assert!(snapshot.clients.is_empty());
        assert!(!snapshot.clients_status.is_available());
        assert!(!cache.contains(path, now().date()));
    }

    #[test]
    fn same_file_version_is_served_from_cache() {
        let cache = cache();
        let path = temp_file("same.xlsx", b"not really a workbook");

        let first = cache.get_or_load(&path, now());
        let second = cache.get_or_load(&path, now());
        assert!(Arc::ptr_eq(&first, &second));
        assert!(cache.contains(&path, now().date()));

        cache.invalidate(&path);
        assert!(!cache.contains(&path, now().date()));

        let reloaded = cache.reload(&path, now());
        assert!(!Arc::ptr_eq(&first, &reloaded));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn changed_file_gets_a_new_key() {
        let path = temp_file("changed.xlsx", b"v1");
        let before = SourceKey::for_path(&path, now().date()).unwrap();
        std::fs::write(&path, b"version two").unwrap();
        let after = SourceKey::for_path(&path, now().date()).unwrap();
        assert_ne!(before, after);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn next_day_reprocesses_unchanged_file() {
        let cache = cache();
        let path = temp_file("next-day.xlsx", b"unchanged");
        let tomorrow = now() + chrono::Duration::days(1);

        let today_snapshot = cache.get_or_load(&path, now());
        let tomorrow_snapshot = cache.get_or_load(&path, tomorrow);
        assert!(!Arc::ptr_eq(&today_snapshot, &tomorrow_snapshot));
        assert_eq!(tomorrow_snapshot.loaded_at, tomorrow);
        assert!(cache.contains(&path, now().date()));
        assert!(cache.contains(&path, tomorrow.date()));

        // same day, later hour: still cached
        let later = now() + chrono::Duration::hours(3);
        assert!(Arc::ptr_eq(&today_snapshot, &cache.get_or_load(&path, later)));

        cache.invalidate(&path);
        assert!(!cache.contains(&path, now().date()));
        assert!(!cache.contains(&path, tomorrow.date()));
        std::fs::remove_file(&path).ok();
    }
}
