//! `daily_stats.json`: a human-readable copy of the posting counters,
//! keyed by ISO date.
//!
//! The database stays authoritative for the quota; this file is rewritten
//! after each post run and never read back by the scheduler.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use roomfeed_core::DailyStats;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct DayEntry {
    pub attempted: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub last_post: Option<DateTime<Utc>>,
}

impl From<&DailyStats> for DayEntry {
    fn from(stats: &DailyStats) -> Self {
        Self {
            attempted: stats.attempted,
            succeeded: stats.succeeded,
            failed: stats.failed,
            last_post: stats.last_post_at,
        }
    }
}

pub(crate) type StatsFile = BTreeMap<String, DayEntry>;

/// Reads the file at `path`. A missing file is an empty map.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub(crate) fn load(path: &Path) -> anyhow::Result<StatsFile> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StatsFile::new()),
        Err(e) => return Err(anyhow::anyhow!("failed to read {}: {e}", path.display())),
    };
    serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))
}

/// Replaces the entry for `stats.date` and rewrites the file atomically.
///
/// An unreadable existing file is replaced rather than merged.
///
/// # Errors
///
/// Returns an error if the new file cannot be written or moved into place.
pub(crate) fn record_day(path: &Path, stats: &DailyStats) -> anyhow::Result<()> {
    let mut file = load(path).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "discarding unreadable stats file");
        StatsFile::new()
    });
    file.insert(stats.date.to_string(), DayEntry::from(stats));

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .map_err(|e| anyhow::anyhow!("failed to create {}: {e}", dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| anyhow::anyhow!("failed to create temp file in {}: {e}", dir.display()))?;
    serde_json::to_writer_pretty(&mut tmp, &file)?;
    tmp.write_all(b"\n")?;
    tmp.persist(path)
        .map_err(|e| anyhow::anyhow!("failed to replace {}: {}", path.display(), e.error))?;

    tracing::debug!(path = %path.display(), day = %stats.date, "stats file updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use super::*;

    fn stats(day: u32, succeeded: u32, failed: u32) -> DailyStats {
        let date = NaiveDate::from_ymd_opt(2026, 10, day).unwrap();
        DailyStats {
            date,
            attempted: succeeded + failed,
            succeeded,
            failed,
            last_post_at: (succeeded > 0)
                .then(|| Utc.with_ymd_and_hms(2026, 10, day, 3, 0, 0).unwrap()),
        }
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("daily_stats.json")).unwrap().is_empty());
    }

    #[test]
    fn record_day_merges_with_existing_days() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily_stats.json");

        record_day(&path, &stats(18, 3, 0)).unwrap();
        record_day(&path, &stats(19, 1, 2)).unwrap();
        record_day(&path, &stats(19, 2, 2)).unwrap();

        let file = load(&path).unwrap();
        assert_eq!(file.len(), 2);
        assert_eq!(file["2026-10-18"].succeeded, 3);
        let today = &file["2026-10-19"];
        assert_eq!((today.attempted, today.succeeded, today.failed), (4, 2, 2));
        assert!(today.last_post.is_some());
    }

    #[test]
    fn written_file_uses_iso_date_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("daily_stats.json");

        record_day(&path, &stats(19, 0, 1)).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["2026-10-19"]["failed"], 1);
        assert!(raw["2026-10-19"]["last_post"].is_null());
    }

    #[test]
    fn corrupt_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily_stats.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(load(&path).is_err());
        record_day(&path, &stats(19, 1, 0)).unwrap();
        assert_eq!(load(&path).unwrap().len(), 1);
    }
}
