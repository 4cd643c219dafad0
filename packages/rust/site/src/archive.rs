//! Daily record persistence: one pretty-printed JSON file per date.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{info, warn};

use daybrief_shared::{DailyRecord, DaybriefError, Result};

/// Archive file path for a date: `<archive_dir>/YYYY-MM-DD.json`.
pub fn record_path(archive_dir: &Path, date: NaiveDate) -> PathBuf {
    archive_dir.join(format!("{}.json", date.format("%Y-%m-%d")))
}

/// Write a daily record, overwriting any existing record for the same date.
///
/// The write goes through a temp file and an atomic rename, so a crash
/// mid-write never leaves a torn record in history.
pub fn save_record(archive_dir: &Path, record: &DailyRecord) -> Result<PathBuf> {
    std::fs::create_dir_all(archive_dir).map_err(|e| DaybriefError::io(archive_dir, e))?;

    let json = serde_json::to_string_pretty(record)
        .map_err(|e| DaybriefError::Publish(format!("serialize record: {e}")))?;

    let path = record_path(archive_dir, record.date);
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| DaybriefError::io(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| DaybriefError::io(&path, e))?;

    info!(?path, sections = record.sections.len(), "saved daily record");
    Ok(path)
}

/// Load all daily records, newest-first.
///
/// Unreadable or corrupt files are skipped with a warning rather than
/// failing the whole render.
pub fn load_history(archive_dir: &Path) -> Result<Vec<DailyRecord>> {
    let mut records = Vec::new();

    if !archive_dir.exists() {
        return Ok(records);
    }

    let entries =
        std::fs::read_dir(archive_dir).map_err(|e| DaybriefError::io(archive_dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| DaybriefError::io(archive_dir, e))?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<DailyRecord>(&content) {
                Ok(record) => records.push(record),
                Err(e) => warn!(?path, error = %e, "skipping corrupt archive record"),
            },
            Err(e) => warn!(?path, error = %e, "skipping unreadable archive record"),
        }
    }

    records.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use daybrief_shared::{CURRENT_SCHEMA_VERSION, DaySection};
    use uuid::Uuid;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("db_archive_{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn record(date: &str) -> DailyRecord {
        DailyRecord {
            schema_version: CURRENT_SCHEMA_VERSION,
            date: date.parse().unwrap(),
            sections: vec![DaySection {
                stream_id: "pure-signal".into(),
                title: "Pure Signal".into(),
                narrative: "Narrative.".into(),
                source_links: vec![],
            }],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = temp_dir();
        save_record(&dir, &record("2026-08-24")).expect("save");
        save_record(&dir, &record("2026-08-25")).expect("save");

        let history = load_history(&dir).expect("load");
        assert_eq!(history.len(), 2);
        // Newest first
        assert_eq!(history[0].date.to_string(), "2026-08-25");
        assert_eq!(history[1].date.to_string(), "2026-08-24");
    }

    #[test]
    fn same_date_overwrites_not_duplicates() {
        let dir = temp_dir();
        let mut rec = record("2026-08-25");
        save_record(&dir, &rec).expect("first save");

        rec.sections[0].narrative = "Updated narrative.".into();
        save_record(&dir, &rec).expect("second save");

        let history = load_history(&dir).expect("load");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].sections[0].narrative, "Updated narrative.");
    }

    #[test]
    fn corrupt_record_is_skipped() {
        let dir = temp_dir();
        save_record(&dir, &record("2026-08-25")).expect("save");
        std::fs::write(dir.join("2026-08-24.json"), "{broken").unwrap();

        let history = load_history(&dir).expect("load despite corruption");
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn missing_archive_dir_is_empty_history() {
        let dir = temp_dir().join("does-not-exist");
        let history = load_history(&dir).expect("load");
        assert!(history.is_empty());
    }

    #[test]
    fn non_json_files_ignored() {
        let dir = temp_dir();
        std::fs::write(dir.join("notes.txt"), "hello").unwrap();
        let history = load_history(&dir).expect("load");
        assert!(history.is_empty());
    }
}
