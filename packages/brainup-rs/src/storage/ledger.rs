//! Durable expiry ledger.
//!
//! On disk the ledger is one JSON object. Top-level keys are either session
//! ids mapping to `{file_name: expiry}` or shared file names mapping directly
//! to an expiry:
//!
//! ```json
//! {
//!   "3f0c...": { "a1b2.edf": "2024-05-01T10:05:00Z" },
//!   "shared.png": "2024-05-02T10:00:00Z"
//! }
//! ```

use crate::error::{BrainupError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Expiry instant. Reads RFC 3339 and naive ISO-8601 (taken as UTC); writes
/// RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Expiry(pub DateTime<Utc>);

impl Serialize for Expiry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Expiry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw)
            .map(Expiry)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| raw.parse::<NaiveDateTime>().ok().map(|t| t.and_utc()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LedgerEntry {
    Session(BTreeMap<String, Expiry>),
    File(Expiry),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    Active,
    Expired,
}

/// One tracked file. `session` is `None` for files in the shared root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TempFileRecord {
    pub session: Option<String>,
    pub file_name: String,
    pub expires_at: DateTime<Utc>,
}

impl TempFileRecord {
    pub fn state(&self, now: DateTime<Utc>) -> RecordState {
        if now >= self.expires_at {
            RecordState::Expired
        } else {
            RecordState::Active
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    entries: BTreeMap<String, LedgerEntry>,
}

impl Ledger {
    /// Load from `path`; a missing file is an empty ledger.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read(path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Self::default()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                BrainupError::Ledger(format!("cannot parse {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Sibling file a save of `path` writes before renaming.
    pub fn temp_path(path: &Path) -> PathBuf {
        let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        path.with_file_name(name)
    }

    /// Write to a sibling temp file, fsync, then rename over `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        let tmp = Self::temp_path(path);
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_session(&self, id: &str) -> bool {
        matches!(self.entries.get(id), Some(LedgerEntry::Session(_)))
    }

    /// Register an empty file map for `id`; returns false if already known.
    pub fn ensure_session(&mut self, id: &str) -> Result<bool> {
        match self.entries.get(id) {
            Some(LedgerEntry::Session(_)) => Ok(false),
            Some(LedgerEntry::File(_)) => Err(BrainupError::Ledger(format!(
                "'{}' is registered as a shared file",
                id
            ))),
            None => {
                self.entries
                    .insert(id.to_string(), LedgerEntry::Session(BTreeMap::new()));
                Ok(true)
            }
        }
    }

    pub fn remove_session(&mut self, id: &str) -> bool {
        if self.has_session(id) {
            self.entries.remove(id);
            true
        } else {
            false
        }
    }

    pub fn session_is_empty(&self, id: &str) -> bool {
        matches!(self.entries.get(id), Some(LedgerEntry::Session(files)) if files.is_empty())
    }

    pub fn get(&self, session: Option<&str>, file_name: &str) -> Option<DateTime<Utc>> {
        match session {
            Some(id) => match self.entries.get(id) {
                Some(LedgerEntry::Session(files)) => files.get(file_name).map(|e| e.0),
                _ => None,
            },
            None => match self.entries.get(file_name) {
                Some(LedgerEntry::File(expiry)) => Some(expiry.0),
                _ => None,
            },
        }
    }

    /// Insert or refresh a record. A session's map is created on demand.
    pub fn insert(&mut self, session: Option<&str>, file_name: &str, expires_at: DateTime<Utc>) -> Result<()> {
        match session {
            Some(id) => {
                self.ensure_session(id)?;
                if let Some(LedgerEntry::Session(files)) = self.entries.get_mut(id) {
                    files.insert(file_name.to_string(), Expiry(expires_at));
                }
            }
            None => {
                if self.has_session(file_name) {
                    return Err(BrainupError::Ledger(format!(
                        "'{}' is registered as a session",
                        file_name
                    )));
                }
                self.entries
                    .insert(file_name.to_string(), LedgerEntry::File(Expiry(expires_at)));
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, session: Option<&str>, file_name: &str) -> Option<DateTime<Utc>> {
        match session {
            Some(id) => match self.entries.get_mut(id) {
                Some(LedgerEntry::Session(files)) => files.remove(file_name).map(|e| e.0),
                _ => None,
            },
            None => match self.entries.get(file_name) {
                Some(LedgerEntry::File(_)) => match self.entries.remove(file_name) {
                    Some(LedgerEntry::File(expiry)) => Some(expiry.0),
                    _ => None,
                },
                _ => None,
            },
        }
    }

    /// Flattened snapshot of every record.
    pub fn records(&self) -> Vec<TempFileRecord> {
        self.entries
            .iter()
            .flat_map(|(key, entry)| match entry {
                LedgerEntry::Session(files) => files
                    .iter()
                    .map(|(name, expiry)| TempFileRecord {
                        session: Some(key.clone()),
                        file_name: name.clone(),
                        expires_at: expiry.0,
                    })
                    .collect::<Vec<_>>(),
                LedgerEntry::File(expiry) => vec![TempFileRecord {
                    session: None,
                    file_name: key.clone(),
                    expires_at: expiry.0,
                }],
            })
            .collect()
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, e)| matches!(e, LedgerEntry::Session(_)))
            .map(|(k, _)| k.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_reads_naive_and_offset_timestamps() {
        let json = r#"{
            "sess-1": {"a.edf": "2024-05-01T10:05:00.250000", "b.csv": "2024-05-01T10:05:00+00:00"},
            "shared.png": "2024-05-02T10:00:00"
        }"#;
        let ledger: Ledger = serde_json::from_str(json).unwrap();
        let records = ledger.records();
        assert_eq!(records.len(), 3);

        let expected = Utc.with_ymd_and_hms(2024, 5, 2, 10, 0, 0).unwrap();
        assert_eq!(ledger.get(None, "shared.png"), Some(expected));
        assert!(ledger.get(Some("sess-1"), "a.edf").is_some());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("temp_files.json");

        let mut ledger = Ledger::default();
        ledger.ensure_session("s1").unwrap();
        ledger.insert(Some("s1"), "x.edf", at(60)).unwrap();
        ledger.insert(None, "y.png", at(120)).unwrap();
        ledger.save(&path).unwrap();

        assert!(!Ledger::temp_path(&path).exists());
        assert_eq!(Ledger::load(&path).unwrap(), ledger);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        assert!(Ledger::load(&dir.path().join("none.json")).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("temp_files.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Ledger::load(&path), Err(BrainupError::Ledger(_))));
    }

    #[test]
    fn test_refresh_and_remove() {
        let mut ledger = Ledger::default();
        ledger.insert(Some("s"), "f.csv", at(0)).unwrap();
        ledger.insert(Some("s"), "f.csv", at(300)).unwrap();
        assert_eq!(ledger.records().len(), 1);
        assert_eq!(ledger.get(Some("s"), "f.csv"), Some(at(300)));

        assert_eq!(ledger.remove(Some("s"), "f.csv"), Some(at(300)));
        assert!(ledger.session_is_empty("s"));
        assert!(ledger.remove_session("s"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_session_and_file_names_do_not_collide() {
        let mut ledger = Ledger::default();
        ledger.ensure_session("abc").unwrap();
        assert!(ledger.insert(None, "abc", at(0)).is_err());
        assert_eq!(ledger.remove(None, "abc"), None);
        assert!(ledger.has_session("abc"));
    }

    #[test]
    fn test_record_state() {
        let record = TempFileRecord {
            session: None,
            file_name: "a".into(),
            expires_at: at(10),
        };
        assert_eq!(record.state(at(9)), RecordState::Active);
        assert_eq!(record.state(at(10)), RecordState::Expired);
        assert_eq!(record.state(at(10) + Duration::seconds(1)), RecordState::Expired);
    }
}
