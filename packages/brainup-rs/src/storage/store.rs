use super::ledger::{Ledger, TempFileRecord};
use super::payload::Payload;
use crate::config::StoreConfig;
use crate::error::{BrainupError, Result};
use crate::file_readers::{decode_file, DecodeOptions};
use crate::types::SignalMatrix;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Lifetime class of a persisted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactClass {
    /// Raw uploads, kept briefly.
    Upload,
    /// Exports and rendered images, kept for a day by default.
    Derived,
}

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub files_removed: usize,
    pub records_dropped: usize,
    pub sessions_purged: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.records_dropped == 0 && self.sessions_purged == 0
    }
}

/// Temporary file store with a durable expiry ledger.
///
/// Every mutation of files plus ledger runs under `gate`, so a sweep never
/// observes a file without its record or a record mid-write.
pub struct SessionStore {
    config: StoreConfig,
    ledger_path: PathBuf,
    gate: Mutex<()>,
    ledger: RwLock<Ledger>,
}

/// Accept a single, plain path component.
pub fn validate_component(name: &str) -> Result<&str> {
    let ok = !name.is_empty()
        && name.len() <= 255
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0']);
    if ok {
        Ok(name)
    } else {
        Err(BrainupError::InvalidName(name.to_string()))
    }
}

fn remove_if_exists(path: &Path) -> std::io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

impl SessionStore {
    /// Create the data directory and load (or start) the ledger.
    pub fn open(config: StoreConfig) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        let ledger_path = config.ledger_path();
        if let Some(parent) = ledger_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let ledger = Ledger::load(&ledger_path)?;
        if !ledger_path.exists() {
            ledger.save(&ledger_path)?;
        }

        log::info!(
            "Opened session store at {} ({} tracked files)",
            config.data_dir.display(),
            ledger.records().len()
        );

        Ok(Self {
            config,
            ledger_path,
            gate: Mutex::new(()),
            ledger: RwLock::new(ledger),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    pub fn session_dir(&self, id: &str) -> Result<PathBuf> {
        Ok(self.config.data_dir.join(validate_component(id)?))
    }

    /// Where `file_name` lives for `session` (or the shared root).
    pub fn path_for(&self, file_name: &str, session: Option<&str>) -> Result<PathBuf> {
        validate_component(file_name)?;
        match session {
            Some(id) => Ok(self.session_dir(id)?.join(file_name)),
            None => Ok(self.config.data_dir.join(file_name)),
        }
    }

    fn ttl(&self, class: ArtifactClass) -> chrono::Duration {
        let secs = match class {
            ArtifactClass::Upload => self.config.upload_ttl_secs,
            ArtifactClass::Derived => self.config.artifact_ttl_secs,
        };
        chrono::Duration::seconds(secs.min(i64::MAX as u64) as i64)
    }

    /// Persist the in-memory ledger, restoring `previous` if that fails.
    fn commit(&self, previous: Ledger) -> Result<()> {
        let mut ledger = self.ledger.write();
        if let Err(e) = ledger.save(&self.ledger_path) {
            log::error!("Ledger flush failed, rolling back: {}", e);
            *ledger = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Reuse `existing` or mint a new session id; returns its directory and id.
    pub fn create_session(&self, existing: Option<&str>) -> Result<(PathBuf, String)> {
        let id = match existing {
            Some(id) => validate_component(id)?.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        };
        let dir = self.session_dir(&id)?;

        let _gate = self.gate.lock();
        fs::create_dir_all(&dir)?;

        let previous = self.ledger.read().clone();
        let registered = self.ledger.write().ensure_session(&id)?;
        if registered {
            self.commit(previous)?;
            log::info!("Created session {}", id);
        } else {
            log::debug!("Reusing session {}", id);
        }

        Ok((dir, id))
    }

    /// Write `payload` and record its expiry. The file and its record appear
    /// together or not at all.
    pub fn persist(
        &self,
        payload: Payload,
        file_name: &str,
        session: Option<&str>,
        class: ArtifactClass,
    ) -> Result<PathBuf> {
        let path = self.path_for(file_name, session)?;
        if path == self.ledger_path || path == Ledger::temp_path(&self.ledger_path) {
            return Err(BrainupError::InvalidName(file_name.to_string()));
        }
        let bytes = payload.into_bytes()?;

        let _gate = self.gate.lock();

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let previous_bytes = match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = write_synced(&path, &bytes) {
            self.restore_file(&path, previous_bytes.as_deref());
            return Err(e.into());
        }

        let settle = self.config.settle_delay();
        if !settle.is_zero() {
            std::thread::sleep(settle);
        }

        let expires_at = Utc::now() + self.ttl(class);
        let previous = self.ledger.read().clone();
        let updated = self.ledger.write().insert(session, file_name, expires_at);
        let committed = updated.and_then(|_| self.commit(previous.clone()));

        if let Err(e) = committed {
            *self.ledger.write() = previous;
            self.restore_file(&path, previous_bytes.as_deref());
            return Err(e);
        }

        log::info!(
            "Persisted {} ({} bytes, {:?}) until {}",
            path.display(),
            bytes.len(),
            class,
            expires_at.to_rfc3339()
        );
        Ok(path)
    }

    fn restore_file(&self, path: &Path, previous: Option<&[u8]>) {
        let restored = match previous {
            Some(bytes) => write_synced(path, bytes),
            None => remove_if_exists(path).map(|_| ()),
        };
        if let Err(e) = restored {
            log::error!("Could not roll back {}: {}", path.display(), e);
        }
    }

    pub fn read_bytes(&self, file_name: &str, session: Option<&str>) -> Result<Vec<u8>> {
        let path = self.path_for(file_name, session)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BrainupError::FileNotFound(path)),
            Err(e) => Err(e.into()),
        }
    }

    pub fn load(&self, file_name: &str, session: Option<&str>) -> Result<SignalMatrix> {
        self.load_with(file_name, session, &DecodeOptions::default())
    }

    /// Read a stored recording and decode it by extension.
    pub fn load_with(&self, file_name: &str, session: Option<&str>, options: &DecodeOptions) -> Result<SignalMatrix> {
        let bytes = self.read_bytes(file_name, session)?;
        decode_file(&bytes, file_name, options)
    }

    /// Remove a file and its record together. Returns whether anything was
    /// tracked or present.
    pub fn delete(&self, file_name: &str, session: Option<&str>) -> Result<bool> {
        let path = self.path_for(file_name, session)?;
        let _gate = self.gate.lock();

        let removed_file = remove_if_exists(&path)?;
        let previous = self.ledger.read().clone();
        let removed_record = self.ledger.write().remove(session, file_name).is_some();
        if removed_record {
            self.commit(previous)?;
        }

        if removed_file || removed_record {
            log::info!("Deleted {}", path.display());
        }
        Ok(removed_file || removed_record)
    }

    /// Remove a session directory and its ledger key.
    pub fn teardown_session(&self, id: &str) -> Result<()> {
        let dir = self.session_dir(id)?;
        let _gate = self.gate.lock();

        match fs::remove_dir_all(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let previous = self.ledger.read().clone();
        if self.ledger.write().remove_session(id) {
            self.commit(previous)?;
        }
        log::info!("Tore down session {}", id);
        Ok(())
    }

    pub fn records(&self) -> Vec<TempFileRecord> {
        self.ledger.read().records()
    }

    pub fn expiry(&self, file_name: &str, session: Option<&str>) -> Option<DateTime<Utc>> {
        self.ledger.read().get(session, file_name)
    }

    pub fn has_session(&self, id: &str) -> bool {
        self.ledger.read().has_session(id)
    }

    pub fn sweep(&self) -> Result<SweepReport> {
        self.sweep_at(Utc::now())
    }

    /// One expiry pass as of `now`, run under the gate.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let _gate = self.gate.lock();
        let mut report = SweepReport::default();

        let expired: Vec<TempFileRecord> = self
            .ledger
            .read()
            .records()
            .into_iter()
            .filter(|r| now >= r.expires_at)
            .collect();
        if expired.is_empty() {
            return Ok(report);
        }

        let previous = self.ledger.read().clone();
        let mut touched_sessions: Vec<String> = Vec::new();
        {
            let mut ledger = self.ledger.write();
            for record in &expired {
                let path = match self.path_for(&record.file_name, record.session.as_deref()) {
                    Ok(path) => path,
                    Err(e) => {
                        log::warn!("Skipping unusable ledger record: {}", e);
                        continue;
                    }
                };
                match remove_if_exists(&path) {
                    Ok(true) => report.files_removed += 1,
                    Ok(false) => log::debug!("Expired file {} already gone", path.display()),
                    Err(e) => {
                        log::warn!("Could not remove expired {}: {}", path.display(), e);
                        continue;
                    }
                }
                ledger.remove(record.session.as_deref(), &record.file_name);
                report.records_dropped += 1;
                if let Some(id) = &record.session {
                    if !touched_sessions.contains(id) {
                        touched_sessions.push(id.clone());
                    }
                }
            }

            for id in touched_sessions {
                if !ledger.session_is_empty(&id) {
                    continue;
                }
                let dir = self.config.data_dir.join(&id);
                match fs::remove_dir_all(&dir) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => {
                        log::warn!("Could not purge session dir {}: {}", dir.display(), e);
                        continue;
                    }
                }
                ledger.remove_session(&id);
                report.sessions_purged += 1;
            }
        }

        if !report.is_empty() {
            self.commit(previous)?;
            log::info!(
                "Sweep removed {} files, dropped {} records, purged {} sessions",
                report.files_removed,
                report.records_dropped,
                report.sessions_purged
            );
        }
        Ok(report)
    }
}
