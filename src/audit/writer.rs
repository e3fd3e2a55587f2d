//! Daily-rotating JSONL sink for lifecycle audit entries.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDate;

use super::{AuditEntry, AuditLogger};
use crate::config::GlobalConfig;
use crate::{AppError, Result};

/// The open file for one calendar day.
struct Sink {
    date: NaiveDate,
    out: BufWriter<File>,
}

/// Appends one JSON object per line to `<dir>/audit-<date>.jsonl`.
///
/// Rotation keys off each entry's own timestamp rather than the wall
/// clock at write time, so a backfilled entry lands in the file for the
/// day it describes. Entries are serialized before the sink is touched;
/// an unserializable entry never rotates or dirties a file.
pub struct JsonlAuditWriter {
    dir: PathBuf,
    sink: Mutex<Option<Sink>>,
}

impl JsonlAuditWriter {
    /// Construct a writer that appends under `dir`, creating it and any
    /// missing parents.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the directory cannot be created.
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).map_err(|err| {
            AppError::Io(format!("cannot create audit dir {}: {err}", dir.display()))
        })?;
        Ok(Self {
            dir,
            sink: Mutex::new(None),
        })
    }

    /// Construct a writer over the configured audit log directory.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the directory cannot be created.
    pub fn from_config(config: &GlobalConfig) -> Result<Self> {
        Self::new(config.audit_log_dir.clone())
    }

    fn open_sink(dir: &Path, date: NaiveDate) -> Result<Sink> {
        let path = dir.join(format!("audit-{date}.jsonl"));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| AppError::Io(format!("cannot open {}: {err}", path.display())))?;
        Ok(Sink {
            date,
            out: BufWriter::new(file),
        })
    }
}

impl AuditLogger for JsonlAuditWriter {
    fn log_entry(&self, entry: AuditEntry) -> Result<()> {
        let date = entry.timestamp.date_naive();
        let line = serde_json::to_string(&entry)
            .map_err(|err| AppError::Io(format!("unserializable audit entry: {err}")))?;

        let mut guard = self
            .sink
            .lock()
            .map_err(|_| AppError::Io("audit sink mutex poisoned".to_owned()))?;

        if !guard.as_ref().is_some_and(|sink| sink.date == date) {
            *guard = Some(Self::open_sink(&self.dir, date)?);
        }
        if let Some(sink) = guard.as_mut() {
            writeln!(sink.out, "{line}")
                .map_err(|err| AppError::Io(format!("audit append failed: {err}")))?;
            sink.out
                .flush()
                .map_err(|err| AppError::Io(format!("audit flush failed: {err}")))?;
        }

        Ok(())
    }
}
