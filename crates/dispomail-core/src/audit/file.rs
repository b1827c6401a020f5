//! JSON-lines audit log
//!
//! One entry per line. Appends go straight to the end of the file;
//! deletions rewrite the file through a temporary file and a rename.
//!
//! Several processes may share one file. Every write holds a sidecar
//! `<file>.lock` created with `create_new`, and ids are taken from the
//! highest id on disk at append time.

use super::{AuditLog, AuditLogEntry, NewAuditEntry};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

/// How long a writer waits for the sidecar lock
const LOCK_WAIT: Duration = Duration::from_secs(5);
/// A lock file older than this is left over from a crashed writer
const LOCK_STALE: Duration = Duration::from_secs(30);
const LOCK_POLL: Duration = Duration::from_millis(10);

/// Audit log persisted as JSON lines
#[derive(Debug)]
pub struct FileAuditLog {
    path: PathBuf,
    lock_path: PathBuf,
    /// Highest id handed out by this handle
    last_id: Mutex<u64>,
}

impl FileAuditLog {
    /// Open a log file, creating parent directories as needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let last_id = read_entries(&path)?.iter().map(|e| e.id).max().unwrap_or(0);
        debug!(path = %path.display(), last_id, "Opened audit log");

        let mut lock_path = path.clone().into_os_string();
        lock_path.push(".lock");

        Ok(Self {
            path,
            lock_path: lock_path.into(),
            last_id: Mutex::new(last_id),
        })
    }

    /// Location of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_file(&self) -> Result<WriteLock> {
        WriteLock::acquire(&self.lock_path)
    }

    fn rewrite(&self, entries: &[AuditLogEntry]) -> Result<()> {
        let tmp = self
            .path
            .with_extension(format!("{:016x}.tmp", rand::random::<u64>()));

        let write = || -> Result<()> {
            let mut file = File::create(&tmp)?;
            for entry in entries {
                serde_json::to_writer(&mut file, entry)?;
                file.write_all(b"\n")?;
            }
            file.sync_all()?;
            std::fs::rename(&tmp, &self.path)?;
            Ok(())
        };

        write().map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            Error::AuditLog(format!("Failed to rewrite {}: {e}", self.path.display()))
        })
    }
}

impl AuditLog for FileAuditLog {
    fn append(&self, entry: NewAuditEntry) -> Result<u64> {
        let mut last_id = self.last_id.lock();
        let _file_lock = self.lock_file()?;

        let on_disk = read_entries(&self.path)?.iter().map(|e| e.id).max().unwrap_or(0);
        let id = on_disk.max(*last_id) + 1;

        let mut line = serde_json::to_string(&AuditLogEntry::assign(id, entry))?;
        line.push('\n');

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .map_err(|e| Error::AuditLog(format!("Failed to append to {}: {e}", self.path.display())))?;

        *last_id = id;
        Ok(id)
    }

    fn entries(&self) -> Result<Vec<AuditLogEntry>> {
        read_entries(&self.path)
    }

    fn delete_all(&self) -> Result<usize> {
        let _guard = self.last_id.lock();
        let _file_lock = self.lock_file()?;
        let removed = read_entries(&self.path)?.len();
        self.rewrite(&[])?;
        Ok(removed)
    }

    fn delete(&self, ids: &[u64]) -> Result<usize> {
        let _guard = self.last_id.lock();
        let _file_lock = self.lock_file()?;
        let mut entries = read_entries(&self.path)?;
        let before = entries.len();
        entries.retain(|e| !ids.contains(&e.id));

        let removed = before - entries.len();
        if removed > 0 {
            self.rewrite(&entries)?;
        }
        Ok(removed)
    }
}

/// Sidecar lock file, removed on drop
struct WriteLock {
    path: PathBuf,
}

impl WriteLock {
    fn acquire(path: &Path) -> Result<Self> {
        let deadline = Instant::now() + LOCK_WAIT;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(_) => {
                    return Ok(Self {
                        path: path.to_path_buf(),
                    })
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if is_stale(path) {
                        warn!(path = %path.display(), "Removing stale audit lock");
                        let _ = std::fs::remove_file(path);
                        continue;
                    }
                    if Instant::now() >= deadline {
                        return Err(Error::AuditLog(format!(
                            "Timed out waiting for {}",
                            path.display()
                        )));
                    }
                    thread::sleep(LOCK_POLL);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            debug!(path = %self.path.display(), error = %e, "Failed to remove audit lock");
        }
    }
}

fn is_stale(path: &Path) -> bool {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > LOCK_STALE)
}

fn read_entries(path: &Path) -> Result<Vec<AuditLogEntry>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut entries = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!(path = %path.display(), line = number + 1, error = %e, "Skipping bad audit line"),
        }
    }
    Ok(entries)
}
