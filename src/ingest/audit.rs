//! Append-only audit log
//!
//! One line per event, prefixed with a local timestamp and the stream tag:
//!
//! ```text
//! 2026-10-19 10:15:02.123 PERSON_LOG: created node 42
//! ```
//!
//! Lines are written with a single `write_all` under a lock and flushed
//! immediately, so concurrent writers never interleave within a line.

use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

/// Audit log errors
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Cannot open audit log {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot append to audit log: {0}")]
    Write(#[from] io::Error),
}

pub type AuditResult<T> = Result<T, AuditError>;

pub struct AuditLog {
    tag: String,
    path: PathBuf,
    file: Mutex<File>,
}

impl AuditLog {
    /// Open (or create) the log at `path`, appending to any existing content.
    /// Missing parent directories are created.
    pub fn open(path: impl AsRef<Path>, tag: impl Into<String>) -> AuditResult<Self> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source| AuditError::Open {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(open_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(open_err)?;

        debug!("Opened audit log {:?}", path);
        Ok(Self {
            tag: tag.into(),
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line
    pub fn try_record(&self, message: impl Display) -> AuditResult<()> {
        let line = format!(
            "{} {}: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            self.tag,
            message
        );
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Append one line; a failed append is traced, never raised
    pub fn record(&self, message: impl Display) {
        if let Err(e) = self.try_record(message) {
            warn!("Audit log {:?} write failed: {}", self.path, e);
        }
    }
}
