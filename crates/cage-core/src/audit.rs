//! Append-only JSON-lines audit logger.
//!
//! Grounded in `skilllite/src/observability.rs`'s `append_jsonl` /
//! `get_audit_path`: the target directory is created on first use, each
//! record is serialized and appended as a single `writeln!`, and write
//! failures are logged but never change the caller's decision. Every call
//! also emits a `tracing` line, so that a missing/misconfigured log file
//! never loses observability entirely.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// One record describing the disposition of an intercepted outbound
/// request.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub timestamp: String,
    pub method: String,
    pub url: String,
    pub host: String,
    pub blocked: bool,
    pub reason: Option<String>,
    pub detected_secrets: Option<Vec<String>>,
    pub request_size: usize,
}

impl AuditEntry {
    /// Build an entry stamped with the current UTC time.
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        host: impl Into<String>,
        blocked: bool,
        reason: Option<String>,
        detected_secrets: Option<Vec<String>>,
        request_size: usize,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            method: method.into(),
            url: url.into(),
            host: host.into(),
            blocked,
            reason,
            detected_secrets,
            request_size,
        }
    }
}

/// Whole-line append writer. Cheap to clone: each append opens, writes,
/// and closes the file independently, so there is no shared file handle
/// for concurrent appenders to contend over and each write is a single
/// atomic `write(2)` of a complete line.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    path: PathBuf,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append `entry` to the log file and emit a matching tracing event.
    pub fn record(&self, entry: &AuditEntry) {
        if entry.blocked {
            tracing::warn!(
                method = %entry.method,
                url = %entry.url,
                host = %entry.host,
                reason = ?entry.reason,
                "proxy blocked request"
            );
        } else {
            tracing::info!(method = %entry.method, url = %entry.url, host = %entry.host, "proxy allowed request");
        }

        if let Err(err) = self.append(entry) {
            tracing::error!(error = %err, path = %self.path.display(), "failed to write audit log entry");
        }
    }

    fn append(&self, entry: &AuditEntry) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let line = serde_json::to_string(entry)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
