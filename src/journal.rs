//! Per-batch log emitter.
//!
//! A [`Journal`] is opened when a generator is built and flushed when the
//! batch ends. Every entry goes to the console through `tracing` and, when a
//! log directory was given, to a timestamped file in that directory.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{Level, debug, error, info, warn};

use crate::error::CeramicsError;

/// Console and file log for one generator.
#[derive(Debug, Default)]
pub struct Journal {
    path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
}

impl Journal {
    /// Open `<log_dir>/ceramic_generation_<timestamp>.log`, creating the directory.
    pub fn open(log_dir: &Path) -> Result<Self, CeramicsError> {
        fs::create_dir_all(log_dir)?;
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = log_dir.join(format!("ceramic_generation_{timestamp}.log"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!("Journal opened at {}", path.display());
        Ok(Self {
            path: Some(path),
            writer: Some(BufWriter::new(file)),
        })
    }

    /// A journal that only logs to the console.
    pub fn console_only() -> Self {
        Self::default()
    }

    /// The log file, if there is one.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record a debug entry.
    pub fn debug(&mut self, message: impl AsRef<str>) {
        self.record(Level::DEBUG, message.as_ref());
    }

    /// Record an info entry.
    pub fn info(&mut self, message: impl AsRef<str>) {
        self.record(Level::INFO, message.as_ref());
    }

    /// Record a warning.
    pub fn warn(&mut self, message: impl AsRef<str>) {
        self.record(Level::WARN, message.as_ref());
    }

    /// Record an error.
    pub fn error(&mut self, message: impl AsRef<str>) {
        self.record(Level::ERROR, message.as_ref());
    }

    fn record(&mut self, level: Level, message: &str) {
        match level {
            Level::ERROR => error!("{message}"),
            Level::WARN => warn!("{message}"),
            Level::INFO => info!("{message}"),
            _ => debug!("{message}"),
        }

        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S,%3f");
        if let Err(err) = writeln!(writer, "{timestamp} - {level} - {message}") {
            // Keep going on the console rather than failing the batch.
            error!("Failed to write journal entry, disabling file log: {err}");
            self.writer = None;
        }
    }

    /// Flush buffered entries to disk.
    ///
    /// A failed flush is reported on the console and the file log is
    /// dropped; the batch it belongs to is unaffected.
    pub fn finish(&mut self) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        if let Err(err) = writer.flush() {
            error!("Failed to flush journal, disabling file log: {err}");
            self.writer = None;
        }
    }
}

impl Drop for Journal {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_land_in_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log_dir = dir.path().join("nested").join("logs");
        let mut journal = Journal::open(&log_dir).expect("open journal");
        journal.info("Starting batch generation of 3 images");
        journal.warn("Rate limit reached. Waiting...");
        journal.error("Authentication failed");
        journal.finish();

        let path = journal.path().expect("file journal").to_path_buf();
        let name = path.file_name().and_then(|n| n.to_str()).expect("file name");
        assert!(name.starts_with("ceramic_generation_"));
        assert!(name.ends_with(".log"));

        let contents = std::fs::read_to_string(&path).expect("read journal");
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with(" - INFO - Starting batch generation of 3 images"));
        assert!(lines[1].contains(" - WARN - "));
        assert!(lines[2].ends_with(" - ERROR - Authentication failed"));
    }

    #[test]
    fn console_only_has_no_file() {
        let mut journal = Journal::console_only();
        journal.info("hello");
        assert!(journal.path().is_none());
        journal.finish();
        assert!(journal.writer.is_none());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn failed_flush_disables_the_file_log() {
        let file = OpenOptions::new()
            .write(true)
            .open("/dev/full")
            .expect("open /dev/full");
        let mut journal = Journal {
            path: Some(PathBuf::from("/dev/full")),
            writer: Some(BufWriter::new(file)),
        };
        journal.info("Batch finished: 3 image(s) saved, 0 item(s) skipped");
        journal.finish();
        assert!(journal.writer.is_none());
        journal.info("still logging to the console");
        journal.finish();
    }
}
