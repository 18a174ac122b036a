//! Duplicated console/log-file output for a single run.
//!
//! Every progress line the operator would normally see is written both to
//! the console and to the run's log file. The sink is created once the
//! results directory exists, injected (`&mut RunLog`) into every component
//! that prints, and released deterministically: explicitly through
//! [`RunLog::close`] at the end of the run, or by `Drop` on every other
//! exit path.

use std::fmt::Display;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::errors::{IoContext, Result};

/// Console + file line sink.
pub struct RunLog {
    file: Option<BufWriter<File>>,
    path: Option<PathBuf>,
    console: bool,
    captured: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Info,
    Warn,
    Error,
}

impl RunLog {
    /// Open the log at `path`, removing any previous log there first.
    pub fn create(path: &Path) -> Result<Self> {
        if path.is_file() {
            fs::remove_file(path).with_path("Cannot remove old log", path)?;
        }
        let file = File::create(path).with_path("Cannot create log file", path)?;
        Ok(Self {
            file: Some(BufWriter::new(file)),
            path: Some(path.to_path_buf()),
            console: true,
            captured: None,
        })
    }

    /// In-memory sink that prints nothing; lines are kept for inspection.
    pub fn sink() -> Self {
        Self {
            file: None,
            path: None,
            console: false,
            captured: Some(Vec::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Lines recorded by a [`RunLog::sink`].
    pub fn lines(&self) -> &[String] {
        self.captured.as_deref().unwrap_or(&[])
    }

    pub fn info(&mut self, line: impl Display) {
        self.emit(Level::Info, &line.to_string());
    }

    pub fn warn(&mut self, line: impl Display) {
        self.emit(Level::Warn, &line.to_string());
    }

    pub fn error(&mut self, line: impl Display) {
        self.emit(Level::Error, &line.to_string());
    }

    pub fn blank(&mut self) {
        self.emit(Level::Info, "");
    }

    /// Flush and release the log file, restoring console-only output.
    pub fn close(mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            let result = file.flush();
            if let Some(path) = &self.path {
                result.with_path("Cannot flush log file", path)?;
            }
        }
        Ok(())
    }

    fn emit(&mut self, level: Level, line: &str) {
        if self.console {
            match level {
                Level::Info => println!("{}", line),
                Level::Warn => eprintln!("{}", line.yellow()),
                Level::Error => eprintln!("{}", line.red()),
            }
        }

        if let Some(captured) = self.captured.as_mut() {
            captured.push(line.to_string());
        }

        if let Some(file) = self.file.as_mut() {
            if let Err(e) = writeln!(file, "{}", line) {
                // Keep the console going; the log is no longer trustworthy.
                tracing::warn!("Log file write failed, continuing on console only: {}", e);
                self.file = None;
            }
        }
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        if let Some(file) = self.file.as_mut() {
            let _ = file.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sink_captures_lines() {
        let mut log = RunLog::sink();
        log.info("Correcting contig files...");
        log.warn("Warning!");
        log.blank();
        assert_eq!(log.lines(), ["Correcting contig files...", "Warning!", ""]);
    }

    #[test]
    fn test_create_truncates_previous_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("asmqc.log");
        fs::write(&path, "stale line\n").unwrap();

        let mut log = RunLog::create(&path).unwrap();
        log.info("fresh");
        log.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh\n");
    }

    #[test]
    fn test_drop_flushes_on_early_exit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("asmqc.log");
        {
            let mut log = RunLog::create(&path).unwrap();
            log.error("fatal");
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "fatal\n");
    }
}
