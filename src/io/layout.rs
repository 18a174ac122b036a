use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{IoContext, Result};

pub const LOG_FILE: &str = "asmqc.log";
pub const CORRECTED_DIR: &str = "corrected_input";
pub const ROW_MAJOR_REPORT: &str = "report";
pub const COLUMN_MAJOR_REPORT: &str = "transposed_report";
pub const EXTRA_REPORT: &str = "extra_report.txt";
pub const COMPARISON_REPORT: &str = "gage_report.txt";
pub const ARCHIVE_REPORT: &str = "report.json";
pub const ARCHIVE_EXTRA_REPORT: &str = "extra_report.json";

/// File and directory names inside one run's results directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
    archive: Option<PathBuf>,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>, archive: Option<PathBuf>) -> Self {
        Self {
            root: root.into(),
            archive,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Archive directory of this run, when archival export is enabled.
    pub fn archive(&self) -> Option<&Path> {
        self.archive.as_deref()
    }

    pub fn log_file(&self) -> PathBuf {
        self.root.join(LOG_FILE)
    }

    pub fn corrected_dir(&self) -> PathBuf {
        self.root.join(CORRECTED_DIR)
    }

    /// Per-stage working directory, created on demand.
    pub fn stage_dir(&self, name: &str) -> Result<PathBuf> {
        let dir = self.root.join(name);
        fs::create_dir_all(&dir).with_path("Cannot create stage directory", &dir)?;
        Ok(dir)
    }

    /// Row-major report path without extension (`.txt`/`.tsv` appended).
    pub fn row_major_report(&self) -> PathBuf {
        self.root.join(ROW_MAJOR_REPORT)
    }

    pub fn column_major_report(&self) -> PathBuf {
        self.root.join(COLUMN_MAJOR_REPORT)
    }

    pub fn extra_report(&self) -> PathBuf {
        self.root.join(EXTRA_REPORT)
    }

    pub fn comparison_report(&self) -> PathBuf {
        self.root.join(COMPARISON_REPORT)
    }
}

/// `base` with an extra extension appended (`report` → `report.txt`).
pub fn with_extension(base: &Path, ext: &str) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Corrected-input directory that is removed when the run ends.
///
/// [`ScratchDir::release`] removes it and reports failures; dropping the
/// guard without releasing removes it best-effort.
#[derive(Debug)]
pub struct ScratchDir {
    path: Option<PathBuf>,
}

impl ScratchDir {
    /// Create `path` from scratch, discarding any previous contents.
    pub fn create(path: PathBuf) -> Result<Self> {
        if path.is_dir() {
            fs::remove_dir_all(&path).with_path("Cannot clear directory", &path)?;
        }
        fs::create_dir_all(&path).with_path("Cannot create directory", &path)?;
        Ok(Self { path: Some(path) })
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    pub fn release(mut self) -> Result<()> {
        match self.path.take() {
            Some(path) if path.exists() => {
                fs::remove_dir_all(&path).with_path("Cannot remove directory", &path)
            }
            _ => Ok(()),
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = fs::remove_dir_all(&path) {
                tracing::debug!("Best-effort cleanup of {} failed: {}", path.display(), e);
            }
        }
    }
}
