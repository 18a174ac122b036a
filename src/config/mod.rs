//! Resolved run configuration.
//!
//! A [`RunConfig`] is built once at startup from the command line and the
//! optional `asmqc.toml`, validated, and then passed by reference to every
//! component. Nothing reads configuration from ambient state.

mod loader;

pub use loader::{
    discover_config, load_config_from_path, parse_config, FileConfig, CONFIG_FILE_NAME,
};

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{Error, Result};

pub const DEFAULT_MIN_CONTIG: u64 = 500;
pub const DEFAULT_CONTIG_THRESHOLDS: &[u64] = &[0, 1000];
pub const DEFAULT_ORF_LENGTHS: &[u64] = &[600, 1500, 3000];
pub const DEFAULT_GENE_LENGTHS: &[u64] = &[0, 300, 1500, 3000];
pub const DEFAULT_ARCHIVE_DIR: &str = "archive";

/// Locations of the external programs used by the stages.
///
/// Unset entries fall back to the conventional program name looked up on
/// `PATH` when the stage runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolPaths {
    #[serde(default)]
    pub nucmer: Option<PathBuf>,
    #[serde(default)]
    pub show_coords: Option<PathBuf>,
    #[serde(default)]
    pub mauve: Option<PathBuf>,
    #[serde(default)]
    pub genemark: Option<PathBuf>,
    #[serde(default)]
    pub genemark_model: Option<PathBuf>,
    #[serde(default)]
    pub gage: Option<PathBuf>,
}

/// Everything a run needs to know, resolved and validated.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Input assemblies in command-line order
    pub contigs: Vec<PathBuf>,
    /// Explicit results directory; `None` means a timestamped default
    pub output_dir: Option<PathBuf>,
    pub reference: Option<PathBuf>,
    pub genes: Option<PathBuf>,
    pub operons: Option<PathBuf>,
    pub min_contig: u64,
    pub contig_thresholds: Vec<u64>,
    pub orf_lengths: Vec<u64>,
    pub gene_lengths: Vec<u64>,
    /// Run the comparative whole-genome alignment stage
    pub with_mauve: bool,
    /// Legacy comparison-only mode; also disables min-length filtering
    pub comparison_mode: bool,
    pub circular: bool,
    /// Count reverse-complement placements as misassemblies
    pub count_rc_misassemblies: bool,
    pub with_genemark: bool,
    pub extra_report: bool,
    pub save_archive: bool,
    pub archive_dir: PathBuf,
    pub tools: ToolPaths,
}

impl RunConfig {
    /// Configuration with built-in defaults for the given inputs.
    pub fn new(contigs: Vec<PathBuf>) -> Self {
        Self {
            contigs,
            output_dir: None,
            reference: None,
            genes: None,
            operons: None,
            min_contig: DEFAULT_MIN_CONTIG,
            contig_thresholds: DEFAULT_CONTIG_THRESHOLDS.to_vec(),
            orf_lengths: DEFAULT_ORF_LENGTHS.to_vec(),
            gene_lengths: DEFAULT_GENE_LENGTHS.to_vec(),
            with_mauve: false,
            comparison_mode: false,
            circular: true,
            count_rc_misassemblies: true,
            with_genemark: false,
            extra_report: false,
            save_archive: false,
            archive_dir: PathBuf::from(DEFAULT_ARCHIVE_DIR),
            tools: ToolPaths::default(),
        }
    }

    /// Apply file-level defaults for anything not already overridden.
    pub fn with_file_defaults(mut self, file: FileConfig) -> Self {
        if let Some(min_contig) = file.min_contig {
            self.min_contig = min_contig;
        }
        if let Some(thresholds) = file.contig_thresholds {
            self.contig_thresholds = thresholds;
        }
        if let Some(lengths) = file.orf_lengths {
            self.orf_lengths = lengths;
        }
        if let Some(lengths) = file.gene_lengths {
            self.gene_lengths = lengths;
        }
        if let Some(dir) = file.archive_dir {
            self.archive_dir = dir;
        }
        self.tools = file.tools;
        self
    }

    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// The `latest` link is only maintained for timestamped directories.
    pub fn make_latest_symlink(&self) -> bool {
        self.output_dir.is_none()
    }

    /// Minimum contig length actually applied by the sanitizer.
    pub fn effective_min_contig(&self) -> Option<u64> {
        (!self.comparison_mode).then_some(self.min_contig)
    }

    /// Check option consistency (exit 1 class errors).
    pub fn validate(&self) -> Result<()> {
        if self.contigs.is_empty() {
            return Err(Error::Usage("No contig files given".into()));
        }
        if self.contig_thresholds.is_empty() {
            return Err(Error::Config(
                "contig thresholds must contain at least one value".into(),
            ));
        }
        if self.comparison_mode && self.reference.is_none() {
            return Err(Error::Usage(
                "--gage requires a reference genome (-R/--reference)".into(),
            ));
        }
        let lists = [
            ("contig thresholds", &self.contig_thresholds),
            ("ORF lengths", &self.orf_lengths),
            ("gene lengths", &self.gene_lengths),
        ];
        for (what, values) in lists {
            if let Some(value) = first_duplicate(values) {
                return Err(Error::Usage(format!("{} contain {} more than once", what, value)));
            }
        }
        Ok(())
    }

    /// Drop repeated list entries, keeping the first occurrence of each.
    pub fn dedup_lists(mut self) -> Self {
        self.contig_thresholds = dedup_in_order(self.contig_thresholds);
        self.orf_lengths = dedup_in_order(self.orf_lengths);
        self.gene_lengths = dedup_in_order(self.gene_lengths);
        self
    }

    /// Check every named input exists (exit 2 class errors).
    pub fn check_files(&self) -> Result<()> {
        let named = [
            ("reference", self.reference.as_deref()),
            ("genes", self.genes.as_deref()),
            ("operons", self.operons.as_deref()),
        ];
        for (what, path) in named {
            if let Some(path) = path {
                check_file(path, what)?;
            }
        }
        for path in &self.contigs {
            check_file(path, "contigs")?;
        }
        Ok(())
    }
}

/// `values` without repeats, in first-occurrence order.
pub fn dedup_in_order(values: Vec<u64>) -> Vec<u64> {
    let mut seen = HashSet::new();
    values.into_iter().filter(|v| seen.insert(*v)).collect()
}

fn first_duplicate(values: &[u64]) -> Option<u64> {
    let mut seen = HashSet::new();
    values.iter().copied().find(|v| !seen.insert(*v))
}

fn check_file(path: &Path, what: &'static str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::FileNotFound {
            what,
            path: path.to_path_buf(),
        })
    }
}
