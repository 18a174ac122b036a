//! Stage abstraction for the evaluation pipeline.
//!
//! A stage declares what it needs (its dependencies and an applicability
//! predicate over the run configuration) and produces a block of report
//! columns. Stages never touch the report table directly: the scheduler
//! merges their [`StageOutput`] with the strict key-set check.

use std::collections::HashMap;
use std::fmt;

use super::context::RunContext;
use crate::config::RunConfig;
use crate::errors::Result;
use crate::observability::RunLog;
use crate::report::{ReportTable, Value};

/// Identifies what a stage does, independent of its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    BasicStats,
    Alignment,
    AlignedStats,
    GenomeAnalysis,
    ComparativeAlignment,
    OrfSearch,
    GenePrediction,
    Report,
    ExtraReport,
    Comparison,
}

impl StageKind {
    /// Directory name used for the stage's files inside the run directory.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::BasicStats => "basic_stats",
            Self::Alignment => "alignment",
            Self::AlignedStats => "aligned_stats",
            Self::GenomeAnalysis => "genome_analysis",
            Self::ComparativeAlignment => "mauve",
            Self::OrfSearch => "orfs",
            Self::GenePrediction => "genemark",
            Self::Report => "report",
            Self::ExtraReport => "extra_report",
            Self::Comparison => "gage",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Columns contributed by one stage, with values for every assembly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageOutput {
    pub columns: Vec<String>,
    pub values: HashMap<String, Vec<Value>>,
}

impl StageOutput {
    /// An output that adds nothing to the table.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_columns<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            values: HashMap::new(),
        }
    }

    /// Record the values of one assembly.
    pub fn insert(&mut self, identity: impl Into<String>, values: Vec<Value>) {
        self.values.insert(identity.into(), values);
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// One unit of the evaluation pipeline.
pub trait Stage {
    fn kind(&self) -> StageKind;

    /// Name for progress reporting.
    fn name(&self) -> String {
        self.kind().dir_name().to_string()
    }

    /// Stages that must have completed before this one may run.
    fn dependencies(&self) -> &'static [StageKind] {
        &[]
    }

    /// Decided from the configuration alone, before the stage is invoked.
    fn is_applicable(&self, config: &RunConfig) -> bool;

    fn run(
        &self,
        ctx: &mut RunContext<'_>,
        table: &ReportTable,
        log: &mut RunLog,
    ) -> Result<StageOutput>;
}
