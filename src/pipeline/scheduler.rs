//! Ordered, conditional stage execution.
//!
//! The stage list is fixed at construction and validated once: every
//! dependency must appear earlier in the list. At run time each stage is
//! checked for applicability, then for completed dependencies, and only
//! then invoked. Outputs are merged into the report table in execution
//! order.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use super::context::RunContext;
use super::stage::{Stage, StageKind};
use super::stages;
use crate::config::RunConfig;
use crate::errors::{Error, Result};
use crate::observability::RunLog;
use crate::report::ReportTable;
use crate::tools::Aligner;

/// Timing information for an executed stage.
#[derive(Debug, Clone)]
pub struct StageTiming {
    pub name: String,
    pub duration: Duration,
}

impl StageTiming {
    pub fn format(&self) -> String {
        format!("{}: {:.2}s", self.name, self.duration.as_secs_f64())
    }
}

/// What happened to each stage of one run.
#[derive(Debug, Clone, Default)]
pub struct ScheduleSummary {
    pub executed: Vec<String>,
    pub skipped: Vec<String>,
    pub timings: Vec<StageTiming>,
}

impl ScheduleSummary {
    pub fn total_duration(&self) -> Duration {
        self.timings.iter().map(|t| t.duration).sum()
    }
}

pub struct Scheduler {
    stages: Vec<Box<dyn Stage>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Scheduler {
    /// Build from an explicit list, rejecting a dependency that does not
    /// appear before the stage needing it.
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Result<Self> {
        let mut seen: HashSet<StageKind> = HashSet::new();
        for stage in &stages {
            if let Some(missing) = stage.dependencies().iter().find(|d| !seen.contains(d)) {
                return Err(Error::Pipeline(format!(
                    "stage '{}' depends on '{}', which is not scheduled before it",
                    stage.name(),
                    missing
                )));
            }
            seen.insert(stage.kind());
        }
        Ok(Self { stages })
    }

    /// The standard evaluation order for `config`, aligning with `aligner`.
    pub fn standard(config: &RunConfig, aligner: Box<dyn Aligner>) -> Result<Self> {
        Self::new(stages::standard_stages(config, aligner))
    }

    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every applicable stage in order, merging outputs into `table`.
    ///
    /// A stage failure aborts the run; the table keeps the columns of the
    /// stages completed so far.
    pub fn run(
        &self,
        ctx: &mut RunContext<'_>,
        table: &mut ReportTable,
        log: &mut RunLog,
    ) -> Result<ScheduleSummary> {
        let config = ctx.config();
        let mut completed: HashSet<StageKind> = HashSet::new();
        let mut summary = ScheduleSummary::default();

        for (i, stage) in self.stages.iter().enumerate() {
            let name = stage.name();
            if !stage.is_applicable(config) {
                tracing::debug!("Skipping inapplicable stage {}", name);
                summary.skipped.push(name);
                continue;
            }
            if let Some(missing) = stage.dependencies().iter().find(|d| !completed.contains(d)) {
                tracing::debug!("Skipping stage {}: '{}' did not complete", name, missing);
                summary.skipped.push(name);
                continue;
            }

            tracing::info!("Stage {}/{}: {}", i + 1, self.stages.len(), name);
            let start = Instant::now();
            let output = stage.run(ctx, table, log).map_err(|e| match e {
                Error::StageFailed { .. } | Error::Tool { .. } => e,
                other => Error::stage(&name, other.to_string()),
            })?;
            if !output.is_empty() {
                table.extend_all_rows(&output.columns, output.values)?;
            }

            let timing = StageTiming {
                name: name.clone(),
                duration: start.elapsed(),
            };
            tracing::debug!("{}", timing.format());
            summary.timings.push(timing);
            summary.executed.push(name);
            completed.insert(stage.kind());
        }
        Ok(summary)
    }
}
