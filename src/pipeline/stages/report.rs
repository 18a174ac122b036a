//! Final export of the report table.

use crate::config::RunConfig;
use crate::errors::Result;
use crate::observability::RunLog;
use crate::pipeline::context::{Artifact, RunContext};
use crate::pipeline::stage::{Stage, StageKind, StageOutput};
use crate::report::{export_reports, ReportTable};

pub struct ReportStage;

impl Stage for ReportStage {
    fn kind(&self) -> StageKind {
        StageKind::Report
    }

    fn is_applicable(&self, config: &RunConfig) -> bool {
        !config.comparison_mode
    }

    fn run(
        &self,
        ctx: &mut RunContext<'_>,
        table: &ReportTable,
        log: &mut RunLog,
    ) -> Result<StageOutput> {
        log.info("Summarizing...");
        let min_contig = ctx.config().effective_min_contig();
        let reports = export_reports(table, ctx.layout(), min_contig)?;

        log.info(format!(
            "  Creating total report...\n    saved to {}, {}",
            reports.row_major_txt.display(),
            reports.row_major_tsv.display()
        ));
        log.info(format!(
            "  Transposed version of total report...\n    saved to {}, {}",
            reports.column_major_txt.display(),
            reports.column_major_tsv.display()
        ));
        if let Some(archive) = &reports.archive {
            log.info(format!("  Archived report saved to {}", archive.display()));
        }

        ctx.register(Artifact::RowMajorReport, reports.row_major_txt)?;
        ctx.register(Artifact::ColumnMajorReport, reports.column_major_txt)?;
        Ok(StageOutput::none())
    }
}
