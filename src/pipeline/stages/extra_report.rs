//! Compact per-assembly summary next to the full report.

use std::fs::File;
use std::io::BufWriter;

use super::genome_analysis::read_genome_info;
use crate::config::RunConfig;
use crate::errors::{IoContext, Result};
use crate::io::layout::ARCHIVE_EXTRA_REPORT;
use crate::observability::RunLog;
use crate::pipeline::context::{Artifact, RunContext};
use crate::pipeline::stage::{Stage, StageKind, StageOutput};
use crate::report::{JsonWriter, Orientation, ReportTable, ReportWriter, TextWriter, Value};
use crate::sanitizer::threshold_columns;

/// Metrics copied from the full report, in this order.
const SUMMARY_COLUMNS: [&str; 9] = [
    "Largest contig",
    "Total length",
    "N50",
    "NG50",
    "NA50",
    "Genome fraction (%)",
    "Duplication ratio",
    "# misassemblies",
    "# genes",
];

/// Summary table: the contig count and total length for the first
/// threshold, then [`SUMMARY_COLUMNS`]. Metrics absent from `table` are
/// `Missing`.
pub fn summary_table(table: &ReportTable, thresholds: &[u64]) -> Result<ReportTable> {
    let mut columns: Vec<String> = threshold_columns(&thresholds[..thresholds.len().min(1)]);
    columns.extend(SUMMARY_COLUMNS.iter().map(|c| c.to_string()));

    let mut summary = ReportTable::new();
    summary.initialize_header(columns.clone())?;
    for row in table.rows() {
        let mut values: Vec<Value> = row.values.iter().take(2).cloned().collect();
        values.extend(columns.iter().map(|column| {
            table
                .value(&row.identity, column)
                .cloned()
                .unwrap_or(Value::Missing)
        }));
        summary.add_row(row.identity.clone(), values)?;
    }
    Ok(summary)
}

pub struct ExtraReport;

impl Stage for ExtraReport {
    fn kind(&self) -> StageKind {
        StageKind::ExtraReport
    }

    fn dependencies(&self) -> &'static [StageKind] {
        &[StageKind::Report, StageKind::GenomeAnalysis]
    }

    fn is_applicable(&self, config: &RunConfig) -> bool {
        config.has_reference() && config.extra_report && !config.comparison_mode
    }

    fn run(
        &self,
        ctx: &mut RunContext<'_>,
        table: &ReportTable,
        log: &mut RunLog,
    ) -> Result<StageOutput> {
        let info_path = ctx.require_artifact(Artifact::GenomeInfo, &self.name())?;
        let info = read_genome_info(&info_path)?;
        let summary = summary_table(table, &ctx.config().contig_thresholds)?;

        let mut note = format!("Reference size: {} bp", info.total_size);
        if let Some(genes) = info.genes {
            note.push_str(&format!(", genes: {}", genes));
        }
        if let Some(operons) = info.operons {
            note.push_str(&format!(", operons: {}", operons));
        }

        let path = ctx.layout().extra_report();
        let file = File::create(&path).with_path("Cannot create extra report", &path)?;
        TextWriter::new(BufWriter::new(file), Orientation::RowMajor)
            .with_note(note)
            .write_table(&summary)?;
        log.info(format!("  Extra report saved to {}", path.display()));

        if let Some(archive) = ctx.layout().archive() {
            let json_path = archive.join(ARCHIVE_EXTRA_REPORT);
            let file = File::create(&json_path).with_path("Cannot create archive file", &json_path)?;
            JsonWriter::new(BufWriter::new(file), ctx.config().effective_min_contig())
                .write_table(&summary)?;
        }
        Ok(StageOutput::none())
    }
}
