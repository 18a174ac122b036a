//! N50-style statistics over aligned blocks (NA50, NGA50).

use super::alignment::{coords_path, parse_coords};
use super::nx_stat;
use crate::config::RunConfig;
use crate::errors::{Error, Result};
use crate::io::fasta;
use crate::observability::RunLog;
use crate::pipeline::context::{Artifact, RunContext};
use crate::pipeline::stage::{Stage, StageKind, StageOutput};
use crate::report::{ReportTable, Value};

pub const ALIGNED_LENGTHS_FILE: &str = "aligned_lengths.tsv";

const COLUMNS: [&str; 4] = ["NA50", "LA50", "NGA50", "LGA50"];

pub struct AlignedStats;

impl Stage for AlignedStats {
    fn kind(&self) -> StageKind {
        StageKind::AlignedStats
    }

    fn dependencies(&self) -> &'static [StageKind] {
        &[StageKind::Alignment]
    }

    fn is_applicable(&self, config: &RunConfig) -> bool {
        config.has_reference() && !config.comparison_mode
    }

    fn run(
        &self,
        ctx: &mut RunContext<'_>,
        _table: &ReportTable,
        log: &mut RunLog,
    ) -> Result<StageOutput> {
        let name = self.name();
        let alignments = ctx.require_artifact(Artifact::AlignmentDir, &name)?;
        let reference_length = ctx
            .reference_info()?
            .map(|info| info.total_length())
            .ok_or_else(|| Error::stage(&name, "no reference genome"))?;
        let dir = ctx.layout().stage_dir(self.kind().dir_name())?;
        log.info("Running NA-NGA calculation...");

        let mut lengths_out = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(dir.join(ALIGNED_LENGTHS_FILE))?;
        lengths_out.write_record(["assembly", "aligned length"])?;

        let mut output = StageOutput::with_columns(COLUMNS);
        for assembly in ctx.assemblies() {
            let blocks = parse_coords(&coords_path(&alignments, &assembly.identity))?;
            let aligned: Vec<u64> = blocks.iter().map(|b| b.query_aligned).collect();
            let total: u64 = fasta::read_lengths(&assembly.corrected_path)?.iter().sum();
            for length in &aligned {
                let length = length.to_string();
                lengths_out.write_record([assembly.identity.as_str(), length.as_str()])?;
            }

            let na = nx_stat(&aligned, total);
            let nga = nx_stat(&aligned, reference_length);
            log.info(format!(
                "  {}, NA50 = {}, NGA50 = {}",
                assembly.identity,
                na.map_or_else(|| "-".to_string(), |(n, _)| n.to_string()),
                nga.map_or_else(|| "-".to_string(), |(n, _)| n.to_string()),
            ));
            output.insert(
                assembly.identity.clone(),
                vec![
                    Value::from(na.map(|(n, _)| n)),
                    Value::from(na.map(|(_, l)| l)),
                    Value::from(nga.map(|(n, _)| n)),
                    Value::from(nga.map(|(_, l)| l)),
                ],
            );
        }
        lengths_out.flush().map_err(Error::ReportWrite)?;
        log.info("  Done.");
        Ok(output)
    }
}
