//! Legacy comparison-only mode: the external GAGE scripts per assembly.

use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use crate::config::RunConfig;
use crate::errors::{IoContext, Result};
use crate::observability::RunLog;
use crate::pipeline::context::RunContext;
use crate::pipeline::stage::{Stage, StageKind, StageOutput};
use crate::report::ReportTable;
use crate::tools::{ExternalTool, GAGE};

/// Concatenate per-assembly outputs under an `Assembly:` heading each.
pub fn combine_reports<'p>(reports: impl IntoIterator<Item = (&'p str, &'p Path)>) -> Result<String> {
    let mut combined = String::new();
    for (identity, path) in reports {
        let content = fs::read_to_string(path).with_path("Cannot read comparison output", path)?;
        combined.push_str(&format!("Assembly: {}\n", identity));
        combined.push_str(content.trim_end());
        combined.push_str("\n\n");
    }
    Ok(combined)
}

pub struct Comparison;

impl Stage for Comparison {
    fn kind(&self) -> StageKind {
        StageKind::Comparison
    }

    fn is_applicable(&self, config: &RunConfig) -> bool {
        config.comparison_mode && config.has_reference()
    }

    fn run(
        &self,
        ctx: &mut RunContext<'_>,
        _table: &ReportTable,
        log: &mut RunLog,
    ) -> Result<StageOutput> {
        let reference = ctx.require_reference(&self.name())?;
        let config = ctx.config();
        let gage = ExternalTool::resolve(GAGE, config.tools.gage.as_deref())?;
        let dir = ctx.layout().stage_dir(self.kind().dir_name())?;
        log.info("Running GAGE...");

        let min_contig = config.min_contig.to_string();
        let mut outputs = Vec::new();
        for assembly in ctx.assemblies() {
            let out = dir.join(format!("{}.txt", assembly.identity));
            gage.run(
                [
                    reference.as_os_str(),
                    assembly.corrected_path.as_os_str(),
                    OsStr::new(&min_contig),
                ],
                Some(&out),
            )?;
            log.info(format!("  {} done", assembly.identity));
            outputs.push((assembly.identity.clone(), out));
        }

        let combined = combine_reports(
            outputs
                .iter()
                .map(|(identity, path)| (identity.as_str(), path.as_path())),
        )?;
        let report = ctx.layout().comparison_report();
        fs::write(&report, combined).with_path("Cannot write comparison report", &report)?;
        log.info(format!("  Report saved to {}", report.display()));
        Ok(StageOutput::none())
    }
}
