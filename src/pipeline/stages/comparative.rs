//! Whole-genome comparative alignment with progressiveMauve.

use std::ffi::OsString;
use std::fs;
use std::path::Path;

use crate::config::RunConfig;
use crate::errors::{IoContext, Result};
use crate::observability::RunLog;
use crate::pipeline::context::RunContext;
use crate::pipeline::stage::{Stage, StageKind, StageOutput};
use crate::report::{ReportTable, Value};
use crate::tools::{ExternalTool, MAUVE};

pub const LCB_COLUMN: &str = "# LCBs";

/// Number of locally collinear blocks in a backbone file: one per line
/// after the header.
pub fn count_lcbs(backbone: &str) -> usize {
    backbone
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .count()
}

pub struct ComparativeAlignment;

impl Stage for ComparativeAlignment {
    fn kind(&self) -> StageKind {
        StageKind::ComparativeAlignment
    }

    fn dependencies(&self) -> &'static [StageKind] {
        &[StageKind::Alignment]
    }

    fn is_applicable(&self, config: &RunConfig) -> bool {
        config.has_reference() && config.with_mauve && !config.comparison_mode
    }

    fn run(
        &self,
        ctx: &mut RunContext<'_>,
        _table: &ReportTable,
        log: &mut RunLog,
    ) -> Result<StageOutput> {
        let reference = ctx.require_reference(&self.name())?;
        let dir = ctx.layout().stage_dir(self.kind().dir_name())?;
        let mauve = ExternalTool::resolve(MAUVE, ctx.config().tools.mauve.as_deref())?;
        log.info("Running comparative alignment (progressiveMauve)...");

        let mut output = StageOutput::with_columns([LCB_COLUMN]);
        for assembly in ctx.assemblies() {
            let xmfa = dir.join(format!("{}.xmfa", assembly.identity));
            let backbone = dir.join(format!("{}.backbone", assembly.identity));
            let mut output_arg = OsString::from("--output=");
            output_arg.push(&xmfa);
            let mut backbone_arg = OsString::from("--backbone-output=");
            backbone_arg.push(&backbone);

            mauve.run(
                [
                    output_arg.as_os_str(),
                    backbone_arg.as_os_str(),
                    reference.as_os_str(),
                    assembly.corrected_path.as_os_str(),
                ],
                Some(&dir.join(format!("{}.log", assembly.identity))),
            )?;

            let lcbs = read_lcbs(&backbone)?;
            log.info(format!("  {}: {} LCBs", assembly.identity, lcbs));
            output.insert(assembly.identity.clone(), vec![Value::from(lcbs)]);
        }
        log.info("  Done.");
        Ok(output)
    }
}

fn read_lcbs(backbone: &Path) -> Result<usize> {
    let content = fs::read_to_string(backbone).with_path("Cannot read backbone", backbone)?;
    Ok(count_lcbs(&content))
}
