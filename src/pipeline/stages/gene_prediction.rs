//! Ab initio gene prediction with GeneMark (`gmhmmp`).

use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use crate::config::RunConfig;
use crate::errors::{Error, IoContext, Result};
use crate::observability::RunLog;
use crate::pipeline::context::RunContext;
use crate::pipeline::stage::{Stage, StageKind, StageOutput};
use crate::report::{ReportTable, Value};
use crate::tools::{ExternalTool, GENEMARK};

pub fn gene_column(min_length: u64) -> String {
    format!("# predicted genes (>= {} bp)", min_length)
}

/// Gene lengths from a GeneMark LST listing. Gene rows start with the
/// numeric gene index; the fifth field is the gene length.
pub fn parse_lst(content: &str) -> Vec<u64> {
    content
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 5 || fields[0].parse::<u64>().is_err() {
                return None;
            }
            fields[4].parse().ok()
        })
        .collect()
}

/// Genes at least as long as each threshold.
pub fn count_by_threshold(lengths: &[u64], thresholds: &[u64]) -> Vec<Value> {
    thresholds
        .iter()
        .map(|&t| Value::from(lengths.iter().filter(|&&l| l >= t).count()))
        .collect()
}

pub struct GenePrediction;

impl Stage for GenePrediction {
    fn kind(&self) -> StageKind {
        StageKind::GenePrediction
    }

    fn is_applicable(&self, config: &RunConfig) -> bool {
        config.genes.is_none() && config.with_genemark && !config.comparison_mode
    }

    fn run(
        &self,
        ctx: &mut RunContext<'_>,
        _table: &ReportTable,
        log: &mut RunLog,
    ) -> Result<StageOutput> {
        let config = ctx.config();
        let model = config.tools.genemark_model.as_deref().ok_or_else(|| {
            Error::tool(GENEMARK, "no model file configured ([tools] genemark_model)")
        })?;
        let genemark = ExternalTool::resolve(GENEMARK, config.tools.genemark.as_deref())?;
        let dir = ctx.layout().stage_dir(self.kind().dir_name())?;
        log.info("Running GeneMark...");

        let columns: Vec<String> = config.gene_lengths.iter().map(|&l| gene_column(l)).collect();
        let mut output = StageOutput::with_columns(columns);
        for assembly in ctx.assemblies() {
            let lst = dir.join(format!("{}.lst", assembly.identity));
            genemark.run(
                [
                    OsStr::new("-m"),
                    model.as_os_str(),
                    OsStr::new("-o"),
                    lst.as_os_str(),
                    assembly.corrected_path.as_os_str(),
                ],
                None,
            )?;
            let lengths = read_lst(&lst)?;
            log.info(format!("  {}: {} genes", assembly.identity, lengths.len()));
            output.insert(
                assembly.identity.clone(),
                count_by_threshold(&lengths, &config.gene_lengths),
            );
        }
        log.info("  Done.");
        Ok(output)
    }
}

fn read_lst(path: &Path) -> Result<Vec<u64>> {
    let content = fs::read_to_string(path).with_path("Cannot read GeneMark output", path)?;
    Ok(parse_lst(&content))
}
