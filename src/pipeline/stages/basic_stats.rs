//! Length and composition statistics of the corrected assemblies.

use super::nx_stat;
use crate::config::RunConfig;
use crate::errors::{Error, Result};
use crate::io::fasta;
use crate::observability::RunLog;
use crate::pipeline::context::{gc_percent, sequence_name, RunContext};
use crate::pipeline::stage::{Stage, StageKind, StageOutput};
use crate::report::{ReportTable, Value};

pub const LENGTHS_FILE: &str = "contig_lengths.tsv";

const COLUMNS: [&str; 5] = ["N50", "L50", "Largest contig", "Total length", "GC (%)"];
const REFERENCE_COLUMNS: [&str; 4] = ["Reference length", "Reference GC (%)", "NG50", "LG50"];

pub struct BasicStats;

/// Statistics of one set of contig lengths.
#[derive(Debug, Clone, PartialEq)]
pub struct LengthStats {
    pub n50: Option<u64>,
    pub l50: Option<usize>,
    pub largest: Option<u64>,
    pub total: u64,
}

impl LengthStats {
    pub fn of(lengths: &[u64]) -> Self {
        let total = lengths.iter().sum();
        let nx = nx_stat(lengths, total);
        Self {
            n50: nx.map(|(n, _)| n),
            l50: nx.map(|(_, l)| l),
            largest: lengths.iter().copied().max(),
            total,
        }
    }
}

impl Stage for BasicStats {
    fn kind(&self) -> StageKind {
        StageKind::BasicStats
    }

    fn is_applicable(&self, config: &RunConfig) -> bool {
        !config.comparison_mode
    }

    fn run(
        &self,
        ctx: &mut RunContext<'_>,
        _table: &ReportTable,
        log: &mut RunLog,
    ) -> Result<StageOutput> {
        log.info("Running basic statistics...");
        let dir = ctx.layout().stage_dir(self.kind().dir_name())?;
        let reference = ctx.reference_info()?.cloned();

        let mut columns: Vec<&str> = COLUMNS.to_vec();
        if reference.is_some() {
            columns.extend(REFERENCE_COLUMNS);
        }
        let mut output = StageOutput::with_columns(columns);

        let lengths_path = dir.join(LENGTHS_FILE);
        let mut lengths_out = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(&lengths_path)?;
        lengths_out.write_record(["assembly", "contig", "length"])?;

        if let Some(reference) = &reference {
            log.info(format!(
                "  Reference: {} ({} bp)",
                reference.path.display(),
                reference.total_length()
            ));
        }
        for assembly in ctx.assemblies() {
            let records = fasta::read_records(&assembly.corrected_path)?;
            let lengths: Vec<u64> = records.iter().map(|r| r.len()).collect();
            for record in &records {
                let name = sequence_name(&record.header);
                let length = record.len().to_string();
                lengths_out.write_record([assembly.identity.as_str(), name.as_str(), length.as_str()])?;
            }

            let stats = LengthStats::of(&lengths);
            let gc = gc_percent(records.iter().map(|r| r.seq.as_slice()));
            log.info(format!(
                "  {}, N50 = {}, Total length = {}",
                assembly.identity,
                stats.n50.unwrap_or(0),
                stats.total
            ));

            let mut values = vec![
                Value::from(stats.n50),
                Value::from(stats.l50),
                Value::from(stats.largest),
                Value::from(stats.total),
                Value::from(gc),
            ];
            if let Some(reference) = &reference {
                let ng = nx_stat(&lengths, reference.total_length());
                values.push(Value::from(reference.total_length()));
                values.push(Value::from(reference.gc_percent));
                values.push(Value::from(ng.map(|(n, _)| n)));
                values.push(Value::from(ng.map(|(_, l)| l)));
            }
            output.insert(assembly.identity.clone(), values);
        }
        lengths_out.flush().map_err(Error::ReportWrite)?;
        log.info("  Done.");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::OutputLayout;
    use crate::sanitizer::Assembly;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn assembly(dir: &Path, identity: &str, content: &str) -> Assembly {
        let path = dir.join(format!("{}.fasta", identity));
        fs::write(&path, content).unwrap();
        Assembly {
            index: 0,
            identity: identity.to_string(),
            source_path: path.clone(),
            corrected_path: path,
            lengths: vec![],
        }
    }

    #[test]
    fn test_length_stats() {
        let stats = LengthStats::of(&[600, 150, 50]);
        assert_eq!(stats.n50, Some(600));
        assert_eq!(stats.l50, Some(1));
        assert_eq!(stats.largest, Some(600));
        assert_eq!(stats.total, 800);
        assert_eq!(LengthStats::of(&[]).n50, None);
    }

    #[test]
    fn test_columns_without_reference() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig::new(vec![PathBuf::from("a.fa")]);
        let a = assembly(dir.path(), "A", ">c1\nGGGGCCCCAA\n>c2\nAAAAAA\n");
        let mut ctx = RunContext::new(&config, OutputLayout::new(dir.path(), None), vec![a], None);

        let output = BasicStats
            .run(&mut ctx, &ReportTable::new(), &mut RunLog::sink())
            .unwrap();
        assert_eq!(output.columns, COLUMNS.map(String::from).to_vec());
        assert_eq!(
            output.values["A"],
            vec![
                Value::Int(10),
                Value::Int(1),
                Value::Int(10),
                Value::Int(16),
                Value::Float(50.0),
            ]
        );
        assert!(dir.path().join("basic_stats").join(LENGTHS_FILE).is_file());
    }

    #[test]
    fn test_reference_adds_ng50() {
        let dir = TempDir::new().unwrap();
        let reference = dir.path().join("ref.fa");
        fs::write(&reference, format!(">chr\n{}\n", "A".repeat(40))).unwrap();
        let mut config = RunConfig::new(vec![PathBuf::from("a.fa")]);
        config.reference = Some(reference.clone());
        let a = assembly(
            dir.path(),
            "A",
            &format!(">c1\n{}\n>c2\n{}\n", "A".repeat(15), "A".repeat(10)),
        );
        let mut ctx = RunContext::new(
            &config,
            OutputLayout::new(dir.path(), None),
            vec![a],
            Some(reference),
        );

        let output = BasicStats
            .run(&mut ctx, &ReportTable::new(), &mut RunLog::sink())
            .unwrap();
        assert_eq!(output.columns.len(), 9);
        let values = &output.values["A"];
        assert_eq!(values[5], Value::Int(40));
        assert_eq!(values[7], Value::Int(10));
        assert_eq!(values[8], Value::Int(2));
    }

    #[test]
    fn test_not_applicable_in_comparison_mode() {
        let mut config = RunConfig::new(vec![PathBuf::from("a.fa")]);
        assert!(BasicStats.is_applicable(&config));
        config.comparison_mode = true;
        assert!(!BasicStats.is_applicable(&config));
    }
}
