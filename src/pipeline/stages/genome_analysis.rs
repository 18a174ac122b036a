//! Reference coverage and annotated-feature recovery.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::alignment::{coords_path, parse_coords, AlignmentBlock};
use crate::config::RunConfig;
use crate::errors::{Error, IoContext, Result};
use crate::observability::RunLog;
use crate::pipeline::context::{Artifact, RunContext};
use crate::pipeline::stage::{Stage, StageKind, StageOutput};
use crate::report::{ReportTable, Value};

pub const GENOME_INFO_FILE: &str = "genome_info.txt";

const TOTAL_SIZE_KEY: &str = "total genome size";
const GENES_KEY: &str = "genes loaded";
const OPERONS_KEY: &str = "operons loaded";

/// An annotated region of the reference. `seq` is `None` when the
/// annotation does not name a reference sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub seq: Option<String>,
    pub start: u64,
    pub end: u64,
}

/// Parse a feature file: GFF3 (nine tab-separated columns) or
/// whitespace-separated `name start end` lines. Lines that fit neither are
/// skipped.
pub fn parse_features(content: &str) -> Vec<Feature> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let gff: Vec<&str> = line.split('\t').collect();
            let (seq, start, end) = if gff.len() >= 9 {
                (Some(gff[0].to_string()), gff[3], gff[4])
            } else {
                let words: Vec<&str> = line.split_whitespace().collect();
                if words.len() < 3 {
                    return None;
                }
                (None, words[1], words[2])
            };
            let start: u64 = start.parse().ok()?;
            let end: u64 = end.parse().ok()?;
            Some(Feature {
                seq,
                start: start.min(end),
                end: start.max(end),
            })
        })
        .collect()
}

pub fn load_features(path: &Path) -> Result<Vec<Feature>> {
    let content = fs::read_to_string(path).with_path("Cannot read feature file", path)?;
    Ok(parse_features(&content))
}

/// Merge inclusive ranges into sorted, disjoint ones.
pub fn merge_ranges(mut ranges: Vec<(u64, u64)>) -> Vec<(u64, u64)> {
    ranges.sort_unstable();
    let mut merged: Vec<(u64, u64)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        match merged.last_mut() {
            Some(last) if start <= last.1 + 1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Reference ranges covered by one assembly, merged per sequence.
pub fn coverage_map(blocks: &[AlignmentBlock]) -> HashMap<String, Vec<(u64, u64)>> {
    let mut ranges: HashMap<String, Vec<(u64, u64)>> = HashMap::new();
    for block in blocks {
        ranges
            .entry(block.ref_name.clone())
            .or_default()
            .push(block.ref_range());
    }
    ranges
        .into_iter()
        .map(|(name, r)| (name, merge_ranges(r)))
        .collect()
}

fn covered_within(ranges: &[(u64, u64)], start: u64, end: u64) -> u64 {
    ranges
        .iter()
        .filter(|(s, e)| *s <= end && *e >= start)
        .map(|(s, e)| e.min(&end) - s.max(&start) + 1)
        .sum()
}

/// Count features fully and partially covered.
pub fn feature_recovery(
    features: &[Feature],
    coverage: &HashMap<String, Vec<(u64, u64)>>,
) -> (usize, usize) {
    let mut full = 0;
    let mut partial = 0;
    for feature in features {
        let length = feature.end - feature.start + 1;
        let covered = match &feature.seq {
            Some(seq) => coverage
                .get(seq)
                .map_or(0, |r| covered_within(r, feature.start, feature.end)),
            None => coverage
                .values()
                .map(|r| covered_within(r, feature.start, feature.end))
                .max()
                .unwrap_or(0),
        };
        if covered >= length {
            full += 1;
        } else if covered > 0 {
            partial += 1;
        }
    }
    (full, partial)
}

/// Summary of `genome_info.txt` read back by later stages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenomeInfo {
    pub total_size: u64,
    pub genes: Option<usize>,
    pub operons: Option<usize>,
}

/// Leading lines of `genome_info.txt`, up to the per-assembly table header.
pub fn genome_info_header(
    sequences: &[(String, u64)],
    genes: Option<usize>,
    operons: Option<usize>,
) -> Vec<String> {
    let mut lines = vec!["reference chromosomes:".to_string()];
    lines.extend(
        sequences
            .iter()
            .map(|(seq, length)| format!("\t{} ({} bp)", seq, length)),
    );
    lines.push(String::new());
    let total: u64 = sequences.iter().map(|(_, length)| length).sum();
    lines.push(format!("{}: {}", TOTAL_SIZE_KEY, total));
    if let Some(genes) = genes {
        lines.push(format!("{}: {}", GENES_KEY, genes));
    }
    if let Some(operons) = operons {
        lines.push(format!("{}: {}", OPERONS_KEY, operons));
    }
    lines.push(String::new());
    lines.push("assembly\tgenome fraction (%)\tduplication ratio\tgenes\toperons".to_string());
    lines
}

pub fn read_genome_info(path: &Path) -> Result<GenomeInfo> {
    let content = fs::read_to_string(path).with_path("Cannot read genome info", path)?;
    Ok(parse_genome_info(&content))
}

fn parse_genome_info(content: &str) -> GenomeInfo {
    let mut info = GenomeInfo::default();
    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            TOTAL_SIZE_KEY => info.total_size = value.parse().unwrap_or(0),
            GENES_KEY => info.genes = value.parse().ok(),
            OPERONS_KEY => info.operons = value.parse().ok(),
            _ => {}
        }
    }
    info
}

pub struct GenomeAnalysis;

impl Stage for GenomeAnalysis {
    fn kind(&self) -> StageKind {
        StageKind::GenomeAnalysis
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
        let reference = ctx
            .reference_info()?
            .cloned()
            .ok_or_else(|| Error::stage(&name, "no reference genome"))?;
        let dir = ctx.layout().stage_dir(self.kind().dir_name())?;
        let config = ctx.config();
        log.info("Running genome analyzer...");

        let genes = config.genes.as_deref().map(load_features).transpose()?;
        let operons = config.operons.as_deref().map(load_features).transpose()?;

        let mut info = genome_info_header(
            &reference.sequences,
            genes.as_ref().map(Vec::len),
            operons.as_ref().map(Vec::len),
        );

        let mut columns = vec!["Genome fraction (%)", "Duplication ratio"];
        if genes.is_some() {
            columns.push("# genes");
        }
        if operons.is_some() {
            columns.push("# operons");
        }
        let mut output = StageOutput::with_columns(columns);

        let total = reference.total_length();
        for assembly in ctx.assemblies() {
            let blocks = parse_coords(&coords_path(&alignments, &assembly.identity))?;
            let coverage = coverage_map(&blocks);
            let covered: u64 = coverage
                .values()
                .flat_map(|ranges| ranges.iter().map(|(s, e)| e - s + 1))
                .sum();
            let aligned: u64 = blocks.iter().map(|b| b.query_aligned).sum();

            let fraction = (total > 0).then(|| covered as f64 * 100.0 / total as f64);
            let duplication = (covered > 0).then(|| aligned as f64 / covered as f64);
            let mut values = vec![Value::from(fraction), Value::from(duplication)];

            let recovery = |features: &Option<Vec<Feature>>| {
                features.as_ref().map(|f| {
                    let (full, partial) = feature_recovery(f, &coverage);
                    format!("{} + {}", full, partial)
                })
            };
            let gene_cell = recovery(&genes);
            let operon_cell = recovery(&operons);
            if let Some(cell) = &gene_cell {
                values.push(Value::from(cell.as_str()));
            }
            if let Some(cell) = &operon_cell {
                values.push(Value::from(cell.as_str()));
            }

            info.push(format!(
                "{}\t{}\t{}\t{}\t{}",
                assembly.identity,
                Value::from(fraction),
                Value::from(duplication),
                gene_cell.as_deref().unwrap_or("-"),
                operon_cell.as_deref().unwrap_or("-"),
            ));
            log.info(format!(
                "  {}: genome fraction = {}%",
                assembly.identity,
                Value::from(fraction)
            ));
            output.insert(assembly.identity.clone(), values);
        }

        let info_path = dir.join(GENOME_INFO_FILE);
        info.push(String::new());
        fs::write(&info_path, info.join("\n")).with_path("Cannot write genome info", &info_path)?;
        ctx.register(Artifact::GenomeInfo, info_path)?;
        log.info("  Done.");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::OutputLayout;
    use crate::sanitizer::Assembly;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_parse_gff_and_plain_features() {
        let gff = indoc! {"
            ##gff-version 3
            chr1\tsrc\tgene\t100\t200\t.\t+\t.\tID=g1
            chr1\tsrc\tgene\t500\t400\t.\t-\t.\tID=g2
        "};
        assert_eq!(
            parse_features(gff),
            vec![
                Feature { seq: Some("chr1".into()), start: 100, end: 200 },
                Feature { seq: Some("chr1".into()), start: 400, end: 500 },
            ]
        );

        let plain = "name start end\ngeneA 10 20\ngeneB 30 40\n";
        assert_eq!(parse_features(plain).len(), 2);
    }

    #[test]
    fn test_genome_info_header_reads_back() {
        let sequences = vec![("chr1".to_string(), 7000), ("plasmid".to_string(), 3000)];
        let header = genome_info_header(&sequences, Some(12), None);
        assert_eq!(header[0], "reference chromosomes:");
        assert_eq!(header[1], "\tchr1 (7000 bp)");
        assert!(header.last().unwrap().starts_with("assembly\tgenome fraction (%)"));
        assert_eq!(
            parse_genome_info(&header.join("\n")),
            GenomeInfo {
                total_size: 10_000,
                genes: Some(12),
                operons: None,
            }
        );
    }

    #[test]
    fn test_merge_ranges() {
        assert_eq!(
            merge_ranges(vec![(50, 60), (1, 10), (5, 20), (21, 25)]),
            vec![(1, 25), (50, 60)]
        );
    }

    #[test]
    fn test_feature_recovery() {
        let coverage = HashMap::from([("chr1".to_string(), vec![(1, 100), (200, 300)])]);
        let features = vec![
            Feature { seq: Some("chr1".into()), start: 10, end: 50 },
            Feature { seq: Some("chr1".into()), start: 90, end: 210 },
            Feature { seq: Some("chr1".into()), start: 120, end: 150 },
            Feature { seq: None, start: 250, end: 260 },
            Feature { seq: Some("chr2".into()), start: 1, end: 5 },
        ];
        assert_eq!(feature_recovery(&features, &coverage), (2, 1));
    }

    #[test]
    fn test_run_writes_genome_info() {
        let dir = TempDir::new().unwrap();
        let reference = dir.path().join("ref.fa");
        fs::write(&reference, format!(">chr1\n{}\n", "A".repeat(1000))).unwrap();
        let genes = dir.path().join("genes.txt");
        fs::write(&genes, "g1 1 100\ng2 900 1000\n").unwrap();
        let contigs = dir.path().join("A.fasta");
        fs::write(&contigs, format!(">c1\n{}\n", "A".repeat(600))).unwrap();
        let alignment_dir = dir.path().join("alignment");
        fs::create_dir(&alignment_dir).unwrap();
        fs::write(
            alignment_dir.join("A.coords"),
            "1\t500\t1\t500\t500\t500\t100.0\t1000\t600\t50.0\t83.3\tchr1\tc1\n",
        )
        .unwrap();

        let mut config = RunConfig::new(vec![contigs.clone()]);
        config.reference = Some(reference.clone());
        config.genes = Some(genes);
        let assembly = Assembly {
            index: 0,
            identity: "A".into(),
            source_path: contigs.clone(),
            corrected_path: contigs,
            lengths: vec![600],
        };
        let mut ctx = RunContext::new(
            &config,
            OutputLayout::new(dir.path(), None),
            vec![assembly],
            Some(reference),
        );
        ctx.register(Artifact::AlignmentDir, alignment_dir).unwrap();

        let output = GenomeAnalysis
            .run(&mut ctx, &ReportTable::new(), &mut RunLog::sink())
            .unwrap();
        assert_eq!(output.columns, vec!["Genome fraction (%)", "Duplication ratio", "# genes"]);
        assert_eq!(
            output.values["A"],
            vec![Value::Float(50.0), Value::Float(1.0), Value::from("1 + 0")]
        );

        let info_path = ctx.artifact(Artifact::GenomeInfo).unwrap();
        let info = read_genome_info(info_path).unwrap();
        assert_eq!(
            info,
            GenomeInfo {
                total_size: 1000,
                genes: Some(2),
                operons: None,
            }
        );
    }
}
