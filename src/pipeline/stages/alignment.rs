//! Contig-to-reference alignment and misassembly counting.
//!
//! The aligner writes one coords file per assembly into the stage directory;
//! the directory is registered as [`Artifact::AlignmentDir`] for the stages
//! that reuse the alignments.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::RunConfig;
use crate::errors::{Error, Result};
use crate::io::fasta;
use crate::observability::RunLog;
use crate::pipeline::context::{sequence_name, Artifact, RunContext};
use crate::pipeline::stage::{Stage, StageKind, StageOutput};
use crate::report::{ReportTable, Value};
use crate::tools::Aligner;

pub const COORDS_EXTENSION: &str = "coords";

/// Largest tolerated difference between reference and contig gaps.
pub const MAX_GAP_DEVIATION: u64 = 1000;

/// Uncovered bases that make an aligned contig partially unaligned.
pub const MIN_UNALIGNED_PART: u64 = 500;

const COLUMNS: [&str; 5] = [
    "# misassemblies",
    "# misassembled contigs",
    "# unaligned contigs",
    "# partially unaligned contigs",
    "Unaligned length",
];

/// One row of a `show-coords -THrcl` file.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentBlock {
    pub ref_start: u64,
    pub ref_end: u64,
    /// Greater than `query_end` for reverse-strand alignments
    pub query_start: u64,
    pub query_end: u64,
    pub ref_aligned: u64,
    pub query_aligned: u64,
    pub identity: f64,
    pub ref_length: u64,
    pub query_length: u64,
    /// Percent of the reference sequence covered by this block
    pub ref_coverage: f64,
    pub query_coverage: f64,
    pub ref_name: String,
    pub query_name: String,
}

#[derive(Debug, Deserialize)]
struct CoordsRow(
    u64,
    u64,
    u64,
    u64,
    u64,
    u64,
    f64,
    u64,
    u64,
    f64,
    f64,
    String,
    String,
);

impl From<CoordsRow> for AlignmentBlock {
    fn from(row: CoordsRow) -> Self {
        Self {
            ref_start: row.0,
            ref_end: row.1,
            query_start: row.2,
            query_end: row.3,
            ref_aligned: row.4,
            query_aligned: row.5,
            identity: row.6,
            ref_length: row.7,
            query_length: row.8,
            ref_coverage: row.9,
            query_coverage: row.10,
            ref_name: row.11,
            query_name: row.12,
        }
    }
}

impl AlignmentBlock {
    pub fn is_forward(&self) -> bool {
        self.query_start <= self.query_end
    }

    /// Query interval, lowest coordinate first.
    pub fn query_range(&self) -> (u64, u64) {
        (
            self.query_start.min(self.query_end),
            self.query_start.max(self.query_end),
        )
    }

    /// Reference interval, lowest coordinate first.
    pub fn ref_range(&self) -> (u64, u64) {
        (
            self.ref_start.min(self.ref_end),
            self.ref_start.max(self.ref_end),
        )
    }
}

/// Coords file of one assembly inside the alignment directory.
pub fn coords_path(dir: &Path, identity: &str) -> PathBuf {
    dir.join(format!("{}.{}", identity, COORDS_EXTENSION))
}

/// Parse a tab-separated coords file (13 columns, no header).
pub fn parse_coords(path: &Path) -> Result<Vec<AlignmentBlock>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| Error::stage("alignment", format!("{}: {}", path.display(), e)))?;
    reader
        .deserialize::<CoordsRow>()
        .map(|row| {
            row.map(AlignmentBlock::from).map_err(|e| {
                Error::stage("alignment", format!("malformed coords in {}: {}", path.display(), e))
            })
        })
        .collect()
}

/// Total length of the union of `ranges` (inclusive coordinates).
pub fn covered_length(mut ranges: Vec<(u64, u64)>) -> u64 {
    ranges.sort_unstable();
    let mut covered = 0;
    let mut current: Option<(u64, u64)> = None;
    for (start, end) in ranges {
        current = match current {
            Some((s, e)) if start <= e + 1 => Some((s, e.max(end))),
            Some((s, e)) => {
                covered += e - s + 1;
                Some((start, end))
            }
            None => Some((start, end)),
        };
    }
    if let Some((s, e)) = current {
        covered += e - s + 1;
    }
    covered
}

/// Whether the breakpoint between two blocks adjacent along a contig is a
/// misassembly. `a` precedes `b` on the contig.
pub fn is_misassembly(a: &AlignmentBlock, b: &AlignmentBlock, circular: bool, count_rc: bool) -> bool {
    if a.ref_name != b.ref_name {
        return true;
    }
    if a.is_forward() != b.is_forward() {
        return count_rc;
    }

    let contig_gap = b.query_range().0 as i64 - a.query_range().1 as i64;
    let ref_gap = if a.is_forward() {
        b.ref_start as i64 - a.ref_end as i64
    } else {
        a.ref_start as i64 - b.ref_end as i64
    };
    let deviation = ref_gap - contig_gap;
    let distance = if circular && a.ref_length > 0 {
        let length = a.ref_length as i64;
        let wrapped = deviation.rem_euclid(length);
        wrapped.min(length - wrapped) as u64
    } else {
        deviation.unsigned_abs()
    };
    distance > MAX_GAP_DEVIATION
}

/// Per-assembly alignment metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignmentSummary {
    pub misassemblies: usize,
    pub misassembled_contigs: usize,
    pub unaligned_contigs: usize,
    pub partially_unaligned_contigs: usize,
    pub unaligned_length: u64,
}

impl AlignmentSummary {
    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.misassemblies),
            Value::from(self.misassembled_contigs),
            Value::from(self.unaligned_contigs),
            Value::from(self.partially_unaligned_contigs),
            Value::from(self.unaligned_length),
        ]
    }
}

/// Summarize the blocks of one assembly whose contigs are `contigs`
/// (name and length, in file order).
pub fn summarize(
    contigs: &[(String, u64)],
    blocks: &[AlignmentBlock],
    circular: bool,
    count_rc: bool,
) -> AlignmentSummary {
    let mut by_contig: BTreeMap<&str, Vec<&AlignmentBlock>> = BTreeMap::new();
    for block in blocks {
        by_contig.entry(block.query_name.as_str()).or_default().push(block);
    }

    let mut summary = AlignmentSummary::default();
    for (name, length) in contigs {
        let Some(placed) = by_contig.get_mut(name.as_str()) else {
            summary.unaligned_contigs += 1;
            summary.unaligned_length += length;
            continue;
        };
        placed.sort_by_key(|b| b.query_range());

        let breaks = placed
            .windows(2)
            .filter(|pair| is_misassembly(pair[0], pair[1], circular, count_rc))
            .count();
        if breaks > 0 {
            summary.misassemblies += breaks;
            summary.misassembled_contigs += 1;
        }

        let covered = covered_length(placed.iter().map(|b| b.query_range()).collect());
        let uncovered = length.saturating_sub(covered);
        if uncovered >= MIN_UNALIGNED_PART {
            summary.partially_unaligned_contigs += 1;
            summary.unaligned_length += uncovered;
        }
    }
    summary
}

pub struct AlignmentStage {
    aligner: Box<dyn Aligner>,
}

impl AlignmentStage {
    pub fn new(aligner: Box<dyn Aligner>) -> Self {
        Self { aligner }
    }
}

impl Stage for AlignmentStage {
    fn kind(&self) -> StageKind {
        StageKind::Alignment
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
        let reference = ctx.require_reference(&name)?;
        let dir = ctx.layout().stage_dir(self.kind().dir_name())?;
        let config = ctx.config();
        log.info(format!("Running contig alignment ({})...", self.aligner.name()));

        let mut output = StageOutput::with_columns(COLUMNS);
        for assembly in ctx.assemblies() {
            let coords = coords_path(&dir, &assembly.identity);
            self.aligner
                .align(&reference, &assembly.corrected_path, &dir, &coords)?;
            let blocks = parse_coords(&coords)?;
            let contigs: Vec<(String, u64)> = fasta::read_records(&assembly.corrected_path)?
                .iter()
                .map(|r| (sequence_name(&r.header), r.len()))
                .collect();

            let summary = summarize(
                &contigs,
                &blocks,
                config.circular,
                config.count_rc_misassemblies,
            );
            log.info(format!(
                "  {}: {} misassemblies, {} unaligned contigs",
                assembly.identity, summary.misassemblies, summary.unaligned_contigs
            ));
            output.insert(assembly.identity.clone(), summary.values());
        }
        ctx.register(Artifact::AlignmentDir, dir)?;
        log.info("  Done.");
        Ok(output)
    }
}
