//! Open reading frame counting.
//!
//! A six-frame stop-to-stop scan: in every frame of both strands, each
//! maximal run of codons without a stop codon is one ORF. The stop codon is
//! not part of the ORF length.

use crate::config::RunConfig;
use crate::errors::Result;
use crate::io::fasta;
use crate::observability::RunLog;
use crate::pipeline::context::RunContext;
use crate::pipeline::stage::{Stage, StageKind, StageOutput};
use crate::report::{ReportTable, Value};

const STOP_CODONS: [&[u8; 3]; 3] = [b"TAA", b"TAG", b"TGA"];

fn is_stop(codon: &[u8]) -> bool {
    let upper = [
        codon[0].to_ascii_uppercase(),
        codon[1].to_ascii_uppercase(),
        codon[2].to_ascii_uppercase(),
    ];
    STOP_CODONS.iter().any(|stop| **stop == upper)
}

pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|base| match base.to_ascii_uppercase() {
            b'A' => b'T',
            b'T' => b'A',
            b'C' => b'G',
            b'G' => b'C',
            _ => b'N',
        })
        .collect()
}

/// ORFs of at least `min_length` bp in one reading frame.
fn count_in_frame(strand: &[u8], frame: usize, min_length: u64) -> usize {
    let mut count = 0;
    let mut codons = 0u64;
    let mut close = |codons: &mut u64| {
        if *codons > 0 && *codons * 3 >= min_length {
            count += 1;
        }
        *codons = 0;
    };
    for codon in strand.get(frame..).unwrap_or(&[]).chunks_exact(3) {
        if is_stop(codon) {
            close(&mut codons);
        } else {
            codons += 1;
        }
    }
    close(&mut codons);
    count
}

/// ORFs of at least `min_length` bp over all six frames of `seq`.
pub fn count_orfs(seq: &[u8], min_length: u64) -> usize {
    let reverse = reverse_complement(seq);
    [seq, reverse.as_slice()]
        .iter()
        .flat_map(|strand| (0..3).map(move |frame| count_in_frame(strand, frame, min_length)))
        .sum()
}

pub fn orf_column(min_length: u64) -> String {
    format!("# ORFs (>= {} bp)", min_length)
}

/// One ORF count column for a single minimum length.
pub struct OrfSearch {
    min_length: u64,
}

impl OrfSearch {
    pub fn new(min_length: u64) -> Self {
        Self { min_length }
    }
}

impl Stage for OrfSearch {
    fn kind(&self) -> StageKind {
        StageKind::OrfSearch
    }

    fn name(&self) -> String {
        format!("{} (>= {} bp)", self.kind().dir_name(), self.min_length)
    }

    fn is_applicable(&self, config: &RunConfig) -> bool {
        config.genes.is_none() && !config.comparison_mode
    }

    fn run(
        &self,
        ctx: &mut RunContext<'_>,
        _table: &ReportTable,
        log: &mut RunLog,
    ) -> Result<StageOutput> {
        log.info(format!("Counting ORFs >= {} bp...", self.min_length));
        let mut output = StageOutput::with_columns([orf_column(self.min_length)]);
        for assembly in ctx.assemblies() {
            let count: usize = fasta::read_records(&assembly.corrected_path)?
                .iter()
                .map(|record| count_orfs(&record.seq, self.min_length))
                .sum();
            log.info(format!("  {}: {} ORFs", assembly.identity, count));
            output.insert(assembly.identity.clone(), vec![Value::from(count)]);
        }
        Ok(output)
    }
}
