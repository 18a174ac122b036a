//! Concrete evaluation stages.

pub mod aligned_stats;
pub mod alignment;
pub mod basic_stats;
pub mod comparative;
pub mod comparison;
pub mod extra_report;
pub mod gene_prediction;
pub mod genome_analysis;
pub mod orfs;
pub mod report;

pub use aligned_stats::AlignedStats;
pub use alignment::{AlignmentBlock, AlignmentStage};
pub use basic_stats::BasicStats;
pub use comparative::ComparativeAlignment;
pub use comparison::Comparison;
pub use extra_report::ExtraReport;
pub use gene_prediction::GenePrediction;
pub use genome_analysis::GenomeAnalysis;
pub use orfs::OrfSearch;
pub use report::ReportStage;

use super::stage::Stage;
use crate::config::RunConfig;
use crate::tools::Aligner;

/// The full evaluation order. Every stage is listed; applicability decides
/// at run time which of them execute.
pub fn standard_stages(config: &RunConfig, aligner: Box<dyn Aligner>) -> Vec<Box<dyn Stage>> {
    let mut stages: Vec<Box<dyn Stage>> = vec![
        Box::new(BasicStats),
        Box::new(AlignmentStage::new(aligner)),
        Box::new(AlignedStats),
        Box::new(GenomeAnalysis),
        Box::new(ComparativeAlignment),
    ];
    stages.extend(
        config
            .orf_lengths
            .iter()
            .map(|&length| Box::new(OrfSearch::new(length)) as Box<dyn Stage>),
    );
    stages.push(Box::new(GenePrediction));
    stages.push(Box::new(ReportStage));
    stages.push(Box::new(ExtraReport));
    stages.push(Box::new(Comparison));
    stages
}

/// `N50`-style statistic: the length `N` and count `L` of the largest pieces
/// covering at least half of `total`. `None` when the pieces cannot reach it.
pub fn nx_stat(lengths: &[u64], total: u64) -> Option<(u64, usize)> {
    if total == 0 {
        return None;
    }
    let mut sorted = lengths.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let mut covered = 0u64;
    for (i, &length) in sorted.iter().enumerate() {
        covered += length;
        if covered * 2 >= total {
            return Some((length, i + 1));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::scheduler::Scheduler;
    use crate::tools::NucmerAligner;
    use std::path::PathBuf;

    #[test]
    fn test_nx_stat() {
        assert_eq!(nx_stat(&[2, 3, 4, 5, 6, 7, 8, 9, 10], 54), Some((8, 3)));
        assert_eq!(nx_stat(&[100], 100), Some((100, 1)));
        assert_eq!(nx_stat(&[10, 10], 100), None);
        assert_eq!(nx_stat(&[], 0), None);
    }

    #[test]
    fn test_one_orf_stage_per_length() {
        let mut config = RunConfig::new(vec![PathBuf::from("a.fa")]);
        config.orf_lengths = vec![90, 300];
        let scheduler =
            Scheduler::standard(&config, Box::new(NucmerAligner::default())).unwrap();
        let names = scheduler.stage_names();
        assert_eq!(
            names,
            vec![
                "basic_stats",
                "alignment",
                "aligned_stats",
                "genome_analysis",
                "mauve",
                "orfs (>= 90 bp)",
                "orfs (>= 300 bp)",
                "genemark",
                "report",
                "extra_report",
                "gage",
            ]
        );
    }
}
