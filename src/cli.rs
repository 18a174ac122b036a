use clap::Parser;
use std::path::PathBuf;

use crate::config::{FileConfig, RunConfig};

#[derive(Parser, Debug)]
#[command(name = "asmqc")]
#[command(about = "Estimate genome assembly quality with various metrics and tools", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Assembly FASTA files (optionally .gz compressed)
    #[arg(value_name = "CONTIGS", required = true)]
    pub contigs: Vec<PathBuf>,

    /// Directory to store all result files [default: results_<datetime>]
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// File with a reference genome
    #[arg(short = 'R', long, value_name = "FILE")]
    pub reference: Option<PathBuf>,

    /// File with genes for a given species
    #[arg(short = 'G', long, value_name = "FILE")]
    pub genes: Option<PathBuf>,

    /// File with operons for a given species
    #[arg(short = 'O', long, value_name = "FILE")]
    pub operons: Option<PathBuf>,

    /// Lower threshold for contig length [default: 500]
    #[arg(short = 'M', long = "min-contig", value_name = "INT")]
    pub min_contig: Option<u64>,

    /// Comma-separated list of contig length thresholds [default: 0,1000]
    #[arg(short = 't', long = "contig-thresholds", value_name = "INT,INT,...", value_delimiter = ',')]
    pub contig_thresholds: Option<Vec<u64>>,

    /// Comma-separated list of threshold lengths of ORFs to search for [default: 600,1500,3000]
    #[arg(short = 'f', long = "orf", value_name = "INT,INT,...", value_delimiter = ',')]
    pub orf_lengths: Option<Vec<u64>>,

    /// Comma-separated list of gene length thresholds for the gene predictor [default: 0,300,1500,3000]
    #[arg(short = 'e', long = "genemark-thresholds", value_name = "INT,INT,...", value_delimiter = ',')]
    pub gene_lengths: Option<Vec<u64>>,

    /// Run the comparative whole-genome alignment (progressiveMauve)
    #[arg(short = 'm', long)]
    pub mauve: bool,

    /// Run the legacy comparison tool only (no length filtering)
    #[arg(short = 'g', long)]
    pub gage: bool,

    /// Genome is not circular (e.g., eukaryote)
    #[arg(short = 'n', long = "not-circular")]
    pub not_circular: bool,

    /// Reverse-complementary contigs should NOT be counted as misassemblies
    #[arg(short = 'd', long = "disable-rc")]
    pub disable_rc: bool,

    /// Run the external gene predictor (GeneMark)
    #[arg(short = 'k', long)]
    pub genemark: bool,

    /// Generate an extra report (extra_report.txt)
    #[arg(short = 'x', long = "extra-report")]
    pub extra_report: bool,

    /// Save the report to an archive directory in JSON format
    #[arg(short = 'a', long = "save-archive")]
    pub save_archive: bool,

    /// Archive directory used with --save-archive [default: archive]
    #[arg(long = "archive-dir", value_name = "DIR")]
    pub archive_dir: Option<PathBuf>,

    /// TOML file with defaults and external tool locations [default: ./asmqc.toml if present]
    #[arg(long, value_name = "FILE", env = "ASMQC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase diagnostic verbosity (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl Cli {
    /// Resolve the final configuration: command line > file > defaults.
    pub fn into_config(self, file: FileConfig) -> RunConfig {
        let mut config = RunConfig::new(self.contigs).with_file_defaults(file);

        config.output_dir = self.output_dir;
        config.reference = self.reference;
        config.genes = self.genes;
        config.operons = self.operons;
        if let Some(min_contig) = self.min_contig {
            config.min_contig = min_contig;
        }
        if let Some(thresholds) = self.contig_thresholds {
            config.contig_thresholds = thresholds;
        }
        if let Some(lengths) = self.orf_lengths {
            config.orf_lengths = lengths;
        }
        if let Some(lengths) = self.gene_lengths {
            config.gene_lengths = lengths;
        }
        if let Some(dir) = self.archive_dir {
            config.archive_dir = dir;
        }
        config.with_mauve = self.mauve;
        config.comparison_mode = self.gage;
        config.circular = !self.not_circular;
        config.count_rc_misassemblies = !self.disable_rc;
        config.with_genemark = self.genemark;
        config.extra_report = self.extra_report;
        config.save_archive = self.save_archive;
        config.dedup_lists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("asmqc").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_lists_are_comma_separated() {
        let cli = parse(&["-t", "0,500", "--orf", "90", "a.fa"]);
        assert_eq!(cli.contig_thresholds, Some(vec![0, 500]));
        assert_eq!(cli.orf_lengths, Some(vec![90]));
    }

    #[test]
    fn test_toggles_map_to_config() {
        let cli = parse(&["-n", "-d", "-x", "-a", "-R", "ref.fa", "a.fa", "b.fa"]);
        let config = cli.into_config(FileConfig::default());
        assert!(!config.circular);
        assert!(!config.count_rc_misassemblies);
        assert!(config.extra_report);
        assert!(config.save_archive);
        assert_eq!(config.contigs.len(), 2);
        assert_eq!(config.reference, Some(PathBuf::from("ref.fa")));
    }

    #[test]
    fn test_command_line_beats_file() {
        let file = FileConfig {
            min_contig: Some(100),
            contig_thresholds: Some(vec![5]),
            ..Default::default()
        };
        let config = parse(&["-M", "10", "a.fa"]).into_config(file);
        assert_eq!(config.min_contig, 10);
        assert_eq!(config.contig_thresholds, vec![5]);
    }

    #[test]
    fn test_output_dir_disables_latest_link() {
        let config = parse(&["-o", "out", "a.fa"]).into_config(FileConfig::default());
        assert!(!config.make_latest_symlink());
    }

    #[test]
    fn test_repeated_list_values_are_merged() {
        let file = FileConfig {
            gene_lengths: Some(vec![0, 300, 0]),
            ..Default::default()
        };
        let config = parse(&["-t", "0,0,1000", "-f", "600,600", "a.fa"]).into_config(file);
        assert_eq!(config.contig_thresholds, vec![0, 1000]);
        assert_eq!(config.orf_lengths, vec![600]);
        assert_eq!(config.gene_lengths, vec![0, 300]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_contigs_is_error() {
        let result = Cli::try_parse_from(["asmqc"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_threshold_is_error() {
        let result = Cli::try_parse_from(["asmqc", "-t", "0,abc", "a.fa"]);
        assert!(result.is_err());
    }
}
