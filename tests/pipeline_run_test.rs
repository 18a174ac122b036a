use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use asmqc::commands::run;
use asmqc::config::RunConfig;
use asmqc::io::{read_records, OutputLayout};
use asmqc::observability::RunLog;
use asmqc::tools::Aligner;
use asmqc::Result;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Places every contig at its exact occurrence in the reference.
struct ExactMatchAligner;

impl Aligner for ExactMatchAligner {
    fn name(&self) -> &str {
        "exact-match"
    }

    fn align(&self, reference: &Path, contigs: &Path, _work_dir: &Path, coords: &Path) -> Result<()> {
        let reference = &read_records(reference)?[0];
        let ref_name = reference.header.split_whitespace().next().unwrap_or_default();
        let mut out = fs::File::create(coords).unwrap();
        for contig in read_records(contigs)? {
            let len = contig.seq.len();
            let Some(start) = reference.seq.windows(len).position(|w| w == contig.seq.as_slice())
            else {
                continue;
            };
            let name = contig.header.split_whitespace().next().unwrap_or_default();
            writeln!(
                out,
                "{}\t{}\t1\t{}\t{}\t{}\t100.00\t{}\t{}\t0\t100.00\t{}\t{}",
                start + 1,
                start + len,
                len,
                len,
                len,
                reference.seq.len(),
                len,
                ref_name,
                name
            )
            .unwrap();
        }
        Ok(())
    }
}

fn genome(length: usize) -> Vec<u8> {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    (0..length)
        .map(|_| {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            b"ACGT"[(state >> 62) as usize]
        })
        .collect()
}

fn fasta(path: &Path, records: &[(&str, &[u8])]) -> PathBuf {
    let mut content = String::new();
    for (header, seq) in records {
        content.push_str(&format!(">{}\n{}\n", header, String::from_utf8_lossy(seq)));
    }
    fs::write(path, content).unwrap();
    path.to_path_buf()
}

struct Fixture {
    dir: TempDir,
    reference: PathBuf,
    good: PathBuf,
    short: PathBuf,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let seq = genome(5000);
    let reference = fasta(&dir.path().join("ref.fa"), &[("chr1 test genome", &seq)]);
    let good = fasta(
        &dir.path().join("good asm.fasta"),
        &[
            ("contig_1 len=2000", &seq[0..2000]),
            ("contig_2", &seq[2500..4000]),
            ("tiny", &seq[4500..4600]),
        ],
    );
    let short = fasta(&dir.path().join("short.fa"), &[("c1", &seq[0..300])]);
    Fixture {
        dir,
        reference,
        good,
        short,
    }
}

fn tsv_lines(path: &Path) -> Vec<Vec<String>> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| line.split('\t').map(String::from).collect())
        .collect()
}

#[test]
fn test_run_with_reference_produces_reports() {
    let fx = fixture();
    let out = fx.dir.path().join("out");
    fs::create_dir(&out).unwrap();
    let layout = OutputLayout::new(&out, None);

    let mut config = RunConfig::new(vec![fx.good.clone(), fx.short.clone()]);
    config.reference = Some(fx.reference.clone());
    config.orf_lengths = vec![90];
    let mut log = RunLog::sink();

    let summary = run(&config, &layout, Box::new(ExactMatchAligner), &mut log).unwrap();
    assert_eq!(
        summary.executed,
        vec![
            "basic_stats",
            "alignment",
            "aligned_stats",
            "genome_analysis",
            "orfs (>= 90 bp)",
            "report",
        ]
    );
    assert!(summary.skipped.contains(&"gage".to_string()));
    assert!(summary.skipped.contains(&"extra_report".to_string()));

    // the short assembly is reported once and dropped
    assert!(log
        .lines()
        .iter()
        .any(|l| l.contains("don't have contigs >= 500 bp")));

    let transposed = tsv_lines(&out.join("transposed_report.tsv"));
    assert_eq!(transposed.len(), 2);
    let header = &transposed[0];
    let row = &transposed[1];
    let cell = |name: &str| {
        let index = header.iter().position(|h| h == name).unwrap();
        row[index].clone()
    };
    assert_eq!(cell("Assembly"), "good_asm");
    assert_eq!(cell("# contigs >= 0"), "3");
    assert_eq!(cell("Total length"), "3500");
    assert_eq!(cell("N50"), "2000");
    assert_eq!(cell("# misassemblies"), "0");
    assert_eq!(cell("# unaligned contigs"), "0");
    assert_eq!(cell("NA50"), "2000");
    assert_eq!(cell("Genome fraction (%)"), "70.00");

    let report = fs::read_to_string(out.join("report.txt")).unwrap();
    assert!(report.starts_with("All statistics are based on contigs of size >= 500 bp"));
    assert!(out.join("alignment").join("good_asm.coords").is_file());
    assert!(out.join("genome_analysis").join("genome_info.txt").is_file());
    assert!(!out.join("corrected_input").exists());
}

#[test]
fn test_run_without_reference_skips_reference_stages() {
    let fx = fixture();
    let out = fx.dir.path().join("out");
    fs::create_dir(&out).unwrap();
    let layout = OutputLayout::new(&out, None);
    let config = RunConfig::new(vec![fx.good.clone()]);

    let summary = run(&config, &layout, Box::new(ExactMatchAligner), &mut RunLog::sink()).unwrap();
    for stage in ["alignment", "aligned_stats", "genome_analysis", "mauve"] {
        assert!(summary.skipped.contains(&stage.to_string()), "{}", stage);
    }
    assert!(summary.executed.contains(&"report".to_string()));
    assert!(!out.join("alignment").exists());

    let transposed = tsv_lines(&out.join("transposed_report.tsv"));
    assert!(!transposed[0].contains(&"NG50".to_string()));
}

#[test]
fn test_no_usable_assemblies_is_an_error() {
    let fx = fixture();
    let out = fx.dir.path().join("out");
    fs::create_dir(&out).unwrap();
    let layout = OutputLayout::new(&out, None);
    let config = RunConfig::new(vec![fx.short.clone()]);

    let err = run(&config, &layout, Box::new(ExactMatchAligner), &mut RunLog::sink()).unwrap_err();
    assert_eq!(err.exit_code(), 1);
    assert!(!out.join("report.txt").exists());
    assert!(!out.join("corrected_input").exists());
}

#[test]
fn test_archive_and_extra_report() {
    let fx = fixture();
    let out = fx.dir.path().join("out");
    let archive = fx.dir.path().join("archive_run");
    fs::create_dir(&out).unwrap();
    fs::create_dir(&archive).unwrap();
    let layout = OutputLayout::new(&out, Some(archive.clone()));

    let mut config = RunConfig::new(vec![fx.good.clone()]);
    config.reference = Some(fx.reference.clone());
    config.extra_report = true;
    config.save_archive = true;
    config.orf_lengths = vec![];

    let summary = run(&config, &layout, Box::new(ExactMatchAligner), &mut RunLog::sink()).unwrap();
    assert_eq!(summary.executed.last().map(String::as_str), Some("extra_report"));

    let extra = fs::read_to_string(out.join("extra_report.txt")).unwrap();
    assert!(extra.starts_with("Reference size: 5000 bp"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(archive.join("report.json")).unwrap()).unwrap();
    assert_eq!(json["min_contig"], 500);
    assert_eq!(json["assemblies"][0]["identity"], "good_asm");
    assert!(archive.join("extra_report.json").is_file());
}
