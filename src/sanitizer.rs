//! Input correction.
//!
//! Every assembly is copied into the corrected-input directory under a stable
//! identity before any stage sees it. Short contigs are filtered out, headers
//! are reduced to word characters and ambiguity codes are replaced by concrete
//! bases, so that external tools with strict naming rules accept the files.
//! The per-threshold count/length columns are computed here, from the lengths
//! before filtering.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::bytes::{Captures, Regex as BytesRegex};
use regex::Regex;

use crate::config::RunConfig;
use crate::errors::{Error, IoContext, Result};
use crate::io::fasta::{self, FastaRecord};
use crate::observability::RunLog;
use crate::report::{ReportTable, Value};

/// Subdirectory of the corrected-input directory for decompressed inputs.
pub const DECOMPRESSED_DIR: &str = "decompressed";

const CORRECTED_EXTENSION: &str = "fasta";

/// Ambiguity code → concrete base.
const AMBIGUITY_TABLE: [(u8, u8); 10] = [
    (b'M', b'A'),
    (b'K', b'G'),
    (b'R', b'A'),
    (b'Y', b'C'),
    (b'W', b'A'),
    (b'S', b'C'),
    (b'V', b'A'),
    (b'B', b'C'),
    (b'H', b'A'),
    (b'D', b'A'),
];

static AMBIGUITY_PATTERN: Lazy<BytesRegex> = Lazy::new(|| {
    let alternatives: Vec<String> = AMBIGUITY_TABLE
        .iter()
        .map(|(code, _)| regex::escape(&(*code as char).to_string()))
        .collect();
    BytesRegex::new(&format!("({})", alternatives.join("|"))).unwrap()
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s").unwrap());
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W").unwrap());

/// One input assembly after correction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    /// Position of the file on the command line
    pub index: usize,
    pub identity: String,
    pub source_path: PathBuf,
    pub corrected_path: PathBuf,
    /// Contig lengths in file order, before filtering
    pub lengths: Vec<u64>,
}

/// Column names of the threshold bins, counts first then total lengths.
pub fn threshold_columns(thresholds: &[u64]) -> Vec<String> {
    let counts = thresholds.iter().map(|t| format!("# contigs >= {}", t));
    let totals = thresholds.iter().map(|t| format!("Total length (>= {})", t));
    counts.chain(totals).collect()
}

/// Values for [`threshold_columns`]. Bins are inclusive and overlapping.
pub fn threshold_values(lengths: &[u64], thresholds: &[u64]) -> Vec<Value> {
    let counts = thresholds
        .iter()
        .map(|&t| Value::from(lengths.iter().filter(|&&l| l >= t).count()));
    let totals = thresholds
        .iter()
        .map(|&t| Value::from(lengths.iter().filter(|&&l| l >= t).sum::<u64>()));
    counts.chain(totals).collect()
}

/// Header restricted to word characters: whitespace becomes `_`, everything
/// else that is not a word character is dropped.
pub fn sanitize_header(header: &str) -> String {
    let underscored = WHITESPACE.replace_all(header, "_");
    NON_WORD.replace_all(&underscored, "").into_owned()
}

/// Replace every ambiguity code in one pass over the sequence.
pub fn substitute_ambiguous(seq: &[u8]) -> Vec<u8> {
    AMBIGUITY_PATTERN
        .replace_all(seq, |caps: &Captures| {
            let code = caps[0][0];
            let base = AMBIGUITY_TABLE
                .iter()
                .find(|(c, _)| *c == code)
                .map_or(code, |(_, b)| *b);
            vec![base]
        })
        .into_owned()
}

/// Input file stem: the name without `.gz` and without its last extension.
fn input_stem(path: &Path) -> String {
    let name = fasta::uncompressed_name(path);
    Path::new(&name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or(name)
}

fn identity_from_stem(stem: &str) -> String {
    stem.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Identity derived from the input file name alone.
pub fn derive_identity(path: &Path) -> String {
    identity_from_stem(&input_stem(path))
}

fn corrected_path(corrected_dir: &Path, identity: &str) -> PathBuf {
    corrected_dir.join(format!("{}.{}", identity, CORRECTED_EXTENSION))
}

/// First identity whose corrected path is still free. Collisions retry with
/// `<stem>__2`, `<stem>__3`, …
fn reserve_identity(path: &Path, corrected_dir: &Path) -> (String, PathBuf) {
    let identity = derive_identity(path);
    let candidate = corrected_path(corrected_dir, &identity);
    if !candidate.exists() {
        return (identity, candidate);
    }
    let stem = input_stem(path);
    let mut n = 2;
    loop {
        let identity = identity_from_stem(&format!("{}__{}", stem, n));
        let candidate = corrected_path(corrected_dir, &identity);
        if !candidate.exists() {
            return (identity, candidate);
        }
        n += 1;
    }
}

/// Working copy of the reference: compressed references are unpacked into
/// `corrected_dir`, plain ones are used in place.
pub fn prepare_reference(reference: &Path, corrected_dir: &Path) -> Result<PathBuf> {
    if fasta::is_compressed(reference) {
        let destination = corrected_dir.join(fasta::uncompressed_name(reference));
        fasta::decompress_to(reference, &destination)
    } else {
        Ok(reference.to_path_buf())
    }
}

/// Filter and rewrite records. `None` disables the length filter.
pub fn correct_records(records: Vec<FastaRecord>, min_contig: Option<u64>) -> Vec<FastaRecord> {
    records
        .into_iter()
        .filter(|record| min_contig.map_or(true, |min| record.len() >= min))
        .map(|record| FastaRecord {
            header: sanitize_header(&record.header),
            seq: substitute_ambiguous(&record.seq),
        })
        .collect()
}

/// Correct every input assembly of `config` into `corrected_dir`.
///
/// `table` must be fresh. Adds one row per assembly (identity plus threshold columns),
/// then removes the rows of assemblies with no contig left after filtering.
/// Returns the usable assemblies in command-line order.
pub fn sanitize_assemblies(
    config: &RunConfig,
    corrected_dir: &Path,
    table: &mut ReportTable,
    log: &mut RunLog,
) -> Result<Vec<Assembly>> {
    table.initialize_header(threshold_columns(&config.contig_thresholds))?;
    let min_contig = config.effective_min_contig();

    log.info("Correcting contig files...");
    let mut usable = Vec::new();
    let mut unusable = Vec::new();
    for (index, source) in config.contigs.iter().enumerate() {
        let readable = working_copy(source, corrected_dir)?;
        let (identity, corrected) = reserve_identity(source, corrected_dir);

        let records = fasta::read_records(&readable)?;
        let lengths: Vec<u64> = records.iter().map(FastaRecord::len).collect();

        let mut row = vec![Value::from(index), Value::from(identity.as_str())];
        row.extend(threshold_values(&lengths, &config.contig_thresholds));
        table.add_row(identity.clone(), row)?;

        let corrected_records = correct_records(records, min_contig);
        fasta::write_records(&corrected, &corrected_records)?;
        log.info(format!("  {} ==> {}", source.display(), identity));

        let assembly = Assembly {
            index,
            identity,
            source_path: source.clone(),
            corrected_path: corrected,
            lengths,
        };
        if corrected_records.is_empty() {
            unusable.push(assembly);
        } else {
            usable.push(assembly);
        }
    }
    log.info("  Done.");

    let min_contig = min_contig.unwrap_or(0);
    if !unusable.is_empty() {
        log.blank();
        log.warn(format!(
            "Warning! These files will not be processed because they don't have contigs >= {} bp!",
            min_contig
        ));
        for assembly in &unusable {
            log.warn(format!(
                "  {} ==> {}",
                assembly.source_path.display(),
                assembly.identity
            ));
            table.remove_row(&assembly.identity);
        }
        log.blank();
    }

    if usable.is_empty() {
        return Err(Error::NoUsableAssemblies { min_contig });
    }
    tracing::debug!(
        usable = usable.len(),
        unusable = unusable.len(),
        "Sanitized input assemblies"
    );
    Ok(usable)
}

/// Path to read an input from: compressed inputs are unpacked first.
fn working_copy(source: &Path, corrected_dir: &Path) -> Result<PathBuf> {
    if !fasta::is_compressed(source) {
        return Ok(source.to_path_buf());
    }
    let dir = corrected_dir.join(DECOMPRESSED_DIR);
    fs::create_dir_all(&dir).with_path("Cannot create directory", &dir)?;
    fasta::decompress_to(source, &dir.join(fasta::uncompressed_name(source)))
}
