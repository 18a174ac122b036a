//! FASTA reading and writing.
//!
//! Thin layer over `bio::io::fasta` with gzip support through `flate2`.
//! Records keep their full header line (id plus description) because the
//! sanitizer rewrites the whole line.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

use bio::io::fasta;
use flate2::read::MultiGzDecoder;

use crate::errors::{Error, IoContext, Result};

const GZIP_EXTENSION: &str = "gz";

/// One FASTA entry: the header without `>` and the raw sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub header: String,
    pub seq: Vec<u8>,
}

impl FastaRecord {
    pub fn new(header: impl Into<String>, seq: impl Into<Vec<u8>>) -> Self {
        Self {
            header: header.into(),
            seq: seq.into(),
        }
    }

    pub fn len(&self) -> u64 {
        self.seq.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

/// True when the extension says the file is gzip-compressed.
pub fn is_compressed(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(GZIP_EXTENSION))
}

/// File name with a compression extension removed (`a.fa.gz` → `a.fa`).
pub fn uncompressed_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if is_compressed(path) {
        Path::new(&name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(name)
    } else {
        name
    }
}

/// Decompress `source` into `destination`, overwriting it.
pub fn decompress_to(source: &Path, destination: &Path) -> Result<PathBuf> {
    let input = File::open(source).with_path("Cannot open compressed file", source)?;
    let mut decoder = MultiGzDecoder::new(BufReader::new(input));
    let output = File::create(destination).with_path("Cannot create working copy", destination)?;
    let mut writer = BufWriter::new(output);
    io::copy(&mut decoder, &mut writer).with_path("Cannot decompress", source)?;
    io::Write::flush(&mut writer).with_path("Cannot write working copy", destination)?;
    tracing::debug!("Decompressed {} to {}", source.display(), destination.display());
    Ok(destination.to_path_buf())
}

fn open(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).with_path("Cannot open FASTA file", path)?;
    if is_compressed(path) {
        Ok(Box::new(MultiGzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(file))
    }
}

/// Read every record of a (possibly gzip-compressed) FASTA file in order.
pub fn read_records(path: &Path) -> Result<Vec<FastaRecord>> {
    let reader = fasta::Reader::new(open(path)?);
    reader
        .records()
        .map(|record| {
            let record = record.map_err(|e| Error::Fasta {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            let header = match record.desc() {
                Some(desc) => format!("{} {}", record.id(), desc),
                None => record.id().to_string(),
            };
            Ok(FastaRecord {
                header,
                seq: record.seq().to_vec(),
            })
        })
        .collect()
}

/// Sequence lengths in file order.
pub fn read_lengths(path: &Path) -> Result<Vec<u64>> {
    Ok(read_records(path)?.iter().map(FastaRecord::len).collect())
}

/// Write records (one sequence line each), replacing `path`.
pub fn write_records(path: &Path, records: &[FastaRecord]) -> Result<()> {
    let file = File::create(path).with_path("Cannot create FASTA file", path)?;
    let mut writer = fasta::Writer::new(file);
    for record in records {
        writer
            .write(&record.header, None, &record.seq)
            .with_path("Cannot write FASTA record", path)?;
    }
    writer.flush().with_path("Cannot write FASTA file", path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::TempDir;

    const SAMPLE: &str = indoc! {"
        >contig 1 some description
        ACGT
        ACGT
        >contig_2
        NNA
    "};

    #[test]
    fn test_read_multiline_records_with_descriptions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.fa");
        std::fs::write(&path, SAMPLE).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(
            records,
            vec![
                FastaRecord::new("contig 1 some description", b"ACGTACGT".to_vec()),
                FastaRecord::new("contig_2", b"NNA".to_vec()),
            ]
        );
        assert_eq!(read_lengths(&path).unwrap(), vec![8, 3]);
    }

    #[test]
    fn test_gzip_input_reads_and_decompresses() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.fa.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(SAMPLE.as_bytes()).unwrap();
        encoder.finish().unwrap();

        assert!(is_compressed(&path));
        assert_eq!(uncompressed_name(&path), "a.fa");
        assert_eq!(read_lengths(&path).unwrap(), vec![8, 3]);

        let copy = decompress_to(&path, &dir.path().join("a.fa")).unwrap();
        assert_eq!(std::fs::read_to_string(copy).unwrap(), SAMPLE);
    }

    #[test]
    fn test_write_then_read_keeps_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.fasta");
        let records = vec![
            FastaRecord::new("b", b"AAAA".to_vec()),
            FastaRecord::new("a", b"C".to_vec()),
        ];
        write_records(&path, &records).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), ">b\nAAAA\n>a\nC\n");
        assert_eq!(read_records(&path).unwrap(), records);
    }

    #[test]
    fn test_empty_file_has_no_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.fa");
        std::fs::write(&path, "").unwrap();
        assert!(read_records(&path).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = read_records(&dir.path().join("nope.fa"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }
}
