//! Shared state handed from stage to stage.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::RunConfig;
use crate::errors::{Error, Result};
use crate::io::fasta;
use crate::io::OutputLayout;
use crate::sanitizer::Assembly;

/// Files and directories one stage leaves for later ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// Directory holding one `<identity>.coords` file per assembly
    AlignmentDir,
    GenomeInfo,
    RowMajorReport,
    ColumnMajorReport,
}

/// Reference sequence names and lengths, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceInfo {
    pub path: PathBuf,
    pub sequences: Vec<(String, u64)>,
    pub gc_percent: Option<f64>,
}

impl ReferenceInfo {
    pub fn total_length(&self) -> u64 {
        self.sequences.iter().map(|(_, len)| len).sum()
    }

    pub fn sequence_length(&self, name: &str) -> Option<u64> {
        self.sequences
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, len)| *len)
    }
}

pub struct RunContext<'a> {
    config: &'a RunConfig,
    layout: OutputLayout,
    assemblies: Vec<Assembly>,
    reference: Option<PathBuf>,
    reference_info: Option<ReferenceInfo>,
    artifacts: HashMap<Artifact, PathBuf>,
}

impl<'a> RunContext<'a> {
    pub fn new(
        config: &'a RunConfig,
        layout: OutputLayout,
        assemblies: Vec<Assembly>,
        reference: Option<PathBuf>,
    ) -> Self {
        Self {
            config,
            layout,
            assemblies,
            reference,
            reference_info: None,
            artifacts: HashMap::new(),
        }
    }

    pub fn config(&self) -> &'a RunConfig {
        self.config
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Usable assemblies in command-line order.
    pub fn assemblies(&self) -> &[Assembly] {
        &self.assemblies
    }

    /// Reference working copy (decompressed when the input was gzipped).
    pub fn reference(&self) -> Option<&Path> {
        self.reference.as_deref()
    }

    /// Reference path, or a stage failure for stages that cannot run without it.
    pub fn require_reference(&self, stage: &str) -> Result<PathBuf> {
        self.reference
            .clone()
            .ok_or_else(|| Error::stage(stage, "no reference genome"))
    }

    /// Sequence names, lengths and GC of the reference, read once per run.
    pub fn reference_info(&mut self) -> Result<Option<&ReferenceInfo>> {
        if self.reference_info.is_none() {
            if let Some(path) = &self.reference {
                let records = fasta::read_records(path)?;
                let sequences = records
                    .iter()
                    .map(|r| (sequence_name(&r.header), r.len()))
                    .collect();
                let gc_percent = gc_percent(records.iter().map(|r| r.seq.as_slice()));
                self.reference_info = Some(ReferenceInfo {
                    path: path.clone(),
                    sequences,
                    gc_percent,
                });
            }
        }
        Ok(self.reference_info.as_ref())
    }

    /// Register an artifact. Each artifact is produced exactly once per run.
    pub fn register(&mut self, artifact: Artifact, path: PathBuf) -> Result<()> {
        if let Some(existing) = self.artifacts.get(&artifact) {
            return Err(Error::Pipeline(format!(
                "artifact {:?} already registered at {}",
                artifact,
                existing.display()
            )));
        }
        tracing::debug!("Artifact {:?} at {}", artifact, path.display());
        self.artifacts.insert(artifact, path);
        Ok(())
    }

    pub fn artifact(&self, artifact: Artifact) -> Option<&Path> {
        self.artifacts.get(&artifact).map(PathBuf::as_path)
    }

    /// Artifact path, or a stage failure naming what was missing.
    pub fn require_artifact(&self, artifact: Artifact, stage: &str) -> Result<PathBuf> {
        self.artifact(artifact)
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::stage(stage, format!("missing artifact {:?}", artifact)))
    }
}

/// First word of a FASTA header, as alignment tools name sequences.
pub fn sequence_name(header: &str) -> String {
    header.split_whitespace().next().unwrap_or("").to_string()
}

/// GC share of the unambiguous bases, in percent. `None` without any
/// A/C/G/T base.
pub fn gc_percent<'s>(sequences: impl IntoIterator<Item = &'s [u8]>) -> Option<f64> {
    let mut gc = 0u64;
    let mut acgt = 0u64;
    for seq in sequences {
        for base in seq {
            match base.to_ascii_uppercase() {
                b'G' | b'C' => {
                    gc += 1;
                    acgt += 1;
                }
                b'A' | b'T' => acgt += 1,
                _ => {}
            }
        }
    }
    (acgt > 0).then(|| gc as f64 * 100.0 / acgt as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_artifacts_are_append_only() {
        let config = RunConfig::new(vec![]);
        let mut ctx = RunContext::new(&config, OutputLayout::new("/tmp/run", None), vec![], None);
        ctx.register(Artifact::AlignmentDir, PathBuf::from("/tmp/run/alignment"))
            .unwrap();
        let err = ctx
            .register(Artifact::AlignmentDir, PathBuf::from("/elsewhere"))
            .unwrap_err();
        assert!(matches!(err, Error::Pipeline(_)));
        assert_eq!(
            ctx.artifact(Artifact::AlignmentDir),
            Some(Path::new("/tmp/run/alignment"))
        );
        assert!(ctx.require_artifact(Artifact::GenomeInfo, "extra_report").is_err());
    }

    #[test]
    fn test_reference_info_is_read_once() {
        let dir = TempDir::new().unwrap();
        let reference = dir.path().join("ref.fa");
        std::fs::write(&reference, ">chr1 main\nGGCC\n>chr2\nAATTNN\n").unwrap();
        let config = RunConfig::new(vec![]);
        let mut ctx = RunContext::new(
            &config,
            OutputLayout::new(dir.path(), None),
            vec![],
            Some(reference.clone()),
        );

        let info = ctx.reference_info().unwrap().unwrap().clone();
        assert_eq!(
            info.sequences,
            vec![("chr1".to_string(), 4), ("chr2".to_string(), 6)]
        );
        assert_eq!(info.total_length(), 10);
        assert_eq!(info.gc_percent, Some(50.0));

        std::fs::remove_file(&reference).unwrap();
        assert!(ctx.reference_info().unwrap().is_some());
    }

    #[test]
    fn test_gc_ignores_ambiguous_bases() {
        assert_eq!(gc_percent([b"NNNN".as_slice()]), None);
        assert_eq!(gc_percent([b"gcAT".as_slice(), b"NN".as_slice()]), Some(50.0));
    }
}
