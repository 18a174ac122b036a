use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ToolPaths;
use crate::errors::{Error, IoContext, Result};

/// Name of the configuration file picked up from the working directory.
pub const CONFIG_FILE_NAME: &str = "asmqc.toml";

/// Optional defaults read from `asmqc.toml`.
///
/// Every field is optional; command-line values take precedence and the
/// built-in defaults fill whatever neither source provides.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub min_contig: Option<u64>,

    #[serde(default)]
    pub contig_thresholds: Option<Vec<u64>>,

    #[serde(default)]
    pub orf_lengths: Option<Vec<u64>>,

    #[serde(default)]
    pub gene_lengths: Option<Vec<u64>>,

    #[serde(default)]
    pub archive_dir: Option<PathBuf>,

    #[serde(default)]
    pub tools: ToolPaths,
}

/// Pure function to parse config from a TOML string
pub fn parse_config(contents: &str) -> Result<FileConfig> {
    toml::from_str::<FileConfig>(contents).map_err(Error::from)
}

/// Load an explicitly requested config file. A missing file is an error.
pub fn load_config_from_path(path: &Path) -> Result<FileConfig> {
    let contents = fs::read_to_string(path).with_path("Cannot read config file", path)?;
    let config = parse_config(&contents)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Load `asmqc.toml` from `dir` if present, otherwise the defaults.
pub fn discover_config(dir: &Path) -> Result<FileConfig> {
    let candidate = dir.join(CONFIG_FILE_NAME);
    if candidate.is_file() {
        load_config_from_path(&candidate)
    } else {
        tracing::debug!("No {} in {}, using defaults", CONFIG_FILE_NAME, dir.display());
        Ok(FileConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let toml_content = indoc! {r#"
            min_contig = 200
            contig_thresholds = [0, 500]
            orf_lengths = [300]

            [tools]
            nucmer = "/opt/mummer/nucmer"
            genemark_model = "heu.mod"
        "#};
        let config = parse_config(toml_content).unwrap();
        assert_eq!(config.min_contig, Some(200));
        assert_eq!(config.contig_thresholds, Some(vec![0, 500]));
        assert_eq!(config.orf_lengths, Some(vec![300]));
        assert_eq!(config.gene_lengths, None);
        assert_eq!(config.tools.nucmer, Some(PathBuf::from("/opt/mummer/nucmer")));
        assert_eq!(config.tools.genemark_model, Some(PathBuf::from("heu.mod")));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result = parse_config("min_contigs = 3");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_toml() {
        let result = parse_config("invalid toml [[ content");
        assert!(result.is_err());
    }

    #[test]
    fn test_discover_without_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = discover_config(dir.path()).unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_discover_reads_file_in_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "min_contig = 10\n").unwrap();
        let config = discover_config(dir.path()).unwrap();
        assert_eq!(config.min_contig, Some(10));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let result = load_config_from_path(&dir.path().join("nope.toml"));
        assert!(result.is_err());
    }
}
