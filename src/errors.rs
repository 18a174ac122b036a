//! Error taxonomy for an evaluation run.
//!
//! Errors fall into four groups, each with its own process exit code:
//!
//! - usage/configuration errors (exit 1): bad flags, contradictory options,
//!   nothing left to evaluate
//! - missing input files (exit 2): reported before any directory is created
//! - runtime failures (exit 3): I/O, external tools, pipeline invariants
//!
//! `anyhow` is only used at the binary edge; library code returns
//! [`Result`] with a typed [`Error`].

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Exit code for usage and configuration errors.
pub const EXIT_USAGE: u8 = 1;
/// Exit code for input files that do not exist.
pub const EXIT_FILE_NOT_FOUND: u8 = 2;
/// Exit code for failures during the run itself.
pub const EXIT_RUNTIME: u8 = 3;

/// Main error type for asmqc operations
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or contradictory command-line options
    #[error("{0}")]
    Usage(String),

    /// Invalid configuration file or resolved configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A file named on the command line does not exist
    #[error("Error. File not found ({what}): {}", path.display())]
    FileNotFound { what: &'static str, path: PathBuf },

    /// Results or archive directory could not be reserved
    #[error("Cannot create output directory {}: {source}", path.display())]
    Allocation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File system error with path context
    #[error("{message} ({}): {source}", path.display())]
    Io {
        message: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Report output could not be written
    #[error("Cannot write report: {0}")]
    ReportWrite(#[source] std::io::Error),

    /// Malformed sequence file
    #[error("Cannot parse FASTA {}: {message}", path.display())]
    Fasta { path: PathBuf, message: String },

    /// Every input assembly was dropped by the sanitizer
    #[error("No assemblies left to evaluate: none has contigs >= {min_contig} bp")]
    NoUsableAssemblies { min_contig: u64 },

    /// A stage result does not line up with the report table
    #[error("Report table mismatch: {0}")]
    TableMismatch(String),

    /// Stage list violates the ordering rules
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// A stage aborted the run
    #[error("Stage '{stage}' failed: {message}")]
    StageFailed { stage: String, message: String },

    /// External program could not be located or exited unsuccessfully
    #[error("External tool '{tool}' failed: {message}")]
    Tool { tool: String, message: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Create an I/O error with path context
    pub fn io(message: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            path: path.into(),
            source,
        }
    }

    /// Create a stage failure
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StageFailed {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Create an external tool failure
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) | Self::Config(_) | Self::Toml(_) | Self::NoUsableAssemblies { .. } => {
                EXIT_USAGE
            }
            Self::FileNotFound { .. } => EXIT_FILE_NOT_FOUND,
            _ => EXIT_RUNTIME,
        }
    }
}

/// Extension for attaching path context to `std::io::Result`.
pub trait IoContext<T> {
    fn with_path(self, message: &str, path: &std::path::Path) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn with_path(self, message: &str, path: &std::path::Path) -> Result<T> {
        self.map_err(|source| Error::io(message, path, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_follow_taxonomy() {
        assert_eq!(Error::Usage("no inputs".into()).exit_code(), 1);
        assert_eq!(
            Error::NoUsableAssemblies { min_contig: 500 }.exit_code(),
            1
        );
        assert_eq!(
            Error::FileNotFound {
                what: "contigs",
                path: PathBuf::from("missing.fa"),
            }
            .exit_code(),
            2
        );
        assert_eq!(Error::stage("alignment", "boom").exit_code(), 3);
    }

    #[test]
    fn test_file_not_found_message() {
        let err = Error::FileNotFound {
            what: "reference",
            path: PathBuf::from("ref.fa"),
        };
        assert_eq!(err.to_string(), "Error. File not found (reference): ref.fa");
    }

    #[test]
    fn test_io_context_attaches_path() {
        let result: std::io::Result<()> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let err = result
            .with_path("Cannot read", std::path::Path::new("a.fa"))
            .unwrap_err();
        assert!(err.to_string().starts_with("Cannot read (a.fa)"));
    }
}
