//! External programs used by the stages.
//!
//! Programs are located lazily, when a stage actually needs them: an
//! explicit path from the `[tools]` table wins, otherwise the conventional
//! name is looked up on `PATH`. Every call blocks until the program exits.

use std::ffi::OsStr;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::ToolPaths;
use crate::errors::{Error, IoContext, Result};

pub const NUCMER: &str = "nucmer";
pub const SHOW_COORDS: &str = "show-coords";
pub const MAUVE: &str = "progressiveMauve";
pub const GENEMARK: &str = "gmhmmp";
pub const GAGE: &str = "getCorrectnessStats.sh";

/// Lines of stderr quoted in a failure message.
const STDERR_TAIL: usize = 5;

/// A located external program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTool {
    name: String,
    program: PathBuf,
}

impl ExternalTool {
    /// Locate `name`, preferring `configured` when given.
    pub fn resolve(name: &str, configured: Option<&Path>) -> Result<Self> {
        let program = match configured {
            Some(path) if path.components().count() > 1 => {
                if path.is_file() {
                    path.to_path_buf()
                } else {
                    return Err(Error::tool(
                        name,
                        format!("configured path {} does not exist", path.display()),
                    ));
                }
            }
            Some(path) => which::which(path)
                .map_err(|e| Error::tool(name, format!("{} not found in PATH: {}", path.display(), e)))?,
            None => which::which(name)
                .map_err(|e| Error::tool(name, format!("not found in PATH: {}", e)))?,
        };
        tracing::debug!("Using {} at {}", name, program.display());
        Ok(Self {
            name: name.to_string(),
            program,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run to completion. Standard output goes to `stdout_to` when given and
    /// is discarded otherwise; a non-zero exit is an error quoting stderr.
    pub fn run<I, S>(&self, args: I, stdout_to: Option<&Path>) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.program);
        command.args(args).stdin(Stdio::null()).stderr(Stdio::piped());
        match stdout_to {
            Some(path) => {
                let file = File::create(path).with_path("Cannot create tool output", path)?;
                command.stdout(Stdio::from(file));
            }
            None => {
                command.stdout(Stdio::null());
            }
        }

        tracing::debug!(tool = %self.name, "Running {:?}", command);
        let output = command
            .output()
            .map_err(|e| Error::tool(&self.name, format!("cannot start {}: {}", self.program.display(), e)))?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL)..].join("\n");
        Err(Error::tool(
            &self.name,
            format!("exited with {}: {}", output.status, tail.trim()),
        ))
    }
}

/// Whole-genome aligner producing a coords file.
pub trait Aligner {
    fn name(&self) -> &str;

    /// Align `contigs` against `reference`; intermediate files go into
    /// `work_dir`, the tab-separated coordinates into `coords`.
    fn align(&self, reference: &Path, contigs: &Path, work_dir: &Path, coords: &Path) -> Result<()>;
}

/// `nucmer` followed by `show-coords -THrcl`.
#[derive(Debug, Clone, Default)]
pub struct NucmerAligner {
    tools: ToolPaths,
}

impl NucmerAligner {
    pub fn new(tools: ToolPaths) -> Self {
        Self { tools }
    }
}

impl Aligner for NucmerAligner {
    fn name(&self) -> &str {
        NUCMER
    }

    fn align(&self, reference: &Path, contigs: &Path, work_dir: &Path, coords: &Path) -> Result<()> {
        let nucmer = ExternalTool::resolve(NUCMER, self.tools.nucmer.as_deref())?;
        let show_coords = ExternalTool::resolve(SHOW_COORDS, self.tools.show_coords.as_deref())?;

        let stem = coords
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "alignment".to_string());
        let prefix = work_dir.join(&stem);
        nucmer.run(
            [
                OsStr::new("--maxmatch"),
                OsStr::new("-p"),
                prefix.as_os_str(),
                reference.as_os_str(),
                contigs.as_os_str(),
            ],
            None,
        )?;

        let delta = work_dir.join(format!("{}.delta", stem));
        show_coords.run([OsStr::new("-THrcl"), delta.as_os_str()], Some(coords))
    }
}
