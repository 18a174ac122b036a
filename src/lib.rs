// Export modules for library usage
pub mod cli;
pub mod commands;
pub mod config;
pub mod errors;
pub mod io;
pub mod observability;
pub mod pipeline;
pub mod report;
pub mod sanitizer;
pub mod tools;

// Re-export commonly used types
pub use crate::config::{FileConfig, RunConfig, ToolPaths};
pub use crate::errors::{Error, Result};
pub use crate::pipeline::{Scheduler, Stage, StageKind, StageOutput};
pub use crate::report::{Orientation, ReportTable, Value};
pub use crate::sanitizer::Assembly;
pub use crate::tools::{Aligner, ExternalTool, NucmerAligner};
