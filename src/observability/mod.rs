//! Output and diagnostics for a run.
//!
//! - [`RunLog`]: operator output duplicated to console and `asmqc.log`
//! - [`init_tracing`]: `tracing` subscriber for developer diagnostics

pub mod diagnostics;
pub mod run_log;

pub use diagnostics::init_tracing;
pub use run_log::RunLog;
