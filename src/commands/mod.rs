//! Command implementations behind the `asmqc` binary.
//!
//! - **evaluate**: allocate the results directory, sanitize the inputs and
//!   run the stage pipeline

pub mod evaluate;

pub use evaluate::{allocate_layout, execute, run, results_dir_name};
