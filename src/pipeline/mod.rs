//! Stage pipeline for one evaluation run.
//!
//! A [`Scheduler`] owns an ordered list of [`Stage`]s. Each stage reads the
//! shared [`RunContext`] (configuration, layout, corrected assemblies and
//! artifacts published by earlier stages) and returns a [`StageOutput`]
//! that the scheduler merges into the report table.

pub mod context;
pub mod scheduler;
pub mod stage;
pub mod stages;

pub use context::{Artifact, ReferenceInfo, RunContext};
pub use scheduler::{ScheduleSummary, Scheduler, StageTiming};
pub use stage::{Stage, StageKind, StageOutput};
