//! One evaluation run, from output allocation to cleanup.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Local};
use colored::Colorize;

use crate::config::RunConfig;
use crate::errors::{Result, EXIT_RUNTIME};
use crate::io::allocator::absolutize;
use crate::io::{reserve_dir, update_latest, OutputLayout, ScratchDir, LATEST_LINK};
use crate::observability::RunLog;
use crate::pipeline::{ScheduleSummary, Scheduler};
use crate::report::ReportTable;
use crate::sanitizer::{prepare_reference, sanitize_assemblies};
use crate::tools::{Aligner, NucmerAligner};

/// Timestamped directory name, e.g. `results_2024_03_01_14_05_09`.
pub fn results_dir_name(now: &DateTime<Local>) -> String {
    now.format("results_%Y_%m_%d_%H_%M_%S").to_string()
}

/// Reserve the results directory (and the archive directory when
/// archiving), updating the `latest` links for timestamped names.
pub fn allocate_layout(config: &RunConfig, now: &DateTime<Local>) -> Result<OutputLayout> {
    let name = results_dir_name(now);
    let desired = match &config.output_dir {
        Some(dir) => absolutize(dir)?,
        None => absolutize(Path::new(&name))?,
    };
    let root = reserve_dir(&desired)?;
    if config.make_latest_symlink() {
        link_latest(&root);
    }

    let archive = if config.save_archive {
        let base = absolutize(&config.archive_dir)?;
        let archive = reserve_dir(&base.join(&name))?;
        link_latest(&archive);
        Some(archive)
    } else {
        None
    };
    Ok(OutputLayout::new(root, archive))
}

fn link_latest(target: &Path) {
    let Some(parent) = target.parent() else {
        return;
    };
    if !update_latest(&parent.join(LATEST_LINK), target) {
        tracing::debug!("No '{}' link for {}", LATEST_LINK, target.display());
    }
}

/// Sanitize the inputs and run every applicable stage.
///
/// The corrected-input directory exists only for the duration of this
/// call.
pub fn run(
    config: &RunConfig,
    layout: &OutputLayout,
    aligner: Box<dyn Aligner>,
    log: &mut RunLog,
) -> Result<ScheduleSummary> {
    let scratch = ScratchDir::create(layout.corrected_dir())?;

    let reference: Option<PathBuf> = config
        .reference
        .as_deref()
        .map(|reference| prepare_reference(reference, scratch.path()))
        .transpose()?;
    if let Some(reference) = &config.reference {
        log.info(format!("Reference: {}", reference.display()));
    }

    let mut table = ReportTable::new();
    let assemblies = sanitize_assemblies(config, scratch.path(), &mut table, log)?;
    log.blank();

    let scheduler = Scheduler::standard(config, aligner)?;
    tracing::debug!(stages = ?scheduler.stage_names(), "Built stage list");
    let summary = {
        let mut ctx = crate::pipeline::RunContext::new(config, layout.clone(), assemblies, reference);
        scheduler.run(&mut ctx, &mut table, log)?
    };

    scratch.release()?;
    for timing in &summary.timings {
        tracing::info!("{}", timing.format());
    }
    Ok(summary)
}

/// Run the evaluation described by `config` and return the process exit
/// code. Every error after the log is open is written through it.
pub fn execute(config: &RunConfig) -> u8 {
    let started = Instant::now();
    let layout = match allocate_layout(config, &Local::now()) {
        Ok(layout) => layout,
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            return e.exit_code();
        }
    };
    let mut log = match RunLog::create(&layout.log_file()) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            return e.exit_code();
        }
    };

    log.info(format!("Results directory: {}", layout.root().display()));
    if let Some(archive) = layout.archive() {
        log.info(format!("Archive directory: {}", archive.display()));
    }
    log.blank();

    let aligner = Box::new(NucmerAligner::new(config.tools.clone()));
    let code = match run(config, &layout, aligner, &mut log) {
        Ok(summary) => {
            log.info(format!(
                "Done. {} stages in {:.2}s",
                summary.executed.len(),
                started.elapsed().as_secs_f64()
            ));
            log.info(format!("  Log saved to {}", layout.log_file().display()));
            0
        }
        Err(e) => {
            log.error(&e);
            e.exit_code()
        }
    };

    match log.close() {
        Ok(()) => code,
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            if code == 0 {
                EXIT_RUNTIME
            } else {
                code
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 14, 5, 9).unwrap()
    }

    #[test]
    fn test_results_dir_name() {
        assert_eq!(results_dir_name(&fixed_time()), "results_2024_03_01_14_05_09");
    }

    #[test]
    fn test_explicit_output_dir_has_no_latest_link() {
        let dir = TempDir::new().unwrap();
        let mut config = RunConfig::new(vec![PathBuf::from("a.fa")]);
        config.output_dir = Some(dir.path().join("out"));

        let layout = allocate_layout(&config, &fixed_time()).unwrap();
        assert_eq!(layout.root(), dir.path().join("out"));
        assert!(dir.path().join(LATEST_LINK).symlink_metadata().is_err());
        assert!(layout.archive().is_none());
    }

    #[test]
    fn test_second_allocation_gets_suffix() {
        let dir = TempDir::new().unwrap();
        let mut config = RunConfig::new(vec![PathBuf::from("a.fa")]);
        config.output_dir = Some(dir.path().join("out"));

        let first = allocate_layout(&config, &fixed_time()).unwrap();
        let second = allocate_layout(&config, &fixed_time()).unwrap();
        assert_ne!(first.root(), second.root());
        assert_eq!(second.root(), dir.path().join("out__2"));
    }

    #[cfg(unix)]
    #[test]
    fn test_archive_gets_its_own_latest_link() {
        let dir = TempDir::new().unwrap();
        let mut config = RunConfig::new(vec![PathBuf::from("a.fa")]);
        config.output_dir = Some(dir.path().join("out"));
        config.save_archive = true;
        config.archive_dir = dir.path().join("archive");

        let layout = allocate_layout(&config, &fixed_time()).unwrap();
        let archive = layout.archive().unwrap();
        assert!(archive.is_dir());
        let link = dir.path().join("archive").join(LATEST_LINK);
        assert_eq!(fs::read_link(link).unwrap(), archive);
    }
}
