//! Collision-free output locations.
//!
//! Results and archive directories are reserved eagerly so two runs started
//! in the same second never share a directory. A taken name gets the first
//! free numeric suffix `__2`, `__3`, … appended to the base path.

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};

/// Name of the symbolic link pointing at the most recent run.
pub const LATEST_LINK: &str = "latest";

/// `base` with `__n` appended to its final component.
pub fn suffixed(base: &Path, n: usize) -> PathBuf {
    let mut name: OsString = base.as_os_str().to_os_string();
    name.push(format!("__{}", n));
    PathBuf::from(name)
}

/// First candidate among `desired`, `desired__2`, `desired__3`, … that does
/// not exist yet. Nothing is created.
pub fn unique_path(desired: &Path) -> PathBuf {
    candidates(desired)
        .find(|candidate| candidate.symlink_metadata().is_err())
        .unwrap_or_else(|| desired.to_path_buf())
}

fn candidates(desired: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    std::iter::once(desired.to_path_buf()).chain((2..).map(move |n| suffixed(desired, n)))
}

/// Create and return a fresh directory at `desired` or its first free
/// `__n` variant.
///
/// The final component is created with a single `create_dir`, so a name
/// taken by a concurrent run between the check and the create is skipped
/// rather than shared. Any failure other than "already exists" aborts.
pub fn reserve_dir(desired: &Path) -> Result<PathBuf> {
    if let Some(parent) = desired.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| Error::Allocation {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    for candidate in candidates(desired) {
        match fs::create_dir(&candidate) {
            Ok(()) => {
                tracing::debug!("Reserved output directory {}", candidate.display());
                return Ok(candidate);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(source) => {
                return Err(Error::Allocation {
                    path: candidate,
                    source,
                })
            }
        }
    }
    unreachable!("candidate sequence is unbounded")
}

/// Point `link` at `target`, replacing a previous symbolic link.
///
/// Returns `false` when the link could not be placed, e.g. because a regular
/// file or directory occupies the name. That is never fatal.
pub fn update_latest(link: &Path, target: &Path) -> bool {
    match link.symlink_metadata() {
        Ok(meta) if meta.file_type().is_symlink() => {
            if let Err(e) = fs::remove_file(link) {
                tracing::warn!("Cannot replace {}: {}", link.display(), e);
                return false;
            }
        }
        Ok(_) => {
            tracing::warn!(
                "{} exists and is not a symbolic link; leaving it alone",
                link.display()
            );
            return false;
        }
        Err(_) => {}
    }
    create_symlink(target, link)
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> bool {
    match std::os::unix::fs::symlink(target, link) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Cannot create {}: {}", link.display(), e);
            false
        }
    }
}

#[cfg(not(unix))]
fn create_symlink(_target: &Path, link: &Path) -> bool {
    tracing::debug!("Symbolic links unsupported here; skipping {}", link.display());
    false
}

/// Absolute form of `path` relative to the current directory.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|source| Error::Allocation {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unique_path_free_name_is_unchanged() {
        let dir = TempDir::new().unwrap();
        let desired = dir.path().join("results");
        assert_eq!(unique_path(&desired), desired);
    }

    #[test]
    fn test_unique_path_suffix_starts_at_two() {
        let dir = TempDir::new().unwrap();
        let desired = dir.path().join("results");
        fs::create_dir(&desired).unwrap();
        assert_eq!(unique_path(&desired), dir.path().join("results__2"));

        fs::create_dir(dir.path().join("results__2")).unwrap();
        assert_eq!(unique_path(&desired), dir.path().join("results__3"));
    }

    #[test]
    fn test_reserve_dir_never_reuses_a_directory() {
        let dir = TempDir::new().unwrap();
        let desired = dir.path().join("nested").join("results");
        let first = reserve_dir(&desired).unwrap();
        let second = reserve_dir(&desired).unwrap();
        let third = reserve_dir(&desired).unwrap();
        assert_eq!(first, desired);
        assert_eq!(second, dir.path().join("nested").join("results__2"));
        assert_eq!(third, dir.path().join("nested").join("results__3"));
        assert!(first.is_dir() && second.is_dir() && third.is_dir());
    }

    #[test]
    fn test_reserve_dir_fails_under_a_file() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let result = reserve_dir(&blocker.join("results"));
        assert!(matches!(result, Err(Error::Allocation { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_latest_link_is_replaced() {
        let dir = TempDir::new().unwrap();
        let link = dir.path().join(LATEST_LINK);
        let first = reserve_dir(&dir.path().join("r")).unwrap();
        let second = reserve_dir(&dir.path().join("r")).unwrap();

        assert!(update_latest(&link, &first));
        assert_eq!(fs::read_link(&link).unwrap(), first);
        assert!(update_latest(&link, &second));
        assert_eq!(fs::read_link(&link).unwrap(), second);
    }

    #[test]
    fn test_latest_does_not_clobber_regular_file() {
        let dir = TempDir::new().unwrap();
        let link = dir.path().join(LATEST_LINK);
        fs::write(&link, "keep me").unwrap();
        assert!(!update_latest(&link, dir.path()));
        assert_eq!(fs::read_to_string(&link).unwrap(), "keep me");
    }
}
