//! Filesystem probing for tool installations

use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Process-environment roots used to derive candidate install locations.
///
/// Each variable is read once, read-only, with an empty-string fallback when
/// unset: candidate lists can then be built unconditionally, and a root that
/// does not apply to this host simply never matches the probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostDirs {
    /// The user's home directory (`HOME`).
    pub home: PathBuf,
    /// Windows program-files directory (`PROGRAMFILES`).
    pub program_files: PathBuf,
    /// Windows home drive (`HOMEDRIVE`).
    pub home_drive: PathBuf,
}

impl HostDirs {
    /// Read `HOME`, `PROGRAMFILES` and `HOMEDRIVE` from the process
    /// environment.
    pub fn from_env() -> Self {
        Self {
            home: PathBuf::from(env::var("HOME").unwrap_or_default()),
            program_files: PathBuf::from(env::var("PROGRAMFILES").unwrap_or_default()),
            home_drive: PathBuf::from(env::var("HOMEDRIVE").unwrap_or_default()),
        }
    }
}

/// Returns the first candidate that exists as a directory.
///
/// Candidates are tried in order; order encodes priority, so the list must
/// never be sorted. Misses are skipped silently.
pub fn first_existing_dir<I, P>(candidates: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    for candidate in candidates {
        let candidate = candidate.as_ref();
        if candidate.is_dir() {
            return Some(candidate.to_path_buf());
        }
        debug!(path = %candidate.display(), "probe miss");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn picks_the_only_existing_candidate_regardless_of_position() {
        let tmp = TempDir::new().unwrap();
        let existing = tmp.path().join("real");
        std::fs::create_dir(&existing).unwrap();

        let candidates = vec![
            tmp.path().join("missing-a"),
            tmp.path().join("missing-b"),
            existing.clone(),
            tmp.path().join("missing-c"),
        ];

        assert_eq!(first_existing_dir(candidates), Some(existing));
    }

    #[test]
    fn earlier_candidate_wins_over_later() {
        let tmp = TempDir::new().unwrap();
        let first = tmp.path().join("first");
        let second = tmp.path().join("second");
        std::fs::create_dir(&first).unwrap();
        std::fs::create_dir(&second).unwrap();

        let candidates = vec![first.clone(), second];
        assert_eq!(first_existing_dir(candidates), Some(first));
    }

    #[test]
    fn none_when_no_candidate_exists() {
        let tmp = TempDir::new().unwrap();
        let candidates = vec![tmp.path().join("a"), tmp.path().join("b")];
        assert_eq!(first_existing_dir(candidates), None);
    }

    #[test]
    fn plain_files_do_not_count_as_installations() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("not-a-dir");
        std::fs::write(&file, b"").unwrap();

        assert_eq!(first_existing_dir(vec![file]), None);
    }

    #[test]
    #[serial]
    fn from_env_reads_the_three_roots() {
        temp_env::with_vars(
            [
                ("HOME", Some("/home/builder")),
                ("PROGRAMFILES", Some("C:/Program Files")),
                ("HOMEDRIVE", Some("C:")),
            ],
            || {
                let dirs = HostDirs::from_env();
                assert_eq!(dirs.home, PathBuf::from("/home/builder"));
                assert_eq!(dirs.program_files, PathBuf::from("C:/Program Files"));
                assert_eq!(dirs.home_drive, PathBuf::from("C:"));
            },
        );
    }

    #[test]
    #[serial]
    fn from_env_falls_back_to_empty_when_unset() {
        temp_env::with_vars(
            [
                ("HOME", None::<&str>),
                ("PROGRAMFILES", None),
                ("HOMEDRIVE", None),
            ],
            || {
                let dirs = HostDirs::from_env();
                assert_eq!(dirs, HostDirs::default());
            },
        );
    }
}
