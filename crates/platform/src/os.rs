//! Platform family detection

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform family as identified in a build environment's `PLATFORM` entry.
///
/// These are coarse build-tool identifiers, not target triples: every Unix
/// other than macOS reports `posix`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Posix,
    Darwin,
    Win32,
}

impl Os {
    /// Detect the platform family of the running host.
    pub fn current() -> Self {
        match std::env::consts::OS {
            "macos" => Os::Darwin,
            "windows" => Os::Win32,
            _ => Os::Posix,
        }
    }

    /// Returns the identifier used in build-environment `PLATFORM` entries
    pub const fn as_str(&self) -> &'static str {
        match self {
            Os::Posix => "posix",
            Os::Darwin => "darwin",
            Os::Win32 => "win32",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
