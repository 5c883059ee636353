//! Injected path configuration for the live file and include fragments.
//!
//! The core never detects the platform itself. A caller (or a
//! platform-detection layer above) resolves the right paths once at startup
//! and passes them in as plain data. The constants below are the
//! conventional Linux locations, provided as defaults for that layer to use
//! or override.

use camino::{Utf8Path, Utf8PathBuf};

use crate::store;

/// Conventional location of the main sudoers file.
pub const DEFAULT_SUDOERS_PATH: &str = "/etc/sudoers";

/// Conventional directory of included sudoers fragments.
pub const DEFAULT_FRAGMENT_DIR: &str = "/etc/sudoers.d";

/// Paths of the file a transaction edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SudoersPaths {
    live: Utf8PathBuf,
}

impl SudoersPaths {
    /// Targets the given live file directly.
    #[must_use]
    pub fn new(live: impl Into<Utf8PathBuf>) -> Self {
        Self { live: live.into() }
    }

    /// Targets a named fragment inside an include directory.
    #[must_use]
    pub fn fragment(dir: impl AsRef<Utf8Path>, name: &str) -> Self {
        Self {
            live: dir.as_ref().join(name),
        }
    }

    /// Returns the live file path.
    #[must_use]
    pub fn live(&self) -> &Utf8Path {
        &self.live
    }

    /// Returns the staged-copy path derived from the live path.
    #[must_use]
    pub fn staged(&self) -> Utf8PathBuf {
        store::staged_path(&self.live)
    }
}

impl Default for SudoersPaths {
    fn default() -> Self {
        Self::new(DEFAULT_SUDOERS_PATH)
    }
}
