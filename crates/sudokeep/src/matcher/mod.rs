//! Pattern construction and line classification for grant entries.
//!
//! Two patterns are derived from a [`GrantSpec`]:
//!
//! - the *broad* pattern recognises any entry for the spec's principal,
//!   regardless of host, command, or password settings;
//! - the *strict* pattern recognises only the spec's exact rendered line.
//!
//! The split lets the transaction layer distinguish "absent" from "present
//! but different" from "present and identical" without parsing the sudoers
//! grammar. All non-comment, non-blank lines are treated as opaque text;
//! only the managed subset is pattern-matched.

use regex::Regex;

use crate::entry::GrantSpec;

/// Result of scanning a file's lines against one spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Some entry for the principal exists.
    pub present: bool,
    /// An entry identical to the spec's rendering exists.
    pub exact: bool,
}

/// Compiled patterns for one grant spec.
#[derive(Debug)]
pub struct EntryMatcher {
    broad: Regex,
    strict: Regex,
}

impl EntryMatcher {
    /// Compiles the broad and strict patterns for a spec.
    #[must_use]
    pub fn for_spec(spec: &GrantSpec) -> Self {
        let identity = regex::escape(&spec.principal().identity());
        let broad = Regex::new(&format!(r"^{identity}(\s|$)"))
            .expect("escaped identity forms a valid pattern");
        let strict = Regex::new(&format!("^{}$", regex::escape(&spec.render())))
            .expect("escaped rendering forms a valid pattern");
        Self { broad, strict }
    }

    /// Returns the pattern matching any entry for the principal.
    #[must_use]
    pub const fn broad(&self) -> &Regex {
        &self.broad
    }

    /// Returns the pattern matching only the exact rendered entry.
    #[must_use]
    pub const fn strict(&self) -> &Regex {
        &self.strict
    }

    /// Scans lines and reports whether any entry for the principal exists
    /// and whether an exact entry exists.
    ///
    /// Blank lines and comments (trimmed form starting with `#`) are
    /// skipped. The two flags are independent: a file may hold a broad
    /// match that is not exact alongside an exact one.
    #[must_use]
    pub fn classify(&self, lines: &[String]) -> Classification {
        let mut present = false;
        let mut exact = false;
        for line in lines {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if self.broad.is_match(trimmed) {
                present = true;
            }
            if self.strict.is_match(trimmed) {
                exact = true;
            }
        }
        Classification { present, exact }
    }
}
