//! Transactional management of privilege-grant entries in a sudoers file.
//!
//! `sudokeep` adds, replaces, and removes single-line grants for a user or
//! group while guaranteeing the live file is never left syntactically
//! invalid or half-written. Edits are staged in a working copy beside the
//! live file, checked by an external syntax validator, and only then
//! promoted with an atomic rename. The staged copy doubles as an advisory
//! cross-process lock: a second invocation finding one in place refuses to
//! run.
//!
//! The sudoers grammar is deliberately not parsed. Non-comment, non-blank
//! lines are opaque text, and only the single-line grant subset this crate
//! manages is pattern-matched, so hand-maintained content elsewhere in the
//! file survives verbatim.
//!
//! ```no_run
//! use sudokeep::{
//!     DesiredState, GrantSpec, Principal, SudoersPaths, TransactionManager,
//!     VisudoChecker,
//! };
//!
//! # fn main() -> Result<(), sudokeep::GrantError> {
//! let checker = VisudoChecker::new();
//! let manager = TransactionManager::new(SudoersPaths::default(), &checker);
//!
//! let spec = GrantSpec::new(Principal::group("deployers")?).without_password();
//! let outcome = manager.apply(&spec, DesiredState::Present)?;
//! println!("changed: {}", outcome.changed);
//! # Ok(()) }
//! ```
//!
//! Paths are injected data: target the main file via
//! [`SudoersPaths::new`], or a fragment in an include directory via
//! [`SudoersPaths::fragment`]. Platform detection belongs to the caller.

mod checker;
mod entry;
mod error;
mod matcher;
mod paths;
mod store;
mod transaction;

pub use checker::{DEFAULT_VISUDO_PATH, VisudoChecker};
pub use entry::{GrantSpec, Principal, PrincipalKind};
pub use error::GrantError;
pub use matcher::{Classification, EntryMatcher};
pub use paths::{DEFAULT_FRAGMENT_DIR, DEFAULT_SUDOERS_PATH, SudoersPaths};
pub use transaction::{
    ApplyOutcome, BackupWriter, CheckReport, DesiredState, SyntaxChecker, TransactionManager,
};
