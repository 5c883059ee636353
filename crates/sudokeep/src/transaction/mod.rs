//! Transactional orchestration of grant edits.
//!
//! [`TransactionManager`] drives one edit end to end: classify the live
//! file, decide the edit, then lock, stage, validate, and commit. Any
//! failure after lock acquisition rolls back by discarding the staged copy,
//! leaving the live file exactly as it was.
//!
//! The external syntax checker and the backup utility are injected through
//! the [`SyntaxChecker`] and [`BackupWriter`] traits so tests can substitute
//! doubles without spawning real processes.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

use crate::entry::GrantSpec;
use crate::error::GrantError;
use crate::matcher::{Classification, EntryMatcher};
use crate::paths::SudoersPaths;
use crate::store;

/// Log target for transaction operations.
const TX_TARGET: &str = "sudokeep::transaction";

/// Whether the caller wants the grant to exist or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredState {
    /// The entry should exist, exactly as specified.
    Present,
    /// No entry for the principal should exist.
    Absent,
}

/// Verdict returned by a [`SyntaxChecker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    /// Whether the staged content passed the check.
    pub passed: bool,
    /// Checker output; preserved verbatim on failure.
    pub diagnostic: String,
}

impl CheckReport {
    /// A passing report with no diagnostic.
    #[must_use]
    pub const fn pass() -> Self {
        Self {
            passed: true,
            diagnostic: String::new(),
        }
    }

    /// A failing report carrying the checker's diagnostic text.
    #[must_use]
    pub fn fail(diagnostic: impl Into<String>) -> Self {
        Self {
            passed: false,
            diagnostic: diagnostic.into(),
        }
    }
}

/// External syntax validation of a staged file.
///
/// The production implementation is
/// [`VisudoChecker`](crate::checker::VisudoChecker), which shells out to the
/// system checker. The call is synchronous with no internal timeout; callers
/// needing one should wrap their implementation.
#[cfg_attr(test, mockall::automock)]
pub trait SyntaxChecker {
    /// Checks the staged file, returning a verdict and diagnostic text.
    fn check(&self, staged: &Utf8Path) -> CheckReport;
}

/// External backup utility producing a timestamped copy of the live file.
///
/// Invoked only when the caller requested backups, after the lock is held
/// and before the staged copy is first mutated.
#[cfg_attr(test, mockall::automock)]
pub trait BackupWriter {
    /// Copies the live file aside, returning where the copy was written.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the copy fails; the
    /// transaction rolls back in response.
    fn back_up(&self, live: &Utf8Path) -> io::Result<Utf8PathBuf>;
}

/// Result of applying a grant spec to the live file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Whether the live file was replaced.
    pub changed: bool,
    /// Where the backup collaborator put its copy, when one was requested.
    pub backup: Option<Utf8PathBuf>,
}

impl ApplyOutcome {
    const fn unchanged() -> Self {
        Self {
            changed: false,
            backup: None,
        }
    }

    const fn committed(backup: Option<Utf8PathBuf>) -> Self {
        Self {
            changed: true,
            backup,
        }
    }
}

/// The edit a transaction will stage, decided once per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EditPlan {
    /// Append the rendered entry; nothing to remove.
    Add,
    /// Remove every entry for the principal.
    Remove,
    /// Remove every entry for the principal, then append the rendered one.
    ///
    /// In-place rewriting of an arbitrary existing line is unsafe, so a
    /// differing entry is always replaced wholesale. Duplicate entries for
    /// the principal collapse to the single canonical line as a byproduct.
    Replace,
}

impl EditPlan {
    /// Decides the required edit from the classification and desired state.
    /// `None` means the file is already in the desired state.
    pub(crate) fn decide(
        classification: Classification,
        desired: DesiredState,
    ) -> Option<Self> {
        match (classification.present, classification.exact, desired) {
            (false, _, DesiredState::Present) => Some(Self::Add),
            (true, false, DesiredState::Present) => Some(Self::Replace),
            (true, true, DesiredState::Present) | (false, _, DesiredState::Absent) => None,
            (true, _, DesiredState::Absent) => Some(Self::Remove),
        }
    }

    const fn appends_entry(self) -> bool {
        matches!(self, Self::Add | Self::Replace)
    }
}

/// Phases of one transaction, in commit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Locked,
    Staged,
    Validated,
    Committed,
    RolledBack,
}

/// Ephemeral state of one in-flight transaction.
///
/// Exists only for the duration of a single [`TransactionManager::apply`]
/// call; the staged copy it tracks is gone by the time the call returns,
/// promoted or discarded.
struct Transaction {
    staged: Utf8PathBuf,
    phase: Phase,
}

impl Transaction {
    fn new(staged: Utf8PathBuf) -> Self {
        Self {
            staged,
            phase: Phase::Idle,
        }
    }

    fn advance(&mut self, next: Phase) {
        debug!(
            target: TX_TARGET,
            from = ?self.phase,
            to = ?next,
            staged = %self.staged,
            "transaction phase change"
        );
        self.phase = next;
    }
}

/// Applies grant edits to a sudoers file transactionally.
///
/// ```no_run
/// use sudokeep::{
///     DesiredState, GrantSpec, Principal, SudoersPaths, TransactionManager,
///     VisudoChecker,
/// };
///
/// # fn main() -> Result<(), sudokeep::GrantError> {
/// let checker = VisudoChecker::new();
/// let manager = TransactionManager::new(SudoersPaths::default(), &checker);
///
/// let spec = GrantSpec::new(Principal::user("john")?);
/// let outcome = manager.apply(&spec, DesiredState::Present)?;
/// assert!(outcome.changed);
/// # Ok(()) }
/// ```
pub struct TransactionManager<'a> {
    paths: SudoersPaths,
    checker: &'a dyn SyntaxChecker,
    backup: Option<&'a dyn BackupWriter>,
}

impl<'a> TransactionManager<'a> {
    /// Creates a manager over the given paths and syntax checker, with
    /// backups disabled.
    #[must_use]
    pub fn new(paths: SudoersPaths, checker: &'a dyn SyntaxChecker) -> Self {
        Self {
            paths,
            checker,
            backup: None,
        }
    }

    /// Requests a backup of the live file before each mutating transaction.
    #[must_use]
    pub fn with_backup(mut self, backup: &'a dyn BackupWriter) -> Self {
        self.backup = Some(backup);
        self
    }

    /// Brings the live file to the desired state for one grant spec.
    ///
    /// When the file already satisfies the desired state no lock is taken
    /// and `changed` is false. Otherwise the edit runs as a transaction:
    /// lock (create staged copy), stage, validate, promote. Every failure
    /// after the lock discards the staged copy before surfacing, so the
    /// live file is never left half-written and the lock is never leaked.
    ///
    /// # Errors
    ///
    /// - [`GrantError::Unreadable`] when the live file cannot be read.
    /// - [`GrantError::LockHeld`] when another invocation is mid-edit.
    /// - [`GrantError::ValidationFailed`] when the checker rejects the
    ///   staged content; its diagnostic is carried verbatim.
    /// - [`GrantError::CommitFailed`] when promotion fails.
    /// - [`GrantError::PermissionDenied`] when staging or backup writes
    ///   fail.
    pub fn apply(
        &self,
        spec: &GrantSpec,
        desired: DesiredState,
    ) -> Result<ApplyOutcome, GrantError> {
        let live = self.paths.live();
        let lines = store::read_lines(live)?;
        let matcher = EntryMatcher::for_spec(spec);
        let classification = matcher.classify(&lines);

        let Some(plan) = EditPlan::decide(classification, desired) else {
            debug!(
                target: TX_TARGET,
                live = %live,
                entry = %spec.render(),
                "already in desired state"
            );
            return Ok(ApplyOutcome::unchanged());
        };
        debug!(
            target: TX_TARGET,
            live = %live,
            entry = %spec.render(),
            plan = ?plan,
            "edit required"
        );

        let mut transaction = Transaction::new(self.paths.staged());
        store::acquire_staged_copy(live, &transaction.staged)?;
        transaction.advance(Phase::Locked);

        match self.run_to_commit(&mut transaction, &lines, &matcher, spec, plan) {
            Ok(backup) => {
                transaction.advance(Phase::Committed);
                Ok(ApplyOutcome::committed(backup))
            }
            Err(err) => {
                warn!(
                    target: TX_TARGET,
                    live = %live,
                    error = %err,
                    "rolling back staged edit"
                );
                if let Err(discard_err) = store::discard_staged(&transaction.staged) {
                    // Surface the original failure; the leftover artifact
                    // will block the next invocation with LockHeld.
                    warn!(
                        target: TX_TARGET,
                        staged = %transaction.staged,
                        error = %discard_err,
                        "failed to discard staged copy during rollback"
                    );
                }
                transaction.advance(Phase::RolledBack);
                Err(err)
            }
        }
    }

    /// Runs the staged phases. On success the staged copy has been renamed
    /// over the live file; on error it is still present for the caller to
    /// discard.
    fn run_to_commit(
        &self,
        transaction: &mut Transaction,
        lines: &[String],
        matcher: &EntryMatcher,
        spec: &GrantSpec,
        plan: EditPlan,
    ) -> Result<Option<Utf8PathBuf>, GrantError> {
        let live = self.paths.live();
        let backup = match self.backup {
            Some(writer) => Some(writer.back_up(live).map_err(|source| {
                GrantError::PermissionDenied {
                    path: live.to_owned(),
                    source,
                }
            })?),
            None => None,
        };

        // Uniform staging: rewrite minus broad matches, then append when the
        // entry should exist. For a plain add the filter removes nothing.
        store::stage_removal(lines, matcher.broad(), &transaction.staged)?;
        if plan.appends_entry() {
            store::stage_append(&transaction.staged, &spec.render())?;
        }
        transaction.advance(Phase::Staged);

        let report = self.checker.check(&transaction.staged);
        if !report.passed {
            return Err(GrantError::ValidationFailed {
                diagnostic: report.diagnostic,
            });
        }
        transaction.advance(Phase::Validated);

        store::promote_staged(&transaction.staged, live)?;
        Ok(backup)
    }
}
