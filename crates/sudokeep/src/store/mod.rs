//! Filesystem operations on the live file and its staged working copy.
//!
//! The live file is never written directly. Edits accumulate in a staged
//! copy beside it, and [`promote_staged`] replaces the live file in a single
//! rename so a partially written file can never become visible. Creation of
//! the staged copy doubles as the cross-process transaction lock; see
//! [`acquire_staged_copy`].

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use tracing::debug;

use crate::error::GrantError;

/// Log target for store operations.
const STORE_TARGET: &str = "sudokeep::store";

/// Suffix appended to the live path to name the staged copy.
const STAGED_SUFFIX: &str = ".tmp";

/// Derives the staged-copy path for a live file: same directory, fixed
/// suffix appended.
#[must_use]
pub fn staged_path(live: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{live}{STAGED_SUFFIX}"))
}

/// Reads the live file as a sequence of lines, without terminators.
///
/// # Errors
///
/// Returns [`GrantError::Unreadable`] when the file cannot be opened or
/// read. A missing file is an error, not an empty entry set: silently
/// treating an unreadable sudoers file as empty would turn a permission
/// problem into a bogus "add" edit.
pub fn read_lines(path: &Utf8Path) -> Result<Vec<String>, GrantError> {
    let file = File::open(path).map_err(|source| GrantError::Unreadable {
        path: path.to_owned(),
        source,
    })?;
    BufReader::new(file)
        .lines()
        .collect::<io::Result<Vec<String>>>()
        .map_err(|source| GrantError::Unreadable {
            path: path.to_owned(),
            source,
        })
}

/// Creates the staged copy of the live file, acquiring the transaction
/// lock.
///
/// The copy is created with `O_EXCL` semantics and then restricted to
/// read-only permissions. Its presence marks an in-progress transaction to
/// other invocations; the check is advisory (file presence), not a kernel
/// lock.
///
/// # Errors
///
/// Returns [`GrantError::LockHeld`] when a staged copy already exists,
/// [`GrantError::Unreadable`] when the live file cannot be read, and
/// [`GrantError::PermissionDenied`] when the copy cannot be written.
pub fn acquire_staged_copy(live: &Utf8Path, staged: &Utf8Path) -> Result<(), GrantError> {
    let mut source = File::open(live).map_err(|source| GrantError::Unreadable {
        path: live.to_owned(),
        source,
    })?;
    let target = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(staged)
        .map_err(|source| {
            if source.kind() == io::ErrorKind::AlreadyExists {
                GrantError::LockHeld {
                    path: staged.to_owned(),
                }
            } else {
                not_writable(staged, source)
            }
        })?;
    debug!(target: STORE_TARGET, staged = %staged, "staged copy created");

    if let Err(err) = fill_staged_copy(&mut source, target, staged) {
        // Release the half-acquired lock so a retry is not wrongly refused.
        let _ = fs::remove_file(staged);
        return Err(err);
    }
    Ok(())
}

fn fill_staged_copy(
    source: &mut File,
    mut target: File,
    staged: &Utf8Path,
) -> Result<(), GrantError> {
    io::copy(source, &mut target).map_err(|err| not_writable(staged, err))?;
    let mut permissions = target
        .metadata()
        .map_err(|err| not_writable(staged, err))?
        .permissions();
    permissions.set_readonly(true);
    target
        .set_permissions(permissions)
        .map_err(|err| not_writable(staged, err))
}

/// Rewrites the staged copy from `source` lines, dropping every line whose
/// trimmed form matches `pattern`.
///
/// Any prior content (including the read-only lock copy) is truncated in
/// place. The directory entry is the lock token, so it must never
/// disappear mid-transaction; write access is restored first because the
/// lock copy was created read-only. Untouched lines are written back
/// verbatim, in their original order.
///
/// # Errors
///
/// Returns [`GrantError::PermissionDenied`] when the staged file cannot be
/// written.
pub fn stage_removal(
    source: &[String],
    pattern: &Regex,
    staged: &Utf8Path,
) -> Result<(), GrantError> {
    match fs::metadata(staged) {
        Ok(metadata) => {
            let mut permissions = metadata.permissions();
            permissions.set_readonly(false);
            fs::set_permissions(staged, permissions)
                .map_err(|err| not_writable(staged, err))?;
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(not_writable(staged, err)),
    }
    let mut file = File::create(staged).map_err(|source| not_writable(staged, source))?;
    let mut removed = 0u32;
    for line in source {
        if pattern.is_match(line.trim()) {
            removed += 1;
            continue;
        }
        writeln!(file, "{line}").map_err(|source| not_writable(staged, source))?;
    }
    debug!(target: STORE_TARGET, staged = %staged, removed, "staged removal written");
    Ok(())
}

/// Appends one rendered entry line (plus terminator) to the staged copy.
///
/// # Errors
///
/// Returns [`GrantError::PermissionDenied`] when the staged file cannot be
/// appended to.
pub fn stage_append(staged: &Utf8Path, entry: &str) -> Result<(), GrantError> {
    let mut file = OpenOptions::new()
        .append(true)
        .open(staged)
        .map_err(|source| not_writable(staged, source))?;
    writeln!(file, "{entry}").map_err(|source| not_writable(staged, source))?;
    debug!(target: STORE_TARGET, staged = %staged, entry, "staged append written");
    Ok(())
}

/// Atomically replaces the live file with the staged copy.
///
/// The staged file first takes on the live file's permissions, then is
/// renamed over it. Rename, not copy: a copy could leave a truncated live
/// file visible mid-write.
///
/// # Errors
///
/// Returns [`GrantError::CommitFailed`] when any step fails.
pub fn promote_staged(staged: &Utf8Path, live: &Utf8Path) -> Result<(), GrantError> {
    let commit_failed = |source: io::Error| GrantError::CommitFailed {
        path: live.to_owned(),
        source,
    };
    let permissions = fs::metadata(live).map_err(commit_failed)?.permissions();
    fs::set_permissions(staged, permissions).map_err(commit_failed)?;
    fs::rename(staged, live).map_err(commit_failed)?;
    debug!(target: STORE_TARGET, live = %live, "staged copy promoted");
    Ok(())
}

/// Removes the staged copy, releasing the transaction lock.
///
/// Idempotent: an already-absent staged copy is not an error.
///
/// # Errors
///
/// Returns [`GrantError::PermissionDenied`] when the file exists but cannot
/// be removed.
pub fn discard_staged(staged: &Utf8Path) -> Result<(), GrantError> {
    match fs::remove_file(staged) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(not_writable(staged, source)),
    }
}

fn not_writable(path: &Utf8Path, source: io::Error) -> GrantError {
    GrantError::PermissionDenied {
        path: path.to_owned(),
        source,
    }
}

#[cfg(test)]
mod tests;
