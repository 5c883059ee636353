//! Unit tests for staged-copy filesystem operations.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use tempfile::TempDir;

use super::{
    acquire_staged_copy, discard_staged, promote_staged, read_lines, stage_append, stage_removal,
    staged_path,
};
use crate::error::GrantError;

fn live_file(dir: &TempDir, content: &str) -> Utf8PathBuf {
    let path = Utf8Path::from_path(dir.path())
        .expect("temp dir path is UTF-8")
        .join("sudoers");
    fs::write(&path, content).expect("write live file");
    path
}

fn john_pattern() -> Regex {
    Regex::new(r"^john(\s|$)").expect("valid pattern")
}

#[test]
fn staged_path_appends_the_fixed_suffix() {
    assert_eq!(
        staged_path(Utf8Path::new("/etc/sudoers")).as_str(),
        "/etc/sudoers.tmp"
    );
}

#[test]
fn read_lines_strips_terminators_and_keeps_order() {
    let dir = TempDir::new().expect("temp dir");
    let live = live_file(&dir, "# header\nroot ALL=(ALL) ALL\n\njohn ALL=(ALL) ALL\n");
    let lines = read_lines(&live).expect("readable");
    assert_eq!(
        lines,
        vec!["# header", "root ALL=(ALL) ALL", "", "john ALL=(ALL) ALL"]
    );
}

#[test]
fn read_lines_surfaces_a_missing_file() {
    let dir = TempDir::new().expect("temp dir");
    let missing = Utf8Path::from_path(dir.path())
        .expect("temp dir path is UTF-8")
        .join("absent");
    let err = read_lines(&missing).expect_err("missing file should fail");
    assert!(matches!(err, GrantError::Unreadable { .. }));
}

#[test]
fn acquire_copies_the_live_content_read_only() {
    let dir = TempDir::new().expect("temp dir");
    let live = live_file(&dir, "root ALL=(ALL) ALL\n");
    let staged = staged_path(&live);

    acquire_staged_copy(&live, &staged).expect("acquire lock");

    assert_eq!(
        fs::read_to_string(&staged).expect("read staged"),
        "root ALL=(ALL) ALL\n"
    );
    let permissions = fs::metadata(&staged).expect("staged metadata").permissions();
    assert!(permissions.readonly());
}

#[test]
fn second_acquire_reports_lock_held() {
    let dir = TempDir::new().expect("temp dir");
    let live = live_file(&dir, "root ALL=(ALL) ALL\n");
    let staged = staged_path(&live);

    acquire_staged_copy(&live, &staged).expect("first acquire");
    let err = acquire_staged_copy(&live, &staged).expect_err("second acquire should fail");
    assert!(matches!(err, GrantError::LockHeld { .. }));
}

#[test]
fn removal_drops_matching_lines_and_preserves_the_rest() {
    let dir = TempDir::new().expect("temp dir");
    let live = live_file(&dir, "");
    let staged = staged_path(&live);
    let source = vec![
        "# header".to_owned(),
        "john ALL=(ALL) ALL".to_owned(),
        "root ALL=(ALL) ALL".to_owned(),
        "  john db01=(ALL) ALL".to_owned(),
    ];

    stage_removal(&source, &john_pattern(), &staged).expect("stage removal");

    assert_eq!(
        fs::read_to_string(&staged).expect("read staged"),
        "# header\nroot ALL=(ALL) ALL\n"
    );
}

#[test]
fn removal_replaces_the_read_only_lock_copy() {
    let dir = TempDir::new().expect("temp dir");
    let live = live_file(&dir, "john ALL=(ALL) ALL\n");
    let staged = staged_path(&live);
    acquire_staged_copy(&live, &staged).expect("acquire lock");

    let source = read_lines(&live).expect("read live");
    stage_removal(&source, &john_pattern(), &staged).expect("stage over lock copy");

    assert_eq!(fs::read_to_string(&staged).expect("read staged"), "");
}

#[test]
fn staging_never_releases_the_lock_token() {
    use std::os::unix::fs::MetadataExt;

    let dir = TempDir::new().expect("temp dir");
    let live = live_file(&dir, "john ALL=(ALL) ALL\nroot ALL=(ALL) ALL\n");
    let staged = staged_path(&live);
    acquire_staged_copy(&live, &staged).expect("acquire lock");
    let inode = fs::metadata(&staged).expect("staged metadata").ino();

    let source = read_lines(&live).expect("read live");
    stage_removal(&source, &john_pattern(), &staged).expect("stage removal");
    stage_append(&staged, "john ALL=(ALL) NOPASSWD: ALL").expect("stage append");

    // The same directory entry must persist throughout staging, so a
    // concurrent acquire is refused at every point.
    assert_eq!(
        fs::metadata(&staged).expect("staged metadata").ino(),
        inode
    );
    let err = acquire_staged_copy(&live, &staged).expect_err("lock must still be held");
    assert!(matches!(err, GrantError::LockHeld { .. }));
}

#[test]
fn append_adds_one_terminated_line() {
    let dir = TempDir::new().expect("temp dir");
    let live = live_file(&dir, "");
    let staged = staged_path(&live);
    stage_removal(&[], &john_pattern(), &staged).expect("create staged");

    stage_append(&staged, "%bananas ALL=(ALL) ALL").expect("append entry");

    assert_eq!(
        fs::read_to_string(&staged).expect("read staged"),
        "%bananas ALL=(ALL) ALL\n"
    );
}

#[test]
fn promote_replaces_the_live_file_and_consumes_the_staged_copy() {
    let dir = TempDir::new().expect("temp dir");
    let live = live_file(&dir, "old content\n");
    let staged = staged_path(&live);
    fs::write(&staged, "new content\n").expect("write staged");

    promote_staged(&staged, &live).expect("promote");

    assert_eq!(
        fs::read_to_string(&live).expect("read live"),
        "new content\n"
    );
    assert!(!staged.exists());
}

#[test]
fn discard_is_idempotent() {
    let dir = TempDir::new().expect("temp dir");
    let live = live_file(&dir, "");
    let staged = staged_path(&live);
    fs::write(&staged, "partial\n").expect("write staged");

    discard_staged(&staged).expect("first discard");
    assert!(!staged.exists());
    discard_staged(&staged).expect("second discard is a no-op");
}
