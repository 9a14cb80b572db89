//! # slipstream CLI Pack Integration Tests
//!
//! File: cli/tests/pack.rs
//!
//! ## Overview
//!
//! End-to-end tests for `slipstream pack`: the archive written to stdout or
//! a file is decoded with `flate2` + `tar` and compared with the source tree.
//!

mod common;
use common::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command as StdCommand;
use tempfile::tempdir;

fn fixture() -> tempfile::TempDir {
    let dir = tempdir().expect("Failed to create temp dir");
    let root = dir.path().join("proj");
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("target/debug")).unwrap();
    fs::write(root.join("Cargo.toml"), "[package]\n").unwrap();
    fs::write(root.join("src/main.rs"), "fn main() {}\n").unwrap();
    fs::write(root.join("target/debug/app"), "binary").unwrap();
    fs::write(root.join("notes.log"), "log").unwrap();
    dir
}

#[test]
fn test_pack_to_stdout() {
    let dir = fixture();
    let output = slipstream_in(dir.path())
        .args(["pack", "proj"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let entries = decode_archive(&output.stdout);
    assert_eq!(
        entries.keys().cloned().collect::<Vec<_>>(),
        vec![
            "Cargo.toml",
            "notes.log",
            "src",
            "src/main.rs",
            "target",
            "target/debug",
            "target/debug/app"
        ]
    );
    assert_eq!(entries["src/main.rs"].as_deref(), Some(&b"fn main() {}\n"[..]));
}

#[test]
fn test_pack_to_file_with_excludes() {
    let dir = fixture();
    slipstream_in(dir.path())
        .args(["pack", "proj", "-x", "target/", "--exclude", "*.log", "-o", "out/proj.tar.gz"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let bytes = fs::read(dir.path().join("out/proj.tar.gz")).unwrap();
    assert_eq!(entry_names(&bytes), vec!["Cargo.toml", "src", "src/main.rs"]);
    assert!(!dir.path().join("out/proj.tar.gz.partial").exists());
}

#[test]
fn test_pack_includes_only() {
    let dir = fixture();
    let output = slipstream_in(dir.path())
        .args(["pack", "proj", "--include", "/src/"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(entry_names(&output.stdout), vec!["src", "src/main.rs"]);
}

#[test]
fn test_pack_single_file() {
    let dir = fixture();
    let output = slipstream_in(dir.path())
        .args(["pack", "proj/Cargo.toml"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(entry_names(&output.stdout), vec!["Cargo.toml"]);
}

#[test]
fn test_pack_single_file_with_options_fails() {
    let dir = fixture();
    slipstream_in(dir.path())
        .args(["pack", "proj/Cargo.toml", "--exclude", "foo", "-o", "out.tar.gz"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "Options such as exclude, include, and VCS can't be set when the path is a file.",
        ));
    assert!(!dir.path().join("out.tar.gz").exists());
    assert!(!dir.path().join("out.tar.gz.partial").exists());
}

#[test]
fn test_pack_missing_path_fails() {
    let dir = tempdir().unwrap();
    slipstream_in(dir.path())
        .args(["pack", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_pack_vcs_without_repository_fails() {
    let dir = fixture();
    slipstream_in(dir.path())
        .args(["pack", "proj", "--vcs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no supported VCS"));
}

#[test]
fn test_pack_uses_project_config() {
    let dir = fixture();
    fs::write(
        dir.path().join("proj/.slipstream.toml"),
        "[archive]\nexclude = [\"target/\", \".slipstream.toml\"]\n",
    )
    .unwrap();
    let output = slipstream_in(dir.path())
        .args(["pack", "proj", "-x", "*.log"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(entry_names(&output.stdout), vec!["Cargo.toml", "src", "src/main.rs"]);
}

#[test]
fn test_pack_rejects_invalid_config() {
    let dir = fixture();
    fs::write(dir.path().join("bad.toml"), "[pipeline]\ncompression_level = 12\n").unwrap();
    slipstream_in(dir.path())
        .args(["pack", "proj", "--config", "bad.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration"));
}

#[test]
#[cfg(unix)]
fn test_pack_unreadable_file_fails_without_output() {
    use std::os::unix::fs::PermissionsExt;

    let dir = fixture();
    let locked = dir.path().join("proj/src/locked.rs");
    fs::write(&locked, "secret").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::File::open(&locked).is_ok() {
        return; // running as root, permissions are not enforced
    }

    slipstream_in(dir.path())
        .args(["pack", "proj", "-o", "proj.tar.gz"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("locked.rs"));
    assert!(!dir.path().join("proj.tar.gz").exists());
    assert!(!dir.path().join("proj.tar.gz.partial").exists());

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
}

#[test]
fn test_pack_vcs_with_git() {
    let dir = fixture();
    let root = dir.path().join("proj");
    let git = |args: &[&str]| {
        StdCommand::new("git")
            .args(args)
            .current_dir(&root)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    };
    if !git(&["init", "-q"]) {
        return; // git is not installed
    }
    assert!(git(&["add", "Cargo.toml", "src/main.rs"]));

    let output = slipstream_in(dir.path())
        .args(["pack", "proj", "--vcs"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(entry_names(&output.stdout), vec!["Cargo.toml", "src", "src/main.rs"]);
}
