//! # slipstream CLI List Integration Tests
//!
//! File: cli/tests/list.rs
//!
//! ## Overview
//!
//! `slipstream list` must print exactly what `pack` would archive.
//!

mod common;
use common::*;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_list_matches_pack() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("site");
    fs::create_dir_all(root.join("assets/img")).unwrap();
    fs::create_dir_all(root.join("node_modules/dep")).unwrap();
    fs::write(root.join("index.html"), "<html>").unwrap();
    fs::write(root.join("assets/img/logo.png"), [0u8; 16]).unwrap();
    fs::write(root.join("node_modules/dep/index.js"), "").unwrap();

    let listing = slipstream_in(dir.path())
        .args(["list", "site", "-x", "node_modules/"])
        .output()
        .unwrap();
    assert!(listing.status.success());
    assert_eq!(
        String::from_utf8(listing.stdout).unwrap(),
        "assets/\nassets/img/\nassets/img/logo.png\nindex.html\n"
    );

    let packed = slipstream_in(dir.path())
        .args(["pack", "site", "-x", "node_modules/"])
        .output()
        .unwrap();
    assert_eq!(
        entry_names(&packed.stdout),
        vec!["assets", "assets/img", "assets/img/logo.png", "index.html"]
    );
}

#[test]
fn test_list_summary_goes_to_stderr() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "abc").unwrap();
    slipstream_in(dir.path())
        .args(["list", ".", "--summary"])
        .assert()
        .success()
        .stdout("a.txt\n")
        .stderr(predicate::str::contains("1 files, 0 directories, 0 symlinks, 3 bytes"));
}

#[test]
fn test_list_file_with_options_fails() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "abc").unwrap();
    slipstream_in(dir.path())
        .args(["list", "a.txt", "--vcs"])
        .assert()
        .failure()
        .code(1);
}
