//! # slipstream CLI Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//!
//! ## Overview
//!
//! Shared helpers for the integration tests in `cli/tests/`. Each test file
//! declares `mod common;` and pulls in what it needs.
//!

// Not every test file uses every helper.
#![allow(dead_code)]

pub use assert_cmd::Command;
use flate2::read::GzDecoder;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Command for the compiled `slipstream` binary.
pub fn slipstream_cmd() -> Command {
    Command::cargo_bin("slipstream").expect("Failed to find slipstream binary for testing")
}

/// Command running inside `dir` with user configuration pointed at `dir`
/// too, so the developer's own config files never leak into a test.
pub fn slipstream_in(dir: &Path) -> Command {
    let mut cmd = slipstream_cmd();
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir)
        .env("HOME", dir)
        .env_remove("RUST_LOG");
    cmd
}

/// Decodes a `.tar.gz` into entry name -> content; directories map to `None`.
pub fn decode_archive(bytes: &[u8]) -> BTreeMap<String, Option<Vec<u8>>> {
    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    let mut out = BTreeMap::new();
    for entry in archive.entries().expect("archive should be readable") {
        let mut entry = entry.expect("entry should be readable");
        let name = entry
            .path()
            .expect("entry path")
            .to_string_lossy()
            .trim_end_matches('/')
            .to_string();
        let content = if entry.header().entry_type().is_dir() {
            None
        } else {
            let mut data = Vec::new();
            entry.read_to_end(&mut data).expect("entry content");
            Some(data)
        };
        out.insert(name, content);
    }
    out
}

/// Sorted entry names of a decoded archive.
pub fn entry_names(bytes: &[u8]) -> Vec<String> {
    decode_archive(bytes).into_keys().collect()
}
