#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

impl CmdResult {
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn lines(&self) -> Vec<&str> {
        self.stdout.lines().collect()
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_mpt") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "mpt.exe" } else { "mpt" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve mpt binary path for integration test"),
    }
}

pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    run_cli_case_with_env(case_name, args, &[])
}

/// Run `mpt` isolated from the caller's config and `MPT_*` environment.
///
/// `HOME` points at an empty scratch directory and the converter defaults to
/// `none`; `env` is applied last.
pub fn run_cli_case_with_env(case_name: &str, args: &[&str], env: &[(&str, &str)]) -> CmdResult {
    let root = std::env::temp_dir().join("mpt-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();
    let home = tempfile::tempdir().expect("create scratch HOME");

    let mut command = Command::new(&bin_path);
    command.args(args);
    for (key, _) in std::env::vars() {
        if key.starts_with("MPT_") {
            command.env_remove(key);
        }
    }
    command
        .env("HOME", home.path())
        .env("MPT_CONVERTER_BACKEND", "none")
        .env("RUST_BACKTRACE", "1");
    for (key, value) in env {
        command.env(key, value);
    }
    let output = command.output().expect("execute mpt command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("env={env:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

// ---------------------------------------------------------------------------
// Package fixtures
// ---------------------------------------------------------------------------

pub fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("fixture path has a parent")).expect("create parent");
    fs::write(path, b"x").expect("write fixture file");
}

pub fn empty(root: &Path, relative: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("fixture path has a parent")).expect("create parent");
    fs::write(path, b"").expect("write fixture file");
}

pub fn mkdir(root: &Path, relative: &str) {
    fs::create_dir_all(root.join(relative)).expect("create fixture dir");
}

/// One unit laid out as the `current` profile requires.
pub fn conformant_unit(root: &Path, bib: &str) {
    touch(root, &format!("{bib}/access/{bib}_001.jp2"));
    touch(root, &format!("{bib}/access/{bib}_002.jp2"));
    touch(root, &format!("{bib}/preservation/{bib}_001.tif"));
    touch(root, &format!("{bib}/preservation/{bib}_002.tif"));
    touch(root, &format!("{bib}/metadata/item_{bib}.xml"));
}

/// One unit laid out the `nested` way, with junk and a stray record.
pub fn legacy_unit(root: &Path, bib: &str) {
    touch(root, &format!("access/accessMasters/{bib}/{bib}_001.jp2"));
    touch(root, &format!("access/accessMasters/{bib}/Thumbs.db"));
    touch(root, &format!("preservation/preservationMasters/{bib}/{bib}_001.tif"));
    touch(root, &format!("preservation/preservationMasters/{bib}/item_{bib}.xml"));
}

/// Every path under `root`, relative, sorted.
pub fn tree(root: &Path) -> Vec<String> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
        for entry in fs::read_dir(dir).expect("read fixture dir") {
            let path = entry.expect("fixture entry").path();
            out.push(
                path.strip_prefix(root)
                    .expect("under root")
                    .to_string_lossy()
                    .into_owned(),
            );
            if path.is_dir() {
                walk(root, &path, out);
            }
        }
    }
    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}
