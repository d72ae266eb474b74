//! Integration tests for the sdb CLI.

use clap as _;
use rstest as _;
use rustyline as _;
use sdb as _;
use sdb_core as _;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use thiserror as _;
use tracing as _;
use tracing_subscriber as _;

fn binary_path() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.join("sdb")
}

fn image_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|word| word.to_le_bytes()).collect()
}

fn run_with_input(args: &[&str], input: &str) -> Output {
    let mut child = Command::new(binary_path())
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run sdb");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn batch_mode_runs_builtin_image_to_good_trap() {
    let output = Command::new(binary_path())
        .arg("-b")
        .output()
        .expect("failed to run sdb");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("HIT GOOD TRAP at pc = 0x8000000c"));
}

#[test]
fn batch_mode_reports_bad_trap_with_failing_status() {
    let temp_dir = tempfile::tempdir().unwrap();
    let image = temp_dir.path().join("bad.bin");
    // li a0, 3 ; ebreak
    fs::write(&image, image_bytes(&[0x0030_0513, 0x0010_0073])).unwrap();

    let output = Command::new(binary_path())
        .args(["-b", image.to_str().unwrap()])
        .output()
        .expect("failed to run sdb");

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("HIT BAD TRAP at pc = 0x80000004"));
}

#[test]
fn piped_commands_evaluate_and_quit() {
    let output = run_with_input(&[], "p 1+2*3\np (1+2)*3\nx 1 0x80000000\nq\n");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, "7\n9\n0x80000000:    0x00000297\n");
}

#[test]
fn piped_session_survives_bad_input() {
    let output = run_with_input(&[], "p 10/0\nbogus\nw $a0\nc\nc\nq\n");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("error: division by zero"));
    assert!(stdout.contains("Unknown command 'bogus'"));
    assert!(stdout.contains("Watchpoint 0: $a0"));
    assert!(stdout.contains("HIT GOOD TRAP"));
    assert!(stdout.contains("Program execution has ended."));
}

#[test]
fn end_of_input_without_quit_fails() {
    let output = run_with_input(&[], "si\n");
    assert!(!output.status.success());
}

#[test]
fn missing_image_is_reported() {
    let temp_dir = tempfile::tempdir().unwrap();
    let missing = temp_dir.path().join("missing.bin");

    let output = Command::new(binary_path())
        .args(["-b", missing.to_str().unwrap()])
        .output()
        .expect("failed to run sdb");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: failed to read image"));
}

#[test]
fn log_file_receives_debug_events() {
    let temp_dir = tempfile::tempdir().unwrap();
    let log = temp_dir.path().join("sdb.log");

    let output = Command::new(binary_path())
        .args(["-b", "-l", log.to_str().unwrap()])
        .output()
        .expect("failed to run sdb");

    assert!(output.status.success());
    let contents = fs::read_to_string(&log).unwrap();
    assert!(contents.contains("retired"));
}
