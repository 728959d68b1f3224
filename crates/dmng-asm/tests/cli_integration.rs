//! Integration tests for the dmng-asm CLI.

use dmng_asm as _;
use thiserror as _;
use vscp_node as _;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use rstest::rstest;

fn binary_path() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.join("dmng-asm")
}

fn create_temp_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

const LAMP_RULES: &str = "\
const LAMP_ON = 0x10
rule LAMP_ON 3 when class == 20 and type > 3 or data0 == 1
rule 0x22 0 when u16@1 >= 256
";

#[test]
fn build_writes_ruleset() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = create_temp_file(temp_dir.path(), "lamp.rules", LAMP_RULES);
    let output = temp_dir.path().join("out.bin");

    let status = Command::new(binary_path())
        .args([
            "build",
            source.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .status()
        .expect("failed to run dmng-asm");

    assert!(status.success());
    let binary = fs::read(&output).unwrap();
    assert_eq!(binary.len(), 21);
    assert_eq!(binary[0], 2);
    assert_eq!(&binary[1..4], &[13, 0x10, 3]);
}

#[test]
fn build_with_default_output() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = create_temp_file(temp_dir.path(), "lamp.rules", LAMP_RULES);

    let status = Command::new(binary_path())
        .args(["build", source.to_str().unwrap()])
        .status()
        .expect("failed to run dmng-asm");

    assert!(status.success());
    assert!(temp_dir.path().join("lamp.bin").exists());
}

#[test]
fn verbose_build_prints_listing() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = create_temp_file(temp_dir.path(), "lamp.rules", LAMP_RULES);

    let output = Command::new(binary_path())
        .args(["build", source.to_str().unwrap(), "-v"])
        .output()
        .expect("failed to run dmng-asm");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("0001: 0D 10 03"));
    assert!(stderr.contains("; line 3"));
}

#[rstest]
#[case::unknown_field("rule 1 0 when data8 == 1\n", "bad.rules:1: error: unknown field: data8")]
#[case::undefined_constant(
    "\nrule LAMP 0 when class == 1\n",
    "bad.rules:2: error: undefined constant: LAMP"
)]
#[case::over_capacity(
    "rule 1 0 when u32@0 == 1 and u32@4 == 2\nrule 2 0 when u32@0 == 3 and u32@4 == 4\n",
    "error: ruleset needs 31 bytes, capacity is 16"
)]
fn build_reports_errors(#[case] source_text: &str, #[case] expected: &str) {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = create_temp_file(temp_dir.path(), "bad.rules", source_text);
    let output = temp_dir.path().join("bad.bin");

    let result = Command::new(binary_path())
        .current_dir(temp_dir.path())
        .args(["build", "bad.rules", "--capacity", "16"])
        .output()
        .expect("failed to run dmng-asm");

    assert!(!result.status.success());
    assert!(source.exists());
    assert!(!output.exists());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains(expected), "stderr was: {stderr}");
}

#[test]
fn dump_round_trips_through_build() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = create_temp_file(temp_dir.path(), "lamp.rules", LAMP_RULES);
    let first = temp_dir.path().join("first.bin");
    let second = temp_dir.path().join("second.bin");

    let status = Command::new(binary_path())
        .args(["build", source.to_str().unwrap(), "-o", first.to_str().unwrap()])
        .status()
        .expect("failed to run dmng-asm");
    assert!(status.success());

    let dump = Command::new(binary_path())
        .args(["dump", first.to_str().unwrap()])
        .output()
        .expect("failed to run dmng-asm");
    assert!(dump.status.success());
    let listing = String::from_utf8_lossy(&dump.stdout).into_owned();
    assert!(listing.contains("rule 0x10 3 when class == 20 and type > 3 or data0 == 1"));

    let dumped = create_temp_file(temp_dir.path(), "dumped.rules", &listing);
    let status = Command::new(binary_path())
        .args(["build", dumped.to_str().unwrap(), "-o", second.to_str().unwrap()])
        .status()
        .expect("failed to run dmng-asm");
    assert!(status.success());
    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn dump_flags_corrupt_rules() {
    let temp_dir = tempfile::tempdir().unwrap();
    let binary = temp_dir.path().join("corrupt.bin");
    fs::write(&binary, [2, 6, 1, 0, 0x00, 0x7F, 3, 6, 2, 0, 0x00, 0x01, 3]).unwrap();

    let dump = Command::new(binary_path())
        .args(["dump", binary.to_str().unwrap()])
        .output()
        .expect("failed to run dmng-asm");

    assert!(!dump.status.success());
    let stdout = String::from_utf8_lossy(&dump.stdout);
    assert!(stdout.contains("; rule 0 at byte 5: unknown parameter id"));
    assert!(stdout.contains("rule 0x02 0 when type == 3"));
}

#[test]
fn missing_command_prints_usage() {
    let output = Command::new(binary_path())
        .output()
        .expect("failed to run dmng-asm");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing command"));
    assert!(stderr.contains("Usage: dmng-asm"));
}
