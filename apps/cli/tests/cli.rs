//! End-to-end tests of the `physcalc` binary.

use std::fs;
use std::io::Write;
use std::process::{Command, Output, Stdio};

fn physcalc(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_physcalc"))
        .args(args)
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start physcalc");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_eval_flag() {
    let output = physcalc(&["-e", "Print 1 km [m]", "-e", "2 N * 3 m"], "");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "1000 m\n6 J\n");
}

#[test]
fn test_session_reads_stdin() {
    let input = "Var v = 72 km/h\nFunc dist(t [s]) {\nReturn v * t\n}\nPrint dist(10 s) [m]\n";
    let output = physcalc(&[], input);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "200 m\n");
}

#[test]
fn test_session_survives_errors() {
    let output = physcalc(&[], "1 m + 1 s\n(2 + 3\nPrint 4\n");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "4\n");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("value so far: 5"), "{stderr}");
}

#[test]
fn test_script_file_and_precision() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("third.cal");
    fs::write(&script, "Print 1 / 3\n").unwrap();

    let output = physcalc(&["--precision", "3", script.to_str().unwrap()], "");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "0.333\n");
}

#[test]
fn test_failing_eval_exits_with_error() {
    let output = physcalc(&["-e", "Print nothing"], "");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown identifier: nothing"), "{stderr}");
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let output = physcalc(&["--precision", "0", "-e", "Print 1"], "");
    assert!(!output.status.success());
}
