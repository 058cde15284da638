use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use chrono::{Local, TimeZone};
use tempfile::TempDir;
use treewatch::persistence::export_json;
use treewatch::{FileEvent, Operation};

fn treewatch(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_treewatch"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run treewatch")
}

fn fixture_event(
    path: &str,
    operation: Operation,
    second: u32,
    is_dir: bool,
    count: u32,
) -> FileEvent {
    let timestamp = Local.with_ymd_and_hms(2024, 5, 1, 10, 0, second).unwrap();
    let mut event = FileEvent::new(PathBuf::from(path), operation, timestamp, is_dir);
    event.count = count;
    event
}

fn write_fixture(dir: &Path) -> PathBuf {
    let events = vec![
        fixture_event("/proj/src/main.rs", Operation::WRITE, 1, false, 3),
        fixture_event("/proj/docs", Operation::CREATE, 2, true, 1),
        fixture_event("/proj/src/lib.rs", Operation::REMOVE, 3, false, 1),
    ];
    let path = dir.join("treewatch-events_2024-05-01_10-00-05.json");
    export_json(&events, &path).unwrap();
    path
}

#[test]
fn test_init_command() {
    let temp_dir = TempDir::new().unwrap();

    let output = treewatch(temp_dir.path(), &["init"]);
    assert!(output.status.success());

    let config_path = temp_dir.path().join(".treewatch/settings.toml");
    assert!(config_path.exists());

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("version = 1"));
    assert!(content.contains("[events]"));
    assert!(content.contains("max_events = 1000"));

    // A second init without --force refuses to overwrite.
    let output = treewatch(temp_dir.path(), &["init"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("already exists"));

    let output = treewatch(temp_dir.path(), &["init", "--force"]);
    assert!(output.status.success());
}

#[test]
fn test_config_command() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join(".treewatch");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("settings.toml"),
        "version = 2\n[events]\nmax_events = 77\n",
    )
    .unwrap();

    let output = treewatch(temp_dir.path(), &["config"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("version = 2"));
    assert!(stdout.contains("max_events = 77"));
    assert!(stdout.contains("sort = \"time\""));
}

#[test]
fn test_config_flag_rejects_zero_capacity() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("custom.toml");
    std::fs::write(&config, "[events]\nmax_events = 0\n").unwrap();

    let output = treewatch(temp_dir.path(), &["-c", config.to_str().unwrap(), "config"]);
    assert!(!output.status.success());
}

#[test]
fn test_show_latest_export_filtered() {
    let temp_dir = TempDir::new().unwrap();
    write_fixture(temp_dir.path());

    let output = treewatch(temp_dir.path(), &["show", "--path", "SRC", "--sort", "path"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("/proj/src/lib.rs"));
    assert!(lines[1].ends_with("/proj/src/main.rs (3)"));

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("2 of 3 events"));
}

#[test]
fn test_show_operation_and_kind_filters() {
    let temp_dir = TempDir::new().unwrap();
    let file = write_fixture(temp_dir.path());
    let file = file.to_str().unwrap();

    let output = treewatch(temp_dir.path(), &["show", file, "--op", "create"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.contains("CREATE D /proj/docs"));

    let output = treewatch(temp_dir.path(), &["show", file, "--no-files"]);
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 1);

    let output = treewatch(temp_dir.path(), &["show", file, "--op", "bogus"]);
    assert!(!output.status.success());
}

#[test]
fn test_show_expand_repeats_aggregated_entries() {
    let temp_dir = TempDir::new().unwrap();
    let file = write_fixture(temp_dir.path());

    let output = treewatch(
        temp_dir.path(),
        &["show", file.to_str().unwrap(), "--expand", "--path", "main"],
    );
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|line| line.ends_with("/proj/src/main.rs")));
}

#[test]
fn test_show_without_export_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = treewatch(temp_dir.path(), &["show"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("No treewatch export found"));
}
