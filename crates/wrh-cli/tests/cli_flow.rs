//! End-to-end tests for the `wrh` binary.
//!
//! Tests the full pipeline: chat rows + demo metadata → classify → history.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

fn wrh_binary() -> String {
    env!("CARGO_BIN_EXE_wrh").to_string()
}

/// Runs `wrh` with the temp dir as home so no user config is picked up.
fn run_wrh(home: &Path, args: &[&str]) -> Output {
    Command::new(wrh_binary())
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("WRH_INCLUDE_ALL")
        .env_remove("WRH_DEMOS_PATH")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("failed to run wrh")
}

fn stdout_of(output: &Output) -> String {
    assert!(
        output.status.success(),
        "wrh should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn json_lines(stdout: &str) -> Vec<Value> {
    stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

const DEMOS: &str = r#"{"id":1,"date":"2022-03-01T18:00:00Z","map":"jump_beef","users":[{"user_id":4,"name":"Boshy","steam_id64":76561198000000001}]}
{"id":2,"date":"2022-03-05T18:00:00Z","map":"jump_beef"}
{"id":3,"date":"2022-03-07T18:00:00Z","map":"jump_beef"}
"#;

const RECORD_LINE: &str = r#"{"demo_id":1,"text":"Tempus | (Solly) Boshy beat the map record: 00:40.00!","chat_index":10,"from_user_id":4}"#;
const MAP_RUN_LINE: &str = r#"{"demo_id":2,"text":"Tempus | (Solly) Alle map run 00:39.00 (WR -00:01.00)","chat_index":3}"#;
const IRC_LINE: &str = r#"{"demo_id":3,"text":"[IRC] (Soldier) Alle broke jump_beef WR: 00:39.00 (WR -00:01.00)!","chat_index":5}"#;

/// Writes the chat and demo files, returning their paths as strings.
fn write_inputs(dir: &Path, chat_lines: &[&str]) -> (String, String) {
    let chat = dir.join("chat.jsonl");
    let demos = dir.join("demos.jsonl");
    fs::write(&chat, chat_lines.join("\n")).unwrap();
    fs::write(&demos, DEMOS).unwrap();
    (
        chat.to_string_lossy().into_owned(),
        demos.to_string_lossy().into_owned(),
    )
}

#[test]
fn test_time_subcommands() {
    let temp = TempDir::new().unwrap();

    let parsed = stdout_of(&run_wrh(temp.path(), &["time", "parse", "01:23.95"]));
    assert_eq!(parsed, "8395\n");

    let formatted = stdout_of(&run_wrh(temp.path(), &["time", "format", "372342"]));
    assert_eq!(formatted, "1:02:03.42\n");

    let normalized = stdout_of(&run_wrh(temp.path(), &["time", "normalize", "-0:01.23"]));
    assert_eq!(normalized, "-00:01.23\n");
}

#[test]
fn test_time_parse_rejects_garbage() {
    let temp = TempDir::new().unwrap();
    let output = run_wrh(temp.path(), &["time", "parse", "soon"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid race time"));
}

#[test]
fn test_history_resolves_observed_record_holder() {
    let temp = TempDir::new().unwrap();
    let (chat, demos) = write_inputs(temp.path(), &[RECORD_LINE, MAP_RUN_LINE, IRC_LINE]);

    let stdout = stdout_of(&run_wrh(
        temp.path(),
        &["history", &chat, "--demos", &demos, "--json"],
    ));
    let entries = json_lines(&stdout);

    assert_eq!(entries.len(), 2, "IRC sighting should resolve, not duplicate");

    assert_eq!(entries[0]["player"], "Boshy");
    assert_eq!(entries[0]["source"], "MapRecord");
    assert_eq!(entries[0]["record_time"], "00:40.00");
    assert_eq!(entries[0]["date"], "2022-03-01");
    assert_eq!(entries[0]["steam_id64"], 76_561_198_000_000_001_i64);

    assert_eq!(entries[1]["player"], "Alle");
    assert_eq!(entries[1]["source"], "ObservedWr");
    assert_eq!(entries[1]["record_time"], "00:39.00");
    assert_eq!(entries[1]["inferred"], true);
}

#[test]
fn test_history_all_keeps_unattributed_records() {
    let temp = TempDir::new().unwrap();
    let (chat, demos) = write_inputs(temp.path(), &[RECORD_LINE, MAP_RUN_LINE]);

    let default_run = stdout_of(&run_wrh(
        temp.path(),
        &["history", &chat, "--demos", &demos, "--json"],
    ));
    assert_eq!(json_lines(&default_run).len(), 1);

    let all_run = stdout_of(&run_wrh(
        temp.path(),
        &["history", &chat, "--demos", &demos, "--json", "--all"],
    ));
    let entries = json_lines(&all_run);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1]["player"], "Unknown");
}

#[test]
fn test_history_table_output() {
    let temp = TempDir::new().unwrap();
    let (chat, demos) = write_inputs(temp.path(), &[RECORD_LINE, MAP_RUN_LINE, IRC_LINE]);

    let stdout = stdout_of(&run_wrh(
        temp.path(),
        &["history", &chat, "--demos", &demos, "--map", "jump_beef"],
    ));

    assert!(stdout.starts_with("WR HISTORY\n"));
    assert!(stdout.contains("Boshy"));
    assert!(stdout.contains("00:39.00"));
    assert!(stdout.contains("inferred"));

    let other_map = stdout_of(&run_wrh(
        temp.path(),
        &["history", &chat, "--demos", &demos, "--map", "jump_soar"],
    ));
    assert!(other_map.contains("No records found."));
}

#[test]
fn test_classify_reads_stdin() {
    let temp = TempDir::new().unwrap();
    let output = Command::new(wrh_binary())
        .env("HOME", temp.path())
        .env("XDG_CONFIG_HOME", temp.path().join(".config"))
        .env_remove("WRH_DEMOS_PATH")
        .args(["classify", "-"])
        .stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .spawn()
        .and_then(|mut child| {
            use std::io::Write;
            let mut stdin = child.stdin.take().unwrap();
            writeln!(stdin, r#"{{"demo_id":9,"map":"jump_beef","text":"Tempus | (Demo) Boshy set Bonus 1 00:10.00!","chat_index":0}}"#)?;
            drop(stdin);
            child.wait_with_output()
        })
        .unwrap();

    let entries = json_lines(&stdout_of(&output));
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["class"], "Demo");
    assert_eq!(entries[0]["record_time"], "00:10.00");
}
