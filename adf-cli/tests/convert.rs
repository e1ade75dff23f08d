//! End-to-end tests for the adf binary: both directions, presets, flags
//! and exit-code behavior.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn write_temp(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::with_suffix(suffix).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

const SIMPLE_ADF: &str =
    r#"{"type":"doc","content":[{"type":"paragraph","content":[{"type":"text","text":"Hello"}]}]}"#;

#[test]
fn forward_conversion_prints_markdown() {
    let input = write_temp(SIMPLE_ADF, ".json");

    Command::cargo_bin("adf")
        .unwrap()
        .arg(input.path())
        .assert()
        .success()
        .stdout("Hello\n");
}

#[test]
fn reverse_conversion_prints_pretty_json() {
    let input = write_temp("Hello\n", ".md");

    Command::cargo_bin("adf")
        .unwrap()
        .arg(input.path())
        .arg("--reverse")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"type\": \"doc\""))
        .stdout(predicate::str::contains("\"text\": \"Hello\""));
}

#[test]
fn warnings_go_to_stderr_not_stdout() {
    let adf = r#"{"type":"doc","content":[{"type":"mysteryNode"}]}"#;
    let input = write_temp(adf, ".json");

    Command::cargo_bin("adf")
        .unwrap()
        .arg(input.path())
        .assert()
        .success()
        .stdout("[Unknown node: mysteryNode]\n")
        .stderr(predicate::str::contains("warning"));
}

#[test]
fn strict_flag_turns_unknown_nodes_into_errors() {
    let adf = r#"{"type":"doc","content":[{"type":"mysteryNode"}]}"#;
    let input = write_temp(adf, ".json");

    Command::cargo_bin("adf")
        .unwrap()
        .arg(input.path())
        .arg("--strict")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown node type"));
}

#[test]
fn pandoc_preset_changes_rendering() {
    let adf = r#"{"type":"doc","content":[{"type":"paragraph","content":[{"type":"text","text":"styled","marks":[{"type":"underline"}]}]}]}"#;
    let input = write_temp(adf, ".json");

    Command::cargo_bin("adf")
        .unwrap()
        .arg(input.path())
        .arg("--preset")
        .arg("pandoc")
        .assert()
        .success()
        .stdout("[styled]{.underline}\n");
}

#[test]
fn allow_html_switches_underline_to_tags() {
    let adf = r#"{"type":"doc","content":[{"type":"paragraph","content":[{"type":"text","text":"styled","marks":[{"type":"underline"}]}]}]}"#;
    let input = write_temp(adf, ".json");

    Command::cargo_bin("adf")
        .unwrap()
        .arg(input.path())
        .arg("--allow-html")
        .assert()
        .success()
        .stdout("<u>styled</u>\n");
}

#[test]
fn unknown_preset_fails_before_reading_far() {
    let input = write_temp(SIMPLE_ADF, ".json");

    Command::cargo_bin("adf")
        .unwrap()
        .arg(input.path())
        .arg("--preset")
        .arg("sparkly")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown preset"));
}

#[test]
fn missing_input_file_fails() {
    Command::cargo_bin("adf")
        .unwrap()
        .arg("does-not-exist.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error reading file"));
}

#[test]
fn output_flag_writes_to_file() {
    let input = write_temp(SIMPLE_ADF, ".json");
    let output = tempfile::NamedTempFile::with_suffix(".md").unwrap();

    Command::cargo_bin("adf")
        .unwrap()
        .arg(input.path())
        .arg("--output")
        .arg(output.path())
        .assert()
        .success()
        .stdout("");

    let written = std::fs::read_to_string(output.path()).unwrap();
    assert_eq!(written, "Hello\n");
}

#[test]
fn config_file_overrides_defaults() {
    let profile = write_temp("[forward]\npanel_style = \"bold\"\n", ".toml");
    let adf = r#"{"type":"doc","content":[{"type":"panel","attrs":{"panelType":"info"},"content":[{"type":"paragraph","content":[{"type":"text","text":"heads up"}]}]}]}"#;
    let input = write_temp(adf, ".json");

    Command::cargo_bin("adf")
        .unwrap()
        .arg(input.path())
        .arg("--config")
        .arg(profile.path())
        .assert()
        .success()
        .stdout("> **Info**: heads up\n");
}
