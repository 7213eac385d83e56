use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const OVERRIDE: &str = r#"
version = 1

[channels.aux2]
segments = [
    { start = 0, rule = "linear", rate = 2.0 },
]
"#;

fn scoremarch(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_scoremarch"))
        .env("SCOREMARCH_CONFIG_DIR", config_dir)
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run scoremarch")
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8(output.stdout.clone())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).expect("sample line is JSON"))
        .collect()
}

#[test]
fn sample_prints_builtin_raw_channel() {
    let config = TempDir::new().unwrap();
    let output = scoremarch(
        config.path(),
        &["timeline", "sample", "--channel", "raw", "--from", "7", "--to", "7"],
    );
    assert!(output.status.success(), "{output:?}");

    let lines = json_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["channel"], "raw");
    assert_eq!(lines[0]["raw_seconds"], 7.0);
    let phase = lines[0]["phase"].as_f64().unwrap();
    assert!((phase - 2.91).abs() < 1e-9, "phase was {phase}");
}

#[test]
fn sample_starts_every_channel_at_zero() {
    let config = TempDir::new().unwrap();
    let output = scoremarch(
        config.path(),
        &["timeline", "sample", "--to", "1", "--step", "0.25"],
    );
    assert!(output.status.success(), "{output:?}");

    let lines = json_lines(&output);
    assert_eq!(lines.len(), 5);
    for channel in ["raw", "aux1", "aux2", "aux3", "panel"] {
        assert_eq!(lines[0][channel], 0.0, "{channel} at raw time 0");
    }
}

#[test]
fn config_dir_timeline_is_picked_up() {
    let config = TempDir::new().unwrap();
    fs::write(config.path().join("timeline.toml"), OVERRIDE).unwrap();

    let output = scoremarch(
        config.path(),
        &["timeline", "sample", "--channel", "aux2", "--from", "3", "--to", "3"],
    );
    assert!(output.status.success(), "{output:?}");
    assert_eq!(json_lines(&output)[0]["phase"], 6.0);
}

#[test]
fn check_reports_overrides() {
    let config = TempDir::new().unwrap();
    let timeline = config.path().join("custom.toml");
    fs::write(&timeline, OVERRIDE).unwrap();

    let output = scoremarch(
        config.path(),
        &["timeline", "check", timeline.to_str().unwrap()],
    );
    assert!(output.status.success(), "{output:?}");

    let stdout = String::from_utf8(output.stdout).unwrap();
    let aux2 = stdout
        .lines()
        .find(|line| line.starts_with("aux2"))
        .expect("aux2 line");
    assert!(aux2.contains("override"));
    assert!(aux2.contains("tail continue"));
    assert_eq!(
        stdout.lines().filter(|line| line.contains("built-in")).count(),
        4
    );
}

#[test]
fn check_rejects_invalid_timeline() {
    let config = TempDir::new().unwrap();
    let timeline = config.path().join("broken.toml");
    fs::write(
        &timeline,
        "version = 1\n[channels.raw]\nsegments = [{ start = 0, rule = \"scaled\", rate = 0 }]\n",
    )
    .unwrap();

    let output = scoremarch(
        config.path(),
        &["timeline", "check", timeline.to_str().unwrap()],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("invalid timeline"), "{stderr}");
}
