use std::path::PathBuf;
use std::process::Command;

use serde_json::Value;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_units-cli"))
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("units-cli-{}-{}", std::process::id(), name))
}

fn synth_fixture(name: &str) -> PathBuf {
    let path = temp_path(name);
    let output = cli()
        .args(["synth", path.to_str().unwrap(), "--start", "2.0", "--end", "2.5"])
        .output()
        .expect("synth command");
    assert!(
        output.status.success(),
        "synth exited with {:?}",
        output.status.code()
    );
    path
}

#[test]
fn analyze_outputs_result_json() {
    let wav = synth_fixture("analyze.wav");
    let output = cli()
        .args(["analyze", wav.to_str().unwrap()])
        .output()
        .expect("analyze command");

    assert!(
        output.status.success(),
        "analyze exited with {:?}",
        output.status.code()
    );
    let stdout = String::from_utf8(output.stdout).expect("stdout utf8");
    let json: Value = serde_json::from_str(&stdout).expect("valid JSON result");
    assert_eq!(json["sample_rate"], 44_100);
    let units = json["units"].as_array().expect("units array");
    assert_eq!(units.len(), 1, "expected one unit, got {stdout}");
    let dominant = units[0]["dominant_frequency"].as_f64().unwrap_or_default();
    assert!((dominant - 500.0).abs() <= 10.0);

    let _ = std::fs::remove_file(wav);
}

#[test]
fn analyze_writes_summary_to_file() {
    let wav = synth_fixture("summary.wav");
    let report = temp_path("summary.txt");
    let output = cli()
        .args([
            "analyze",
            wav.to_str().unwrap(),
            "--mode",
            "conservative",
            "--summary",
            "--output",
            report.to_str().unwrap(),
        ])
        .output()
        .expect("analyze command");

    assert!(output.status.success());
    let text = std::fs::read_to_string(&report).expect("summary written to disk");
    assert!(text.contains("1 unit(s)"), "unexpected summary: {text}");
    assert!(text.contains("threshold="));

    let _ = std::fs::remove_file(wav);
    let _ = std::fs::remove_file(report);
}

#[test]
fn live_replay_cues_on_unit_starts() {
    let wav = synth_fixture("live.wav");
    let output = cli()
        .args(["live", wav.to_str().unwrap(), "--tick-ms", "50", "--units"])
        .output()
        .expect("live command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout utf8");
    let cues: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("cue JSON"))
        .collect();
    assert_eq!(cues.len(), 1, "expected one cue, got {stdout}");
    assert_eq!(cues[0]["source"]["kind"], "unit");
    assert!((cues[0]["time"].as_f64().unwrap_or_default() - 2.0).abs() < 0.1);

    let _ = std::fs::remove_file(wav);
}

#[test]
fn live_replay_falls_back_to_volume_cadence() {
    let wav = synth_fixture("fallback.wav");
    let output = cli()
        .args(["live", wav.to_str().unwrap(), "--tick-ms", "100"])
        .output()
        .expect("live command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout utf8");
    // mostly quiet 10 s file: one cue roughly every 6 s
    let count = stdout.lines().count();
    assert!((1..=3).contains(&count), "unexpected cue count in {stdout}");
    assert!(stdout.contains("\"live\""));

    let _ = std::fs::remove_file(wav);
}

#[test]
fn missing_input_fails_with_error_code() {
    let output = cli()
        .args(["analyze", temp_path("missing.wav").to_str().unwrap()])
        .output()
        .expect("analyze command");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr utf8");
    assert!(stderr.contains("code 3004"), "stderr: {stderr}");
}
