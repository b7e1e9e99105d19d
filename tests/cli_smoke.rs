use std::process::Command;

use brevity_harness::gateway::TokenUsage;
use brevity_harness::judge::{save_results, ExampleResult, Variant, Winner};
use brevity_harness::metrics::score;
use tempfile::tempdir;

fn result(id: &str, winner: Winner, baseline: &str, concise: &str) -> ExampleResult {
    let reference = "They agree to meet Friday.";
    ExampleResult {
        example_id: id.to_string(),
        dialogue: "A: Let's meet Friday. B: Works for me.".to_string(),
        reference: reference.to_string(),
        baseline: baseline.to_string(),
        concise: concise.to_string(),
        judge_winner: winner,
        judge_reason: "A".to_string(),
        judge_first: Variant::Concise,
        baseline_usage: TokenUsage::new(100, 40),
        concise_usage: TokenUsage::new(110, 20),
        judge_usage: TokenUsage::new(300, 5),
        baseline_metrics: score(reference, baseline),
        concise_metrics: score(reference, concise),
    }
}

#[test]
fn cli_score_prints_metrics_json() {
    let output = Command::new(env!("CARGO_BIN_EXE_brevity"))
        .args([
            "score",
            "--reference",
            "They agree to meet Friday.",
            "--candidate",
            "They agree to meet Friday.",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["rouge_l_f"], 1.0);
    assert_eq!(value["words"], 5);
    assert!(value["flesch"].is_number());
}

#[test]
fn cli_aggregate_writes_metrics_and_report() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("model_outputs.jsonl");
    let out = dir.path().join("metrics.json");
    let report = dir.path().join("report.md");
    save_results(
        &log,
        &[
            result("1", Winner::Concise, "Alice and Bob will meet on Friday.", "- Meet Friday"),
            result("2", Winner::Baseline, "They agree to meet Friday.", "- Friday"),
        ],
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_brevity"))
        .args(["aggregate", "--log"])
        .arg(&log)
        .arg("--out")
        .arg(&out)
        .arg("--report")
        .arg(&report)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(stdout, written);
    assert_eq!(written["n"], 2);
    assert_eq!(written["judge_win_rate"]["concise"], 0.5);
    assert_eq!(written["judge_win_rate"]["baseline"], 0.5);
    assert_eq!(written["judge_win_rate"]["tie"], 0.0);
    assert_eq!(written["token_totals"]["total_tokens"], 2 * (140 + 130 + 305));
    assert!(written["prompt_hashes"]["judge_v1"].is_string());

    let md = std::fs::read_to_string(&report).unwrap();
    assert!(md.contains("## Judge Win Rate"));
    assert!(md.contains("- concise: 50.0%"));
}

#[test]
fn cli_aggregate_rejects_empty_log() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("empty.jsonl");
    std::fs::write(&log, "\n").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_brevity"))
        .args(["aggregate", "--log"])
        .arg(&log)
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn cli_run_without_credentials_fails_before_any_work() {
    let dir = tempdir().unwrap();
    let examples = dir.path().join("examples.jsonl");
    std::fs::write(
        &examples,
        r#"{"id": "1", "dialogue": "A: hi", "summary": "greeting"}"#,
    )
    .unwrap();
    let results_dir = dir.path().join("results");

    let output = Command::new(env!("CARGO_BIN_EXE_brevity"))
        .env_remove("OPENROUTER_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env("HOME", dir.path())
        .args(["run", "--examples"])
        .arg(&examples)
        .arg("--results-dir")
        .arg(&results_dir)
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("MissingCredential"));
    assert!(!results_dir.exists());
}
