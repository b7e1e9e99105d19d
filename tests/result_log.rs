use brevity_harness::gateway::TokenUsage;
use brevity_harness::judge::{
    load_results, save_results, ExampleResult, JsonlResultSink, LogError, ResultSink, Variant,
    Winner,
};
use brevity_harness::metrics::score;
use tempfile::tempdir;

fn sample(id: &str, winner: Winner) -> ExampleResult {
    let reference = "They agree to meet Friday.";
    let baseline = "Alice and Bob agree to \"meet\" on Friday.\nNo agenda yet.";
    let concise = "- Meet Friday ✓\n- TL;DR: Friday.\n- Uncertainties: None noted";
    ExampleResult {
        example_id: id.to_string(),
        dialogue: "A: Let's meet Friday. B: Works for me.".to_string(),
        reference: reference.to_string(),
        baseline: baseline.to_string(),
        concise: concise.to_string(),
        judge_winner: winner,
        judge_reason: "B - tighter".to_string(),
        judge_first: Variant::Baseline,
        baseline_usage: TokenUsage::new(120, 48),
        concise_usage: TokenUsage {
            prompt_tokens: Some(130),
            completion_tokens: None,
            total_tokens: None,
        },
        judge_usage: TokenUsage::default(),
        baseline_metrics: score(reference, baseline),
        concise_metrics: score(reference, concise),
    }
}

#[test]
fn results_round_trip_through_jsonl() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model_outputs.jsonl");
    let rows = vec![sample("a", Winner::Concise), sample("b", Winner::Tie)];

    save_results(&path, &rows).unwrap();
    let raw = std::fs::read_to_string(&path).unwrap();
    assert_eq!(raw.lines().count(), 2);

    let loaded = load_results(&path).unwrap();
    assert_eq!(loaded, rows);
}

#[test]
fn log_lines_use_flat_keys() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("log.jsonl");
    save_results(&path, &[sample("a", Winner::Concise)]).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
    for key in [
        "example_id",
        "dialogue",
        "reference",
        "baseline",
        "concise",
        "judge_winner",
        "judge_reason",
        "judge_first",
        "baseline_usage",
        "concise_usage",
        "judge_usage",
        "baseline_metrics",
        "concise_metrics",
    ] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
    assert_eq!(value["judge_winner"], "concise");
    assert_eq!(value["judge_first"], "baseline");
    assert!(value["baseline_metrics"]["rouge_l_f"].is_f64());
    assert!(value["concise_usage"].get("completion_tokens").is_none());
}

#[test]
fn blank_lines_are_skipped_and_bad_lines_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("log.jsonl");
    let line = serde_json::to_string(&sample("a", Winner::Baseline)).unwrap();
    std::fs::write(&path, format!("{line}\n\n   \n{line}\n")).unwrap();
    assert_eq!(load_results(&path).unwrap().len(), 2);

    std::fs::write(&path, format!("{line}\n{{\"example_id\": \"x\"}}\n")).unwrap();
    match load_results(&path) {
        Err(LogError::Malformed { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected malformed line error, got {other:?}"),
    }
}

#[test]
fn append_sink_extends_existing_log() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("log.jsonl");
    save_results(&path, &[sample("a", Winner::Concise)]).unwrap();

    let (sink, worker) = JsonlResultSink::append(&path).unwrap();
    let writer = sink.clone();
    writer.record(&sample("b", Winner::Baseline)).unwrap();
    sink.record(&sample("c", Winner::Tie)).unwrap();
    drop(writer);
    drop(sink);
    worker.join().unwrap();

    let ids: Vec<String> = load_results(&path)
        .unwrap()
        .into_iter()
        .map(|r| r.example_id)
        .collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[cfg(target_os = "linux")]
#[test]
fn writer_failure_surfaces_io_error() {
    let rows: Vec<ExampleResult> = (0..8)
        .map(|i| sample(&format!("r{i}"), Winner::Concise))
        .collect();
    match save_results("/dev/full", &rows) {
        Err(LogError::Io(err)) => assert_eq!(err.raw_os_error(), Some(28)),
        other => panic!("expected ENOSPC from the writer, got {other:?}"),
    }
}

#[cfg(target_os = "linux")]
#[test]
fn closed_sink_reports_writer_cause() {
    let (sink, worker) = JsonlResultSink::create("/dev/full").unwrap();
    sink.record(&sample("a", Winner::Tie)).unwrap();
    // Writer exits on the first failed flush; wait until sends are refused.
    let mut closed = None;
    for _ in 0..200 {
        std::thread::sleep(std::time::Duration::from_millis(10));
        if let Err(err) = sink.record(&sample("b", Winner::Tie)) {
            closed = Some(err);
            break;
        }
    }
    let closed = closed.expect("writer thread should stop accepting records");
    assert!(matches!(closed, LogError::Closed));

    drop(sink);
    match worker.into_error(closed) {
        LogError::Io(err) => assert_eq!(err.raw_os_error(), Some(28)),
        other => panic!("expected writer io error, got {other:?}"),
    }
}
