//! Re-summarizing a metrics log that several runs appended to

use codexup::commands::summarize;
use codexup::metrics::read_records;
use std::fs;

use super::helpers::{run, Workspace};

#[test]
fn test_metrics_log_accumulates_runs_and_can_be_split() {
    let ws = Workspace::new();
    let config = ws.config(&["foo", "baz"], None);

    let first = run(&config, false).unwrap();
    let second = run(&config, true).unwrap();
    assert_ne!(first.run_id, second.run_id);

    let metrics = config.metrics_path();
    assert_eq!(read_records(&metrics).unwrap().len(), 4);

    // The run's own summary only covers the latest run
    let latest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(config.summary_path()).unwrap()).unwrap();
    assert_eq!(latest["run_id"], second.run_id.as_str());
    assert_eq!(latest["targets_skipped"], 2);

    let out = ws.root().join("first.json");
    let csv = ws.root().join("first.csv");
    summarize::execute(&metrics, Some(out.clone()), Some(csv.clone()), Some(first.run_id.clone()))
        .unwrap();

    let summary: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(summary["run_id"], first.run_id.as_str());
    assert_eq!(summary["targets_total"], 2);
    assert_eq!(summary["targets_matched"], 2);
    assert!((summary["total_cost"].as_f64().unwrap() - 21.0).abs() < 1e-9);

    let rows = fs::read_to_string(&csv).unwrap();
    assert_eq!(rows.lines().count(), 3);
    assert!(rows.lines().nth(1).unwrap().contains(",foo,"));
}

#[test]
fn test_summarize_skips_garbage_lines() {
    let ws = Workspace::new();
    let config = ws.config(&["foo"], None);
    run(&config, true).unwrap();

    let metrics = config.metrics_path();
    let mut content = fs::read_to_string(&metrics).unwrap();
    content.push_str("\n{truncated\n");
    fs::write(&metrics, content).unwrap();

    summarize::execute(&metrics, None, None, None).unwrap();

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(config.summary_path()).unwrap()).unwrap();
    assert_eq!(summary["targets_total"], 1);
    assert!(metrics.with_extension("csv").exists());
}
