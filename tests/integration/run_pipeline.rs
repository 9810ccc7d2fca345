//! Full runs: dispatch, session matching, metrics and summary

use codexup::dispatch::Outcome;
use codexup::metrics::read_records;
use codexup::runner::{execute_run, RunSettings};
use std::fs;

use super::helpers::{run, Workspace, TEMPLATE};

#[test]
fn test_full_run_matches_sessions_and_prices_them() {
    let ws = Workspace::new();
    let config = ws.config(&["foo", "baz"], None);

    let report = run(&config, false).unwrap();

    let records = read_records(&config.metrics_path()).unwrap();
    let markers: Vec<&str> = records.iter().map(|r| r.marker.as_str()).collect();
    let reported: Vec<&str> = report.records.iter().map(|r| r.marker.as_str()).collect();
    assert_eq!(markers, reported);
    let names: Vec<&str> = records.iter().map(|r| r.function.as_str()).collect();
    assert_eq!(names, vec!["foo", "baz"]);

    for record in &records {
        assert_eq!(record.outcome, Outcome::Succeeded);
        assert_eq!(record.run_id, report.run_id);
        assert!(record.matched);
        // Most complete usage line wins over the earlier partial one
        let tokens = record.tokens.unwrap();
        assert_eq!(tokens.input_tokens, Some(2_000_000));
        assert_eq!(tokens.cached_tokens, Some(0));
        assert_eq!(tokens.output_tokens, Some(500_000));
        assert!((record.estimated_cost().unwrap() - 10.5).abs() < 1e-9);

        let session = fs::read_to_string(record.session_path.as_ref().unwrap()).unwrap();
        assert!(session.contains(&record.marker));

        let log = fs::read_to_string(&record.log_path).unwrap();
        assert!(log.contains(&format!("done with {}", record.marker)));
        assert!(record.proof_dir.is_dir());
    }

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(config.summary_path()).unwrap()).unwrap();
    assert_eq!(summary["targets_total"], 2);
    assert_eq!(summary["targets_succeeded"], 2);
    assert_eq!(summary["targets_matched"], 2);
    assert_eq!(summary["targets_unmatched"], 0);
    assert_eq!(summary["token_totals"]["input_tokens"], 4_000_000);
    assert!((summary["total_cost"].as_f64().unwrap() - 21.0).abs() < 1e-9);
}

#[test]
fn test_failing_target_does_not_stop_the_run() {
    let ws = Workspace::new();
    let config = ws.config(&["bar", "baz"], None);

    let report = run(&config, false).unwrap();

    assert_eq!(report.summary.targets_total, 2);
    assert_eq!(report.summary.targets_succeeded, 1);
    assert_eq!(report.summary.targets_failed, 1);
    assert_eq!(report.failed_targets(), vec!["bar"]);

    let bar = &report.records[0];
    assert_eq!(bar.outcome, Outcome::Failed);
    assert_eq!(bar.exit_code, Some(3));
    assert!(!bar.matched);
    assert!(bar.tokens.is_none());
    assert!(bar.costs.is_none());
    assert!(fs::read_to_string(&bar.log_path).unwrap().contains("bar is broken"));

    assert!(report.records[1].matched);
}

#[test]
fn test_limit_processes_a_prefix() {
    let ws = Workspace::new();
    let config = ws.config(&["foo", "baz", "qux"], Some(2));

    let report = run(&config, false).unwrap();

    let names: Vec<&str> = report.records.iter().map(|r| r.function.as_str()).collect();
    assert_eq!(names, vec!["foo", "baz"]);
    assert_eq!(read_records(&config.metrics_path()).unwrap().len(), 2);
    assert!(!ws.log_dir().join("codex_qux.log").exists());
    assert_eq!(ws.session_files().len(), 2);
}

#[test]
fn test_dry_run_touches_nothing_external() {
    let ws = Workspace::new();
    let config = ws.config(&["foo", "baz"], None);

    let report = run(&config, true).unwrap();

    assert!(ws.session_files().is_empty());
    assert_eq!(report.records.len(), 2);
    for record in &report.records {
        assert!(record.dry_run);
        assert_eq!(record.outcome, Outcome::Skipped);
        assert!(record.tokens.is_none());
        assert!(record.costs.is_none());
        assert!(!record.log_path.exists());
        assert!(!record.proof_dir.exists());
    }
    assert_eq!(report.summary.targets_skipped, 2);
    assert!(report.failed_targets().is_empty());
    assert!(config.summary_path().exists());
}

#[test]
fn test_foreign_markers_are_never_attributed() {
    let ws = Workspace::new();
    // A richer session from some other run already sits in the store.
    let foreign = ws.sessions().join("foreign.jsonl");
    fs::write(
        &foreign,
        concat!(
            "{\"payload\":\"<!-- codexup-run: cxu-00000000000000000000000000000000-00000000-0000000000000000 -->\"}\n",
            "{\"type\":\"event_msg\",\"payload\":{\"type\":\"token_count\",\"info\":{\"total_token_usage\":",
            "{\"input_tokens\":9,\"cached_input_tokens\":9,\"output_tokens\":9,\"reasoning_output_tokens\":9,\"total_tokens\":36}}}}\n"
        ),
    )
    .unwrap();
    let config = ws.config(&["foo", "baz"], None);

    let report = run(&config, false).unwrap();

    for record in &report.records {
        assert_ne!(record.session_path.as_deref(), Some(foreign.as_path()));
        assert_eq!(record.tokens.unwrap().input_tokens, Some(2_000_000));
    }
    let paths: Vec<_> = report.records.iter().map(|r| r.session_path.clone()).collect();
    assert_ne!(paths[0], paths[1]);
}

#[test]
fn test_template_error_aborts_before_any_metrics() {
    let ws = Workspace::new();
    let config = ws.config(&["foo"], None);

    let err = execute_run(&config, "Fix {NOPE}.\n", RunSettings::default()).unwrap_err();

    assert!(format!("{err:#}").contains("Unknown placeholder {NOPE}"));
    assert!(!config.metrics_path().exists());
    assert!(!config.summary_path().exists());
    assert!(ws.session_files().is_empty());
}

#[test]
fn test_first_target_launch_failure_aborts_run() {
    let ws = Workspace::new();
    ws.write_agent("#!/no/such/interpreter\n");
    let config = ws.config(&["foo", "baz"], None);

    let err = run(&config, false).unwrap_err();

    assert!(err.to_string().contains("first target 'foo'"));
    assert!(read_records(&config.metrics_path()).unwrap().is_empty());
    assert!(!config.summary_path().exists());
}

#[test]
fn test_later_launch_failure_is_recorded_and_run_continues() {
    let ws = Workspace::new();
    let config = ws.config(&["foo", "qux", "baz"], None);
    // A plain file where qux's proof directory should go
    let proofs = ws.project().join("proofs");
    fs::create_dir_all(&proofs).unwrap();
    fs::write(proofs.join("qux"), "").unwrap();

    let report = run(&config, false).unwrap();

    let outcomes: Vec<Outcome> = report.records.iter().map(|r| r.outcome).collect();
    assert_eq!(
        outcomes,
        vec![Outcome::Succeeded, Outcome::LaunchFailed, Outcome::Succeeded]
    );
    let qux = &report.records[1];
    assert!(!qux.success);
    assert!(!qux.matched);
    assert!(qux.tokens.is_none());
    assert!(qux.error.as_deref().unwrap().contains("cannot create proof directory"));
    assert!(report.records[0].matched);
    assert!(report.records[2].matched);

    assert_eq!(report.failed_targets(), vec!["qux"]);
    assert_eq!(report.summary.targets_total, 3);
    assert_eq!(report.summary.targets_failed, 1);
    assert!(config.summary_path().exists());
    assert_eq!(read_records(&config.metrics_path()).unwrap().len(), 3);
}

#[test]
fn test_prompt_snapshot_is_kept() {
    let ws = Workspace::new();
    let config = ws.config(&["foo"], None);
    let snapshot = config.prompt_snapshot_path();
    fs::create_dir_all(snapshot.parent().unwrap()).unwrap();
    fs::write(&snapshot, "an older template\n").unwrap();

    run(&config, true).unwrap();
    assert_eq!(fs::read_to_string(&snapshot).unwrap(), "an older template\n");

    fs::remove_file(&snapshot).unwrap();
    run(&config, true).unwrap();
    assert_eq!(fs::read_to_string(&snapshot).unwrap(), TEMPLATE);
}

#[test]
fn test_empty_target_list_writes_empty_summary() {
    let ws = Workspace::new();
    let config = ws.config(&[], None);

    let report = run(&config, false).unwrap();

    assert!(report.records.is_empty());
    assert_eq!(report.summary.targets_total, 0);
    assert!(config.summary_path().exists());
}
