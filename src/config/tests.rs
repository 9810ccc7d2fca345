use super::*;
use serial_test::serial;

const FULL_CONFIG: &str = r#"
project_root: /work/riot
proof_root: proofs
makefile_include_dir: proofs/include
examples_dir: templates/examples
agent:
  command: ["codex", "exec", "--full-auto", "{PROMPT}"]
  timeout_secs: 120
  required_env: ["OPENAI_API_KEY"]
  pricing:
    input_per_unit: 1.75
    cached_per_unit: 0.175
    output_per_unit: 14.0
session_store:
  root: /tmp/codex-sessions
  wait_secs: 5
  poll_interval_ms: 250
targets:
  - function: event_timeout_set
    file_path: sys/event/timeout.c
  - function: usbus_register_event_handler
    file_path: sys/usb/usbus/usbus.c
"#;

fn minimal(targets: &str) -> String {
    format!(
        "project_root: /p\nproof_root: proofs\nmakefile_include_dir: proofs\nsession_store:\n  root: /s\n{targets}"
    )
}

#[test]
fn test_full_config_resolves_paths() {
    let config = RunConfig::from_yaml_str(FULL_CONFIG, RunOptions::default()).unwrap();

    assert_eq!(config.project_root, PathBuf::from("/work/riot"));
    assert_eq!(config.proof_root, PathBuf::from("/work/riot/proofs"));
    assert_eq!(config.log_dir, PathBuf::from("/work/riot/proofs/logs"));
    assert_eq!(config.examples_dir, "templates/examples");
    assert_eq!(
        config.metrics_path(),
        PathBuf::from("/work/riot/proofs/logs/codex_metrics.jsonl")
    );
    assert_eq!(
        config.summary_path(),
        PathBuf::from("/work/riot/proofs/logs/codex_summary.json")
    );

    let targets: Vec<_> = config.plan.iter().collect();
    assert_eq!(targets.len(), 2);
    assert_eq!(targets[0].function_name, "event_timeout_set");
    assert_eq!(
        targets[0].target_file,
        PathBuf::from("/work/riot/sys/event/timeout.c")
    );
    assert_eq!(
        targets[0].proof_dir,
        PathBuf::from("/work/riot/proofs/event_timeout_set")
    );
    assert_eq!(
        targets[0].makefile_include,
        PathBuf::from("/work/riot/proofs/include/Makefile.include")
    );
    assert_eq!(targets[1].function_name, "usbus_register_event_handler");
}

#[test]
fn test_agent_and_store_settings() {
    let config = RunConfig::from_yaml_str(FULL_CONFIG, RunOptions::default()).unwrap();

    assert_eq!(config.agent.program(), "codex");
    assert_eq!(config.agent.timeout, Some(Duration::from_secs(120)));
    assert_eq!(config.agent.pricing, Some(Pricing::new(1.75, 0.175, 14.0)));
    assert_eq!(config.session_store.root, PathBuf::from("/tmp/codex-sessions"));
    assert_eq!(config.session_store.wait, Duration::from_secs(5));
    assert_eq!(config.session_store.poll_interval, Duration::from_millis(250));
}

#[test]
fn test_options_flow_into_config() {
    let options = RunOptions {
        use_examples: true,
        limit: Some(1),
    };
    let config = RunConfig::from_yaml_str(FULL_CONFIG, options).unwrap();
    assert!(config.use_examples);
    assert_eq!(config.plan.len(), 1);
    assert_eq!(config.plan.declared().len(), 2);
}

#[test]
fn test_defaults_for_agent() {
    let config = RunConfig::from_yaml_str(&minimal("targets: []"), RunOptions::default()).unwrap();
    assert_eq!(
        config.agent.command,
        vec!["codex", "exec", "--full-auto", "{PROMPT}"]
    );
    assert_eq!(config.agent.required_env, vec!["OPENAI_API_KEY"]);
    assert_eq!(
        config.agent.timeout,
        Some(Duration::from_secs(DEFAULT_AGENT_TIMEOUT_SECS))
    );
    assert!(config.agent.pricing.is_none());
    assert_eq!(
        config.session_store.wait,
        Duration::from_secs(DEFAULT_SESSION_WAIT_SECS)
    );
}

#[test]
fn test_custom_command_drops_default_env_requirement() {
    let yaml = minimal("agent:\n  command: [\"sh\", \"-c\", \"cat\"]\n  timeout_secs: 0\ntargets: []");
    let config = RunConfig::from_yaml_str(&yaml, RunOptions::default()).unwrap();
    assert!(config.agent.required_env.is_empty());
    assert_eq!(config.agent.timeout, None);
}

#[test]
fn test_empty_targets_is_valid() {
    let config = RunConfig::from_yaml_str(&minimal(""), RunOptions::default()).unwrap();
    assert!(config.plan.is_empty());
}

#[test]
fn test_missing_required_fields_are_all_reported() {
    let err = RunConfig::from_yaml_str("examples_dir: x\n", RunOptions::default()).unwrap_err();
    match err {
        ConfigError::Invalid(problems) => {
            assert!(problems.contains(&"project_root is required".to_string()));
            assert!(problems.contains(&"proof_root is required".to_string()));
            assert!(problems.contains(&"makefile_include_dir is required".to_string()));
        }
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[test]
fn test_target_problems_are_reported_with_index() {
    let yaml = minimal(
        "targets:\n  - function: ok\n    file_path: a.c\n  - file_path: b.c\n  - function: ok\n    file_path: c.c\n  - function: ../x\n    file_path: d.c\n  - function: nofile\n",
    );
    let err = RunConfig::from_yaml_str(&yaml, RunOptions::default()).unwrap_err();
    let ConfigError::Invalid(problems) = err else {
        panic!("expected Invalid");
    };
    assert_eq!(problems.len(), 4);
    assert!(problems[0].starts_with("targets[1]: function is required"));
    assert!(problems[1].contains("duplicate function 'ok'"));
    assert!(problems[2].starts_with("targets[3]: function name '../x'"));
    assert!(problems[3].contains("(nofile): file_path is required"));
}

#[test]
fn test_device_like_function_names_are_valid_targets() {
    let yaml = minimal(
        "targets:\n  - function: aux\n    file_path: a.c\n  - function: con\n    file_path: b.c\n",
    );
    let config = RunConfig::from_yaml_str(&yaml, RunOptions::default()).unwrap();
    let names: Vec<_> = config.plan.iter().map(|t| t.function_name.as_str()).collect();
    assert_eq!(names, vec!["aux", "con"]);
    assert_eq!(
        config.plan.iter().nth(1).unwrap().proof_dir,
        PathBuf::from("/p/proofs/con")
    );
}

#[test]
fn test_negative_rate_is_rejected() {
    let yaml = minimal("agent:\n  pricing:\n    input_per_unit: -1.0\ntargets: []");
    let err = RunConfig::from_yaml_str(&yaml, RunOptions::default()).unwrap_err();
    assert!(err.to_string().contains("pricing.input_per_unit cannot be negative"));
}

#[test]
fn test_partial_pricing_is_accepted() {
    let yaml = minimal("agent:\n  pricing:\n    input_per_unit: 1.0\ntargets: []");
    let config = RunConfig::from_yaml_str(&yaml, RunOptions::default()).unwrap();
    let pricing = config.agent.pricing.unwrap();
    assert!(!pricing.is_complete());
}

#[test]
fn test_empty_command_is_rejected() {
    let yaml = minimal("agent:\n  command: []\ntargets: []");
    let err = RunConfig::from_yaml_str(&yaml, RunOptions::default()).unwrap_err();
    assert!(err.to_string().contains("agent.command must name a program"));
}

#[test]
fn test_malformed_yaml_is_parse_error() {
    let err = RunConfig::from_yaml_str("targets: [unclosed", RunOptions::default()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_load_missing_file_is_read_error() {
    let temp = tempfile::tempdir().unwrap();
    let err = RunConfig::load(&temp.path().join("nope.yaml"), RunOptions::default()).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn test_load_from_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("targets.yaml");
    std::fs::write(&path, FULL_CONFIG).unwrap();
    let config = RunConfig::load(&path, RunOptions::default()).unwrap();
    assert_eq!(config.plan.len(), 2);
}

#[test]
#[serial]
fn test_default_session_root_prefers_codex_home() {
    let previous = std::env::var_os("CODEX_HOME");
    std::env::set_var("CODEX_HOME", "/opt/codex");
    let root = default_session_root();
    match previous {
        Some(v) => std::env::set_var("CODEX_HOME", v),
        None => std::env::remove_var("CODEX_HOME"),
    }
    assert_eq!(root, Some(PathBuf::from("/opt/codex/sessions")));
}

#[test]
fn test_expand_home() {
    assert_eq!(expand_home("/abs"), Some(PathBuf::from("/abs")));
    if let Some(home) = dirs::home_dir() {
        assert_eq!(expand_home("~/x/y"), Some(home.join("x/y")));
        assert_eq!(expand_home("~"), Some(home));
    }
}
