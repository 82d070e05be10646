//! End-to-end pipeline tests: config loading, benchmarking, fitting, selection and reporting.

use pretty_assertions::assert_eq;
use std::fs;

use aligntax_core::config::load_config;
use aligntax_core::{AlignmentTaxQuantifier, Metric, Scale, TaxError};

#[test]
fn workspace_config_overrides_table_and_scales() {
    let dir = tempfile::tempdir().unwrap();
    let cfg_dir = dir.path().join(".aligntax");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(
        cfg_dir.join("config.toml"),
        r#"
[benchmark]
scales = [125000000, 1300000000]
seq_len = 1024

[overheads.methods.dpo]
flops_overhead_pct = 12.0
memory_overhead_pct = 50.0
task_regression_pp = 1.5
source = "local measurement"

[overheads.methods.rome]
flops_overhead_pct = 0.0
memory_overhead_pct = 0.0
task_regression_pp = 0.3
"#,
    )
    .unwrap();

    let config = load_config(Some(dir.path()), None).unwrap();
    assert_eq!(config.benchmark.scales, vec![Scale::M125, Scale::B1_3]);
    assert_eq!(config.benchmark.seq_len, 1024);
    assert_eq!(config.overheads.get("dpo").unwrap().flops_overhead_pct, 12.0);
    // rows not mentioned keep their built-in values
    assert_eq!(config.overheads.get("rlhf").unwrap().flops_overhead_pct, 40.0);

    let mut q = AlignmentTaxQuantifier::new(&config);
    let results = q.benchmark(None, None).unwrap();
    assert_eq!(results.len(), 7 * 2);

    let rome_fit = q.fit("rome", Metric::Flops, None).unwrap();
    assert_eq!(rome_fit.a, 0.0);

    let frontier = q.pareto(Scale::B1_3, Metric::Flops).unwrap();
    assert_eq!(frontier.method_names(), vec!["rome"]);
}

#[test]
fn overheads_file_replaces_table() {
    let dir = tempfile::tempdir().unwrap();
    let table_path = dir.path().join("overheads.json");
    fs::write(
        &table_path,
        r#"{"methods": {
            "rlhf": {"flops_overhead_pct": 40.0, "memory_overhead_pct": 110.0, "task_regression_pp": 2.0},
            "dpo": {"flops_overhead_pct": 15.0, "memory_overhead_pct": 50.0, "task_regression_pp": 1.5},
            "filtering": {"flops_overhead_pct": 5.0, "memory_overhead_pct": 10.0, "task_regression_pp": 0.5}
        }}"#,
    )
    .unwrap();
    let cfg_path = dir.path().join("aligntax.toml");
    fs::write(
        &cfg_path,
        format!("overheads_file = {:?}\n", table_path.display().to_string()),
    )
    .unwrap();

    let config = load_config(None, Some(&cfg_path)).unwrap();
    assert_eq!(config.overheads.len(), 3);

    let q = AlignmentTaxQuantifier::new(&config);
    let frontier = q.pareto(Scale::B1_3, Metric::Flops).unwrap();
    assert_eq!(frontier.method_names(), vec!["filtering"]);
    assert_eq!(frontier.dominated(), &["dpo".to_string(), "rlhf".to_string()]);
}

#[test]
fn invalid_table_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("aligntax.toml");
    fs::write(
        &cfg_path,
        r#"
[overheads.methods.dpo]
flops_overhead_pct = -3.0
memory_overhead_pct = 50.0
task_regression_pp = 1.5
"#,
    )
    .unwrap();
    let err = load_config(None, Some(&cfg_path)).unwrap_err();
    assert!(matches!(err, TaxError::Validation(_)), "{err}");
}

#[test]
fn json_report_round_trips_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut q = AlignmentTaxQuantifier::new(&Default::default());
    q.benchmark(Some("rlhf"), Some(Scale::B1_3)).unwrap();
    let path = dir.path().join("report.json");
    q.write_json(&path).unwrap();

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let results = value["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["method"], "rlhf");
    assert_eq!(results[0]["model"], "1.3B");
    assert_eq!(results[0]["memory_overhead_pct"], 110.0);
}

#[test]
fn failed_fit_does_not_affect_other_methods() {
    let mut config = aligntax_core::AppConfig::default();
    config.benchmark.scales = vec![Scale::B1_3];
    let q = AlignmentTaxQuantifier::new(&config);
    // a single scale cannot support a fit, but the frontier is still computable
    for (_, fit) in q.fit_all(Metric::Flops) {
        assert!(matches!(fit, Err(TaxError::Numeric(_))));
    }
    assert_eq!(q.pareto(Scale::B1_3, Metric::Flops).unwrap().len(), 2);
}

#[test]
fn workspace_rows_under_aliases_override_builtin_rows() {
    let dir = tempfile::tempdir().unwrap();
    let cfg_dir = dir.path().join(".aligntax");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(
        cfg_dir.join("config.toml"),
        r#"
[overheads.methods.steering]
flops_overhead_pct = 3.0

[overheads.methods.cai]
flops_overhead_pct = 55.0
memory_overhead_pct = 25.0
task_regression_pp = 1.2
"#,
    )
    .unwrap();

    let config = load_config(Some(dir.path()), None).unwrap();
    assert_eq!(config.overheads.len(), 6);

    let steering = config.overheads.get("activation_steering").unwrap();
    assert_eq!(steering.flops_overhead_pct, 3.0);
    // untouched fields keep their built-in values
    assert_eq!(steering.memory_overhead_pct, 1.0);
    assert_eq!(steering.task_regression_pp, 0.8);

    let cai = config.overheads.get("constitutional").unwrap();
    assert_eq!(cai.flops_overhead_pct, 55.0);
    assert_eq!(cai.task_regression_pp, 1.2);
}
