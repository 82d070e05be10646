//! Config layer priority: user file < workspace file < explicit file < environment.
//!
//! Every test runs inside a `figment::Jail`, which serializes them and restores the
//! environment afterwards.

use figment::Jail;
use std::fs;
use std::path::Path;

use aligntax_core::config::{self, load_config};

fn write(path: &Path, contents: &str) -> figment::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    fs::write(path, contents).map_err(|e| e.to_string())?;
    Ok(())
}

#[test]
fn env_overrides_workspace_file() {
    Jail::expect_with(|jail| {
        let ws = jail.directory().to_path_buf();
        write(
            &config::workspace_config_path(&ws),
            "[benchmark]\nseq_len = 1024\ntask_score_baseline = 0.8\n",
        )?;
        jail.set_env("ALIGNTAX_BENCHMARK__SEQ_LEN", "4096");

        let cfg = load_config(Some(&ws), None).map_err(|e| e.to_string())?;
        assert_eq!(cfg.benchmark.seq_len, 4096);
        assert_eq!(cfg.benchmark.task_score_baseline, 0.8);
        Ok(())
    });
}

#[test]
fn env_row_under_alias_merges_into_canonical_row() {
    Jail::expect_with(|jail| {
        jail.set_env("ALIGNTAX_OVERHEADS__METHODS__STEERING__FLOPS_OVERHEAD_PCT", "3.5");

        let cfg = load_config(None, None).map_err(|e| e.to_string())?;
        let row = cfg.overheads.get("activation_steering").map_err(|e| e.to_string())?;
        assert_eq!(row.flops_overhead_pct, 3.5);
        assert_eq!(row.memory_overhead_pct, 1.0);
        assert_eq!(cfg.overheads.len(), 6);
        Ok(())
    });
}

#[test]
fn explicit_file_overrides_workspace_and_env_overrides_both() {
    Jail::expect_with(|jail| {
        let ws = jail.directory().to_path_buf();
        write(
            &config::workspace_config_path(&ws),
            "[benchmark]\nseq_len = 1024\nbatch_size = 2\n",
        )?;
        let explicit = ws.join("override.toml");
        write(&explicit, "[benchmark]\nseq_len = 512\nbatch_size = 4\n")?;
        jail.set_env("ALIGNTAX_BENCHMARK__BATCH_SIZE", "8");

        let cfg = load_config(Some(&ws), Some(&explicit)).map_err(|e| e.to_string())?;
        assert_eq!(cfg.benchmark.seq_len, 512);
        assert_eq!(cfg.benchmark.batch_size, 8);
        Ok(())
    });
}

#[cfg(target_os = "linux")]
#[test]
fn user_file_sits_below_workspace_file() {
    Jail::expect_with(|jail| {
        let root = jail.directory().to_path_buf();
        jail.set_env("HOME", root.join("home").display());
        jail.set_env("XDG_CONFIG_HOME", root.join("xdg").display());

        let user = config::user_config_path().ok_or("no user config dir")?;
        assert!(user.starts_with(root.join("xdg")));
        write(&user, "[benchmark]\nseq_len = 256\n\n[report]\nprecision = 3\n")?;

        let ws = root.join("project");
        write(&config::workspace_config_path(&ws), "[benchmark]\nseq_len = 1024\n")?;

        let cfg = load_config(Some(&ws), None).map_err(|e| e.to_string())?;
        assert_eq!(cfg.benchmark.seq_len, 1024);
        assert_eq!(cfg.report.precision, 3);
        assert!(config::config_exists(None));
        Ok(())
    });
}
