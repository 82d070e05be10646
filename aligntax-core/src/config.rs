//! Configuration for aligntax.
//!
//! Uses `figment` for layered configuration: defaults -> user config -> workspace config ->
//! explicit file -> environment. Configuration is loaded from
//! `~/.config/aligntax/config.toml` and/or `.aligntax/config.toml` in the workspace.

use figment::{
    Figment, Metadata, Profile, Provider,
    providers::{Env, Format, Serialized, Toml},
    value::{Dict, Map, Value},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, TaxError};
use crate::method::canonical_key;
use crate::scale::{Scale, validate_scales};
use crate::table::OverheadTable;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Per-method overhead figures. Rows here are merged over the built-in table.
    #[serde(default)]
    pub overheads: OverheadTable,
    /// Replace the overhead table entirely with the contents of this file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overheads_file: Option<PathBuf>,
    #[serde(default)]
    pub benchmark: BenchmarkConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// Benchmark pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Methods to benchmark; empty means every method in the table.
    #[serde(default)]
    pub methods: Vec<String>,
    /// Model sizes (parameter counts) to benchmark at.
    #[serde(default = "Scale::default_set")]
    pub scales: Vec<Scale>,
    /// Sequence length used for FLOP estimation.
    #[serde(default = "default_seq_len")]
    pub seq_len: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    /// Bytes per parameter for memory estimation (2 = fp16/bf16).
    #[serde(default = "default_dtype_bytes")]
    pub dtype_bytes: u64,
    /// Assumed baseline task score (0.0-1.0).
    #[serde(default = "default_task_score")]
    pub task_score_baseline: f64,
    /// Sustained FLOP/s used to turn FLOPs into simulated wall-clock time.
    #[serde(default = "default_throughput")]
    pub throughput_flops: f64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            methods: Vec::new(),
            scales: Scale::default_set(),
            seq_len: default_seq_len(),
            batch_size: default_batch_size(),
            dtype_bytes: default_dtype_bytes(),
            task_score_baseline: default_task_score(),
            throughput_flops: default_throughput(),
        }
    }
}

impl BenchmarkConfig {
    pub fn validate(&self) -> Result<()> {
        validate_scales(&self.scales)?;
        if self.seq_len == 0 || self.batch_size == 0 || self.dtype_bytes == 0 {
            return Err(TaxError::validation(
                "seq_len, batch_size and dtype_bytes must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.task_score_baseline) {
            return Err(TaxError::validation(format!(
                "task_score_baseline must be within 0.0-1.0, got {}",
                self.task_score_baseline
            )));
        }
        if !self.throughput_flops.is_finite() || self.throughput_flops <= 0.0 {
            return Err(TaxError::validation("throughput_flops must be positive"));
        }
        Ok(())
    }
}

fn default_seq_len() -> u64 {
    2048
}

fn default_batch_size() -> u64 {
    1
}

fn default_dtype_bytes() -> u64 {
    2
}

fn default_task_score() -> f64 {
    0.85
}

fn default_throughput() -> f64 {
    1e12
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = TaxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "table" | "text" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            other => Err(TaxError::validation(format!("unknown output format '{}'", other))),
        }
    }
}

/// Report rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Decimal places for percentages in tables.
    #[serde(default = "default_precision")]
    pub precision: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            precision: default_precision(),
        }
    }
}

fn default_precision() -> usize {
    1
}

impl AppConfig {
    /// Resolve `overheads_file`, normalize method keys and validate everything.
    pub fn finalize(mut self) -> Result<Self> {
        if let Some(path) = &self.overheads_file {
            self.overheads = OverheadTable::load(path)?;
        }
        self.overheads = self.overheads.normalized()?;
        self.overheads.validate()?;
        self.benchmark.validate()?;
        Ok(self)
    }
}

/// User-level config file location, if a home directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "aligntax", "aligntax")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Workspace-level config file location.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".aligntax").join("config.toml")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `ALIGNTAX_`, nested keys split on `__`)
/// 2. Explicit config file (`--config`)
/// 3. Workspace-local config (`.aligntax/config.toml`)
/// 4. User config (`~/.config/aligntax/config.toml`)
/// 5. Built-in defaults
pub fn load_config(workspace: Option<&Path>, explicit: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(CanonicalMethods(Toml::file(&user_config)));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(CanonicalMethods(Toml::file(&ws_config)));
        }
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(TaxError::not_found(format!(
                "config file '{}' does not exist",
                path.display()
            )));
        }
        figment = figment.merge(CanonicalMethods(Toml::file(path)));
    }

    // ALIGNTAX_BENCHMARK__SEQ_LEN, ALIGNTAX_REPORT__FORMAT, ...
    figment = figment.merge(CanonicalMethods(Env::prefixed("ALIGNTAX_").split("__")));

    let config: AppConfig = figment.extract().map_err(Box::new)?;
    config.finalize()
}

/// Wraps a provider so rows under `overheads.methods` are keyed by canonical method name.
///
/// Without this, `[overheads.methods.steering]` would sit beside the built-in
/// `activation_steering` row instead of merging into it.
struct CanonicalMethods<P>(P);

impl<P: Provider> Provider for CanonicalMethods<P> {
    fn metadata(&self) -> Metadata {
        self.0.metadata()
    }

    fn data(&self) -> std::result::Result<Map<Profile, Dict>, figment::Error> {
        let mut data = self.0.data()?;
        for dict in data.values_mut() {
            canonicalize_method_rows(dict);
        }
        Ok(data)
    }

    fn profile(&self) -> Option<Profile> {
        self.0.profile()
    }
}

/// Re-key method rows in place. Rows that land on the same key within one layer are
/// merged field by field.
fn canonicalize_method_rows(dict: &mut Dict) {
    let Some(Value::Dict(_, overheads)) = dict.get_mut("overheads") else {
        return;
    };
    let Some(Value::Dict(_, methods)) = overheads.get_mut("methods") else {
        return;
    };
    for (name, row) in std::mem::take(methods) {
        let key = canonical_key(&name);
        if let (Some(Value::Dict(_, existing)), Value::Dict(_, incoming)) =
            (methods.get_mut(&key), &row)
        {
            existing.extend(incoming.clone());
            continue;
        }
        methods.insert(key, row);
    }
}

/// Check whether any aligntax configuration file exists (user-level or workspace-level).
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if user_config_path().is_some_and(|p| p.exists()) {
        return true;
    }
    workspace.is_some_and(|ws| workspace_config_path(ws).exists())
}
