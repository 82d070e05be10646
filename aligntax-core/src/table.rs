//! Overhead table — published or assumed per-method overhead figures.
//!
//! The table is configuration data: the built-in defaults can be overridden from a
//! TOML/JSON file or merged through the layered config, and every loaded table is
//! validated before use.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Result, TaxError};
use crate::method::{Method, OverheadEstimate, canonical_key};
use crate::scale::Scale;

/// One row of the overhead table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverheadEntry {
    /// FLOPs overhead relative to baseline, percent.
    pub flops_overhead_pct: f64,
    /// Memory overhead relative to baseline, percent.
    pub memory_overhead_pct: f64,
    /// Task performance lost, percentage points.
    pub task_regression_pp: f64,
    /// Where the figure comes from (paper, measurement, placeholder).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Optional scale-dependence hook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_sensitivity: Option<ScaleSensitivity>,
}

impl OverheadEntry {
    pub fn new(flops_overhead_pct: f64, memory_overhead_pct: f64, task_regression_pp: f64) -> Self {
        Self {
            flops_overhead_pct,
            memory_overhead_pct,
            task_regression_pp,
            source: None,
            scale_sensitivity: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_sensitivity(mut self, sensitivity: ScaleSensitivity) -> Self {
        self.scale_sensitivity = Some(sensitivity);
        self
    }

    fn validate(&self, name: &str) -> Result<()> {
        let fields = [
            ("flops_overhead_pct", self.flops_overhead_pct),
            ("memory_overhead_pct", self.memory_overhead_pct),
            ("task_regression_pp", self.task_regression_pp),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(TaxError::validation(format!(
                    "{}.{} must be finite, got {}",
                    name, field, value
                )));
            }
            if value < 0.0 {
                return Err(TaxError::validation(format!(
                    "{}.{} must be non-negative, got {}",
                    name, field, value
                )));
            }
        }
        if let Some(sensitivity) = &self.scale_sensitivity {
            sensitivity.validate(name)?;
        }
        Ok(())
    }
}

/// Power-law adjustment applied to a table row:
/// `value(scale) = base * (scale / reference_scale) ^ exponent`, per metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleSensitivity {
    pub reference_scale: Scale,
    #[serde(default)]
    pub flops_exponent: f64,
    #[serde(default)]
    pub memory_exponent: f64,
    #[serde(default)]
    pub regression_exponent: f64,
}

impl ScaleSensitivity {
    pub fn new(reference_scale: Scale) -> Self {
        Self {
            reference_scale,
            flops_exponent: 0.0,
            memory_exponent: 0.0,
            regression_exponent: 0.0,
        }
    }

    /// True when every exponent is zero, i.e. the hook is a no-op.
    pub fn is_flat(&self) -> bool {
        self.flops_exponent == 0.0 && self.memory_exponent == 0.0 && self.regression_exponent == 0.0
    }

    pub fn apply(&self, base: OverheadEstimate, scale: Scale) -> OverheadEstimate {
        let ratio = scale.as_f64() / self.reference_scale.as_f64();
        OverheadEstimate {
            flops_overhead_pct: base.flops_overhead_pct * ratio.powf(self.flops_exponent),
            memory_overhead_pct: base.memory_overhead_pct * ratio.powf(self.memory_exponent),
            task_regression_pp: base.task_regression_pp * ratio.powf(self.regression_exponent),
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        for (field, value) in [
            ("flops_exponent", self.flops_exponent),
            ("memory_exponent", self.memory_exponent),
            ("regression_exponent", self.regression_exponent),
        ] {
            if !value.is_finite() {
                return Err(TaxError::validation(format!(
                    "{}.scale_sensitivity.{} must be finite",
                    name, field
                )));
            }
        }
        Ok(())
    }
}

/// Method key → overhead figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverheadTable {
    #[serde(default)]
    methods: BTreeMap<String, OverheadEntry>,
}

impl Default for OverheadTable {
    fn default() -> Self {
        let mut methods = BTreeMap::new();
        let rows = [
            (
                Method::Baseline,
                OverheadEntry::new(0.0, 0.0, 0.0).with_source("definition: unmodified model"),
            ),
            (
                // reward model + PPO passes; reward model, value head and reference model in memory
                Method::Rlhf,
                OverheadEntry::new(40.0, 110.0, 2.0).with_source("Ouyang et al. 2022 (assumed)"),
            ),
            (
                // critique + revision passes
                Method::ConstitutionalAi,
                OverheadEntry::new(60.0, 30.0, 1.0).with_source("Bai et al. 2022 (assumed)"),
            ),
            (
                // no separate reward model, reference model still resident
                Method::Dpo,
                OverheadEntry::new(15.0, 50.0, 1.5).with_source("Rafailov et al. 2023 (assumed)"),
            ),
            (
                // classifier pass on output
                Method::OutputFiltering,
                OverheadEntry::new(5.0, 10.0, 0.5).with_source("placeholder"),
            ),
            (
                // vector addition at inference
                Method::ActivationSteering,
                OverheadEntry::new(2.0, 1.0, 0.8).with_source("Turner et al. 2023 (assumed)"),
            ),
        ];
        for (method, entry) in rows {
            methods.insert(method.key().to_string(), entry);
        }
        Self { methods }
    }
}

impl OverheadTable {
    /// An empty table, for building one row by row.
    pub fn empty() -> Self {
        Self {
            methods: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: &str, entry: OverheadEntry) {
        self.methods.insert(canonical_key(name), entry);
    }

    pub fn get(&self, name: &str) -> Result<&OverheadEntry> {
        self.methods
            .get(&canonical_key(name))
            .ok_or_else(|| TaxError::not_found(format!("no overhead entry for method '{}'", name)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OverheadEntry)> {
        self.methods.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.methods.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Check every row. Keys are normalized to their canonical form.
    pub fn validate(&self) -> Result<()> {
        if self.methods.is_empty() {
            return Err(TaxError::validation("overhead table has no methods"));
        }
        for (name, entry) in &self.methods {
            if name.trim().is_empty() {
                return Err(TaxError::validation("overhead table has an empty method name"));
            }
            entry.validate(name)?;
        }
        Ok(())
    }

    /// Re-key rows under their canonical names (e.g. `cai` → `constitutional`).
    pub fn normalized(self) -> Result<Self> {
        let mut methods = BTreeMap::new();
        for (name, entry) in self.methods {
            let key = canonical_key(&name);
            if methods.insert(key.clone(), entry).is_some() {
                return Err(TaxError::validation(format!(
                    "method '{}' appears more than once in the overhead table",
                    key
                )));
            }
        }
        Ok(Self { methods })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: OverheadTable = toml::from_str(content)?;
        let table = table.normalized()?;
        table.validate()?;
        Ok(table)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let table: OverheadTable = serde_json::from_str(content)?;
        let table = table.normalized()?;
        table.validate()?;
        Ok(table)
    }

    /// Load a table file; the format follows the extension (`.json`, otherwise TOML).
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let table = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content)?,
            _ => Self::from_toml_str(&content)?,
        };
        tracing::info!(path = %path.display(), methods = table.len(), "Loaded overhead table");
        Ok(table)
    }
}
