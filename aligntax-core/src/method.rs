//! Alignment methods and the three-metric overhead contract.
//!
//! The built-in methods form a closed set ([`Method`]). Anything else is added to a
//! [`MethodRegistry`] as a strategy object implementing [`OverheadModel`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Result, TaxError};
use crate::scale::Scale;
use crate::table::{OverheadEntry, OverheadTable};

/// Built-in alignment interventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Baseline,
    Rlhf,
    ConstitutionalAi,
    Dpo,
    OutputFiltering,
    ActivationSteering,
}

impl Method {
    pub const ALL: [Method; 6] = [
        Method::Baseline,
        Method::Rlhf,
        Method::ConstitutionalAi,
        Method::Dpo,
        Method::OutputFiltering,
        Method::ActivationSteering,
    ];

    /// Canonical table key.
    pub fn key(self) -> &'static str {
        match self {
            Method::Baseline => "baseline",
            Method::Rlhf => "rlhf",
            Method::ConstitutionalAi => "constitutional",
            Method::Dpo => "dpo",
            Method::OutputFiltering => "filtering",
            Method::ActivationSteering => "activation_steering",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Method::Baseline => "Baseline",
            Method::Rlhf => "RLHF",
            Method::ConstitutionalAi => "Constitutional AI",
            Method::Dpo => "DPO",
            Method::OutputFiltering => "Output Filtering",
            Method::ActivationSteering => "Activation Steering",
        }
    }

    pub fn is_baseline(self) -> bool {
        self == Method::Baseline
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for Method {
    type Err = TaxError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "baseline" | "none" => Ok(Method::Baseline),
            "rlhf" => Ok(Method::Rlhf),
            "constitutional" | "constitutional_ai" | "cai" => Ok(Method::ConstitutionalAi),
            "dpo" => Ok(Method::Dpo),
            "filtering" | "output_filtering" => Ok(Method::OutputFiltering),
            "activation_steering" | "steering" => Ok(Method::ActivationSteering),
            _ => Err(TaxError::not_found(format!("unknown method '{}'", s))),
        }
    }
}

/// Resolve a user-supplied name to its registry key. Built-in aliases map to the
/// canonical key; anything else is returned lowercased as-is.
pub fn canonical_key(name: &str) -> String {
    match name.parse::<Method>() {
        Ok(method) => method.key().to_string(),
        Err(_) => name.trim().to_lowercase(),
    }
}

/// Overhead of one method at one scale, in the three reported metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverheadEstimate {
    /// Extra FLOPs relative to baseline, percent.
    pub flops_overhead_pct: f64,
    /// Extra memory relative to baseline, percent.
    pub memory_overhead_pct: f64,
    /// Downstream task performance lost, percentage points (non-negative loss).
    pub task_regression_pp: f64,
}

impl OverheadEstimate {
    pub const ZERO: OverheadEstimate = OverheadEstimate {
        flops_overhead_pct: 0.0,
        memory_overhead_pct: 0.0,
        task_regression_pp: 0.0,
    };

    pub fn is_finite(&self) -> bool {
        self.flops_overhead_pct.is_finite()
            && self.memory_overhead_pct.is_finite()
            && self.task_regression_pp.is_finite()
    }
}

/// Strategy producing overhead estimates for a method.
///
/// Implementations must be deterministic: the same scale always yields the same estimate.
pub trait OverheadModel: Send + Sync {
    /// Registry key of the method.
    fn name(&self) -> &str;

    /// Estimate the method's overhead at the given scale.
    fn estimate(&self, scale: Scale) -> OverheadEstimate;

    /// Whether the estimate varies with scale.
    fn is_scale_sensitive(&self) -> bool {
        false
    }
}

/// Overhead model backed by a row of the overhead table.
#[derive(Debug, Clone)]
pub struct TableModel {
    name: String,
    entry: OverheadEntry,
}

impl TableModel {
    pub fn new(name: impl Into<String>, entry: OverheadEntry) -> Self {
        Self {
            name: name.into(),
            entry,
        }
    }

    pub fn entry(&self) -> &OverheadEntry {
        &self.entry
    }
}

impl OverheadModel for TableModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn estimate(&self, scale: Scale) -> OverheadEstimate {
        let base = OverheadEstimate {
            flops_overhead_pct: self.entry.flops_overhead_pct,
            memory_overhead_pct: self.entry.memory_overhead_pct,
            task_regression_pp: self.entry.task_regression_pp,
        };
        match &self.entry.scale_sensitivity {
            Some(sensitivity) => sensitivity.apply(base, scale),
            None => base,
        }
    }

    fn is_scale_sensitive(&self) -> bool {
        self.entry
            .scale_sensitivity
            .as_ref()
            .is_some_and(|s| !s.is_flat())
    }
}

/// Name → overhead model lookup used by the sampler.
#[derive(Clone, Default)]
pub struct MethodRegistry {
    models: BTreeMap<String, Arc<dyn OverheadModel>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry with one [`TableModel`] per table row.
    pub fn from_table(table: &OverheadTable) -> Self {
        let models = table
            .iter()
            .map(|(name, entry)| {
                let model: Arc<dyn OverheadModel> =
                    Arc::new(TableModel::new(name.clone(), entry.clone()));
                (name.clone(), model)
            })
            .collect();
        Self { models }
    }

    /// Register a custom method. Names already present are rejected.
    pub fn register(&mut self, model: Arc<dyn OverheadModel>) -> Result<()> {
        let key = canonical_key(model.name());
        if key.is_empty() {
            return Err(TaxError::validation("method name must not be empty"));
        }
        if self.models.contains_key(&key) {
            return Err(TaxError::validation(format!(
                "method '{}' is already registered",
                key
            )));
        }
        tracing::debug!(method = %key, "Registered custom overhead model");
        self.models.insert(key, model);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Arc<dyn OverheadModel>> {
        let key = canonical_key(name);
        self.models.get(&key).ok_or_else(|| {
            TaxError::not_found(format!(
                "unknown method '{}'. Available: {}",
                name,
                self.names().join(", ")
            ))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(&canonical_key(name))
    }

    pub fn names(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("methods", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedModel;

    impl OverheadModel for FixedModel {
        fn name(&self) -> &str {
            "rome"
        }

        fn estimate(&self, _scale: Scale) -> OverheadEstimate {
            OverheadEstimate::ZERO
        }
    }

    #[test]
    fn test_method_aliases() {
        assert_eq!("Constitutional AI".parse::<Method>().unwrap(), Method::ConstitutionalAi);
        assert_eq!("steering".parse::<Method>().unwrap(), Method::ActivationSteering);
        assert_eq!("output-filtering".parse::<Method>().unwrap(), Method::OutputFiltering);
        assert!(matches!("ppo".parse::<Method>(), Err(TaxError::NotFound(_))));
    }

    #[test]
    fn test_registry_from_default_table() {
        let registry = MethodRegistry::from_table(&OverheadTable::default());
        assert_eq!(registry.len(), Method::ALL.len());
        assert!(registry.contains("RLHF"));
        assert!(registry.contains("cai"));
        let rlhf = registry.get("rlhf").unwrap();
        assert_eq!(rlhf.estimate(Scale::B1_3).flops_overhead_pct, 40.0);
        assert!(!rlhf.is_scale_sensitive());
    }

    #[test]
    fn test_registry_unknown_is_not_found() {
        let registry = MethodRegistry::from_table(&OverheadTable::default());
        let err = registry.get("ppo").err().unwrap();
        assert!(matches!(err, TaxError::NotFound(_)));
        assert!(err.to_string().contains("rlhf"));
    }

    #[test]
    fn test_register_custom_and_duplicate() {
        let mut registry = MethodRegistry::from_table(&OverheadTable::default());
        registry.register(Arc::new(FixedModel)).unwrap();
        assert!(registry.contains("rome"));
        assert!(matches!(
            registry.register(Arc::new(FixedModel)),
            Err(TaxError::Validation(_))
        ));
    }
}
