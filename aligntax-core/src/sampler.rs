//! Scale sampler — expand a method's overhead figures across model scales.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TaxError};
use crate::method::{MethodRegistry, OverheadEstimate, canonical_key};
use crate::scale::{Scale, validate_scales};
use crate::scaling::Metric;

/// Overhead of one method at one scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverheadRecord {
    pub method: String,
    pub scale: Scale,
    pub flops_overhead_pct: f64,
    pub memory_overhead_pct: f64,
    pub task_regression_pp: f64,
}

impl OverheadRecord {
    pub fn new(method: impl Into<String>, scale: Scale, estimate: OverheadEstimate) -> Self {
        Self {
            method: method.into(),
            scale,
            flops_overhead_pct: estimate.flops_overhead_pct,
            memory_overhead_pct: estimate.memory_overhead_pct,
            task_regression_pp: estimate.task_regression_pp,
        }
    }

    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Flops => self.flops_overhead_pct,
            Metric::Memory => self.memory_overhead_pct,
            Metric::TaskRegression => self.task_regression_pp,
        }
    }
}

/// Produces [`OverheadRecord`]s from the registered overhead models.
#[derive(Debug, Clone)]
pub struct ScaleSampler {
    registry: MethodRegistry,
}

impl ScaleSampler {
    pub fn new(registry: MethodRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut MethodRegistry {
        &mut self.registry
    }

    /// One record per requested scale, in the order given.
    pub fn sample(&self, method: &str, scales: &[Scale]) -> Result<Vec<OverheadRecord>> {
        validate_scales(scales)?;
        let model = self.registry.get(method)?;
        let key = canonical_key(method);

        let mut records = Vec::with_capacity(scales.len());
        for &scale in scales {
            let estimate = model.estimate(scale);
            if !estimate.is_finite() {
                return Err(TaxError::numeric(format!(
                    "method '{}' produced a non-finite overhead at scale {}",
                    model.name(),
                    scale
                )));
            }
            records.push(OverheadRecord::new(key.clone(), scale, estimate));
        }

        tracing::debug!(
            method = %key,
            scales = scales.len(),
            scale_sensitive = model.is_scale_sensitive(),
            "Sampled overhead records"
        );
        Ok(records)
    }

    /// Sample several methods; each method's outcome is independent of the others.
    pub fn sample_all(
        &self,
        methods: &[String],
        scales: &[Scale],
    ) -> Vec<(String, Result<Vec<OverheadRecord>>)> {
        methods
            .iter()
            .map(|m| (m.clone(), self.sample(m, scales)))
            .collect()
    }
}
