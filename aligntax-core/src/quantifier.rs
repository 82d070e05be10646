//! Alignment tax quantifier — the end-to-end benchmark pipeline.
//!
//! Overhead table → scale sampler → (optional) scaling fit → Pareto selection → report.

use std::path::Path;
use std::sync::Arc;

use crate::config::{AppConfig, BenchmarkConfig};
use crate::error::{MethodFailure, Result, TaxError};
use crate::method::{MethodRegistry, OverheadModel, canonical_key};
use crate::pareto::{self, ParetoSet};
use crate::report::{self, BenchmarkResult, FitSummary, ParetoSummary, Report};
use crate::sampler::{OverheadRecord, ScaleSampler};
use crate::scale::Scale;
use crate::scaling::{self, FitCurve, Metric};

/// FLOPs for one transformer forward pass: `2 * params * seq_len * batch_size`.
pub fn estimate_flops(params: Scale, seq_len: u64, batch_size: u64) -> f64 {
    2.0 * params.as_f64() * seq_len as f64 * batch_size as f64
}

/// Parameter memory in MB.
pub fn estimate_memory_mb(params: Scale, dtype_bytes: u64) -> f64 {
    params.as_f64() * dtype_bytes as f64 / (1024.0 * 1024.0)
}

/// Benchmarks alignment overhead across methods and scales and accumulates the results.
#[derive(Debug, Clone)]
pub struct AlignmentTaxQuantifier {
    config: BenchmarkConfig,
    sampler: ScaleSampler,
    results: Vec<BenchmarkResult>,
}

impl AlignmentTaxQuantifier {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            config: config.benchmark.clone(),
            sampler: ScaleSampler::new(MethodRegistry::from_table(&config.overheads)),
            results: Vec::new(),
        }
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    pub fn set_task_score_baseline(&mut self, score: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&score) {
            return Err(TaxError::validation(format!(
                "baseline task score must be within 0.0-1.0, got {}",
                score
            )));
        }
        self.config.task_score_baseline = score;
        Ok(())
    }

    /// Add a custom method strategy alongside the table-driven ones.
    pub fn register(&mut self, model: Arc<dyn OverheadModel>) -> Result<()> {
        self.sampler.registry_mut().register(model)
    }

    /// Methods benchmarked when none is named: the configured list, or every registered method.
    pub fn methods(&self) -> Vec<String> {
        if self.config.methods.is_empty() {
            self.sampler.registry().names()
        } else {
            self.config.methods.iter().map(|m| canonical_key(m)).collect()
        }
    }

    pub fn results(&self) -> &[BenchmarkResult] {
        &self.results
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }

    /// Run benchmarks for one or all methods at one or all configured scales.
    ///
    /// Results are appended only when every requested method succeeds.
    pub fn benchmark(
        &mut self,
        method: Option<&str>,
        scale: Option<Scale>,
    ) -> Result<Vec<BenchmarkResult>> {
        let methods = match method {
            Some(m) => vec![m.to_string()],
            None => self.methods(),
        };
        let scales = match scale {
            Some(s) => vec![s],
            None => self.config.scales.clone(),
        };

        let mut results = Vec::with_capacity(methods.len() * scales.len());
        for name in &methods {
            for record in self.sampler.sample(name, &scales)? {
                results.push(self.measure(&record));
            }
        }

        tracing::info!(
            methods = methods.len(),
            scales = scales.len(),
            results = results.len(),
            "Benchmark complete"
        );
        self.results.extend(results.iter().cloned());
        Ok(results)
    }

    fn measure(&self, record: &OverheadRecord) -> BenchmarkResult {
        let cfg = &self.config;
        let base_flops = estimate_flops(record.scale, cfg.seq_len, cfg.batch_size);
        let base_memory = estimate_memory_mb(record.scale, cfg.dtype_bytes);

        let aligned_flops = base_flops * (1.0 + record.flops_overhead_pct / 100.0);
        let aligned_memory = base_memory * (1.0 + record.memory_overhead_pct / 100.0);
        let aligned_task = cfg.task_score_baseline - record.task_regression_pp / 100.0;

        // Simulated timing, proportional to FLOPs
        let base_time = base_flops / cfg.throughput_flops;
        let aligned_time = aligned_flops / cfg.throughput_flops;
        let time_overhead_pct = if base_time > 0.0 {
            (aligned_time / base_time - 1.0) * 100.0
        } else {
            0.0
        };

        BenchmarkResult {
            method: record.method.clone(),
            model: record.scale.to_string(),
            params: record.scale,
            baseline_flops: base_flops,
            aligned_flops,
            flops_overhead_pct: record.flops_overhead_pct,
            baseline_time_s: base_time,
            aligned_time_s: aligned_time,
            time_overhead_pct,
            baseline_task_score: cfg.task_score_baseline,
            aligned_task_score: aligned_task,
            task_regression_pp: record.task_regression_pp,
            memory_baseline_mb: base_memory,
            memory_aligned_mb: aligned_memory,
            memory_overhead_pct: record.memory_overhead_pct,
        }
    }

    /// Fit a scaling curve for one method's metric over the given (or configured) scales.
    pub fn fit(&self, method: &str, metric: Metric, scales: Option<&[Scale]>) -> Result<FitCurve> {
        let scales = scales.unwrap_or(self.config.scales.as_slice());
        let records = self.sampler.sample(method, scales)?;
        let curve = scaling::fit_records(&records, metric)?;
        tracing::debug!(method, %metric, a = curve.a, b = curve.b, "Fitted scaling curve");
        Ok(curve)
    }

    /// Fit one metric for every method. A failure only affects its own method.
    pub fn fit_all(&self, metric: Metric) -> Vec<(String, Result<FitCurve>)> {
        self.methods()
            .into_iter()
            .map(|m| {
                let fit = self.fit(&m, metric, None);
                if let Err(e) = &fit {
                    tracing::warn!(method = %m, error = %e, "Scaling fit failed");
                }
                (m, fit)
            })
            .collect()
    }

    /// Pareto frontier over all methods at `scale`, using `axis` as the overhead axis.
    ///
    /// A method that fails to sample does not stop the others; it is listed in
    /// [`ParetoSet::skipped`] with its error.
    pub fn pareto(&self, scale: Scale, axis: Metric) -> Result<ParetoSet> {
        let mut records = Vec::new();
        let mut skipped = Vec::new();
        for (method, sampled) in self.sampler.sample_all(&self.methods(), &[scale]) {
            match sampled {
                Ok(r) => records.extend(r),
                Err(e) => {
                    tracing::warn!(method = %method, error = %e, "Skipping method");
                    skipped.push(MethodFailure::new(method, &e));
                }
            }
        }
        let candidates = pareto::candidates_from_records(&records, scale, axis)?;
        Ok(pareto::select(&candidates)?.with_skipped(skipped))
    }

    pub fn comparative_report(&self, precision: usize) -> String {
        report::comparative_table(&self.results, precision)
    }

    /// Report of the accumulated results.
    pub fn report(&self) -> Report {
        Report::new(self.results.clone())
    }

    /// Report including a fit for every method on `metric` and the frontier at `scale`.
    pub fn full_report(&self, metric: Metric, scale: Scale) -> Result<Report> {
        let mut report = self.report();
        for (method, fit) in self.fit_all(metric) {
            match fit {
                Ok(curve) => report.fits.push(FitSummary {
                    method,
                    metric,
                    curve,
                    predictions: Vec::new(),
                }),
                Err(e) => report.skipped.push(MethodFailure::new(method, &e)),
            }
        }
        report.pareto = Some(ParetoSummary {
            scale,
            axis: metric_axis(metric),
            frontier: self.pareto(scale, metric_axis(metric))?,
        });
        Ok(report)
    }

    pub fn to_json(&self) -> Result<String> {
        self.report().to_json()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        self.report().write_json(path)
    }
}

/// Task regression is the second Pareto axis already; fall back to FLOPs for it.
fn metric_axis(metric: Metric) -> Metric {
    match metric {
        Metric::TaskRegression => Metric::Flops,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::{Method, OverheadEstimate};
    use crate::scaling::FitKind;

    fn quantifier() -> AlignmentTaxQuantifier {
        AlignmentTaxQuantifier::new(&AppConfig::default())
    }

    #[test]
    fn test_benchmark_all_methods_all_scales() {
        let mut q = quantifier();
        let results = q.benchmark(None, None).unwrap();
        assert_eq!(results.len(), Method::ALL.len() * 4);
        for r in &results {
            assert!(r.flops_overhead_pct >= 0.0);
            assert!(r.aligned_flops >= r.baseline_flops);
            assert!(r.aligned_task_score <= r.baseline_task_score);
        }
        assert_eq!(q.results().len(), results.len());
    }

    #[test]
    fn test_rlhf_costs_more_than_filtering() {
        let mut q = quantifier();
        let results = q.benchmark(None, Some(Scale::B1_3)).unwrap();
        let rlhf = results.iter().find(|r| r.method == "rlhf").unwrap();
        let filt = results.iter().find(|r| r.method == "filtering").unwrap();
        assert!(rlhf.flops_overhead_pct > filt.flops_overhead_pct);
        assert!((rlhf.time_overhead_pct - 40.0).abs() < 1e-9);
        assert!((rlhf.aligned_task_score - 0.83).abs() < 1e-12);
        assert_eq!(rlhf.model, "1.3B");
    }

    #[test]
    fn test_unknown_method_leaves_results_untouched() {
        let mut q = quantifier();
        q.benchmark(Some("dpo"), None).unwrap();
        let err = q.benchmark(Some("ppo"), None).unwrap_err();
        assert!(matches!(err, TaxError::NotFound(_)));
        assert_eq!(q.results().len(), 4);
    }

    #[test]
    fn test_estimates() {
        assert_eq!(estimate_flops(Scale::M125, 2048, 1), 2.0 * 125e6 * 2048.0);
        let mb = estimate_memory_mb(Scale::new(1024 * 1024).unwrap(), 2);
        assert_eq!(mb, 2.0);
    }

    #[test]
    fn test_fit_scale_invariant_is_flat() {
        let q = quantifier();
        let curve = q.fit("rlhf", Metric::Flops, None).unwrap();
        assert!(curve.b.abs() < 1e-9);
        assert!((curve.a - 40.0).abs() < 1e-6);
        let baseline = q.fit("baseline", Metric::Flops, None).unwrap();
        assert_eq!(baseline.kind, FitKind::ZeroBypass);
    }

    #[test]
    fn test_pareto_default_table() {
        let q = quantifier();
        let set = q.pareto(Scale::B1_3, Metric::Flops).unwrap();
        // filtering (5, 0.5) and steering (2, 0.8) trade off; everything else is dominated
        assert_eq!(set.method_names(), vec!["activation_steering", "filtering"]);
    }

    #[test]
    fn test_custom_strategy_participates() {
        struct Rome;
        impl OverheadModel for Rome {
            fn name(&self) -> &str {
                "rome"
            }
            fn estimate(&self, _scale: Scale) -> OverheadEstimate {
                OverheadEstimate {
                    flops_overhead_pct: 0.0,
                    memory_overhead_pct: 0.0,
                    task_regression_pp: 0.3,
                }
            }
        }
        let mut q = quantifier();
        q.register(Arc::new(Rome)).unwrap();
        let set = q.pareto(Scale::B1_3, Metric::Flops).unwrap();
        assert_eq!(set.method_names(), vec!["rome"]);
        let fits = q.fit_all(Metric::Flops);
        let rome = fits.iter().find(|(m, _)| m == "rome").unwrap();
        assert_eq!(rome.1.as_ref().unwrap().kind, FitKind::ZeroBypass);
    }

    #[test]
    fn test_full_report() {
        let mut q = quantifier();
        q.benchmark(None, None).unwrap();
        let report = q.full_report(Metric::Flops, Scale::B1_3).unwrap();
        assert_eq!(report.results.len(), 24);
        assert_eq!(report.fits.len(), Method::ALL.len());
        assert!(report.pareto.is_some());
    }

    #[test]
    fn test_pareto_reports_unknown_methods() {
        let mut config = AppConfig::default();
        config.benchmark.methods = vec!["rlhf".into(), "ppo".into(), "filtering".into()];
        let q = AlignmentTaxQuantifier::new(&config);
        let set = q.pareto(Scale::B1_3, Metric::Flops).unwrap();
        assert_eq!(set.method_names(), vec!["filtering"]);
        assert_eq!(set.skipped().len(), 1);
        assert_eq!(set.skipped()[0].method, "ppo");
        assert!(set.skipped()[0].error.starts_with("Not found"));
    }

    #[test]
    fn test_full_report_lists_failed_fits() {
        let mut config = AppConfig::default();
        config.benchmark.methods = vec!["dpo".into(), "ppo".into()];
        let q = AlignmentTaxQuantifier::new(&config);
        let report = q.full_report(Metric::Flops, Scale::B1_3).unwrap();
        assert_eq!(report.fits.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].method, "ppo");
        let pareto = report.pareto.unwrap();
        assert_eq!(pareto.frontier.skipped()[0].method, "ppo");
    }

    #[test]
    fn test_baseline_score_validation() {
        let mut q = quantifier();
        assert!(q.set_task_score_baseline(1.2).is_err());
        q.set_task_score_baseline(0.9).unwrap();
        assert_eq!(q.config().task_score_baseline, 0.9);
    }
}
