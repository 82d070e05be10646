//! Benchmark results, serializable reports and human-readable tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use uuid::Uuid;

use crate::error::{MethodFailure, Result};
use crate::pareto::ParetoSet;
use crate::sampler::OverheadRecord;
use crate::scale::Scale;
use crate::scaling::{FitCurve, FitKind, Metric, Prediction};
use crate::table::OverheadTable;

/// Result of benchmarking one method at one scale against the unmodified baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub method: String,
    /// Compact model label, e.g. `1.3B`.
    pub model: String,
    pub params: Scale,
    pub baseline_flops: f64,
    pub aligned_flops: f64,
    pub flops_overhead_pct: f64,
    pub baseline_time_s: f64,
    pub aligned_time_s: f64,
    pub time_overhead_pct: f64,
    pub baseline_task_score: f64,
    pub aligned_task_score: f64,
    pub task_regression_pp: f64,
    pub memory_baseline_mb: f64,
    pub memory_aligned_mb: f64,
    pub memory_overhead_pct: f64,
}

impl BenchmarkResult {
    /// One-line summary: `[rlhf on 1.3B] FLOPs: +40.0% | Time: +40.0% | Task: -2.00pp`.
    pub fn summary(&self) -> String {
        format!(
            "[{} on {}] FLOPs: +{:.1}% | Time: +{:.1}% | Task: -{:.2}pp",
            self.method,
            self.model,
            self.flops_overhead_pct,
            self.time_overhead_pct,
            self.task_regression_pp
        )
    }

    /// The three-metric view consumed by the fitter and the Pareto selector.
    pub fn record(&self) -> OverheadRecord {
        OverheadRecord {
            method: self.method.clone(),
            scale: self.params,
            flops_overhead_pct: self.flops_overhead_pct,
            memory_overhead_pct: self.memory_overhead_pct,
            task_regression_pp: self.task_regression_pp,
        }
    }
}

/// A fitted scaling curve for one method and metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitSummary {
    pub method: String,
    pub metric: Metric,
    pub curve: FitCurve,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub predictions: Vec<Prediction>,
}

/// Pareto frontier at one scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParetoSummary {
    pub scale: Scale,
    pub axis: Metric,
    pub frontier: ParetoSet,
}

/// Machine-readable report of a benchmark run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub results: Vec<BenchmarkResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fits: Vec<FitSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pareto: Option<ParetoSummary>,
    /// Methods whose fit could not be computed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<MethodFailure>,
}

impl Report {
    pub fn new(results: Vec<BenchmarkResult>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            results,
            fits: Vec::new(),
            pareto: None,
            skipped: Vec::new(),
        }
    }

    /// Results keyed by method, then by scale.
    pub fn by_method(&self) -> BTreeMap<&str, BTreeMap<Scale, &BenchmarkResult>> {
        let mut grouped: BTreeMap<&str, BTreeMap<Scale, &BenchmarkResult>> = BTreeMap::new();
        for r in &self.results {
            grouped
                .entry(r.method.as_str())
                .or_default()
                .insert(r.params, r);
        }
        grouped
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        tracing::info!(path = %path.display(), results = self.results.len(), "Wrote JSON report");
        Ok(())
    }
}

/// Comparison table grouped by method, rows ordered by model size.
pub fn comparative_table(results: &[BenchmarkResult], precision: usize) -> String {
    if results.is_empty() {
        return "No benchmarks run yet.".to_string();
    }

    let mut by_method: BTreeMap<&str, Vec<&BenchmarkResult>> = BTreeMap::new();
    for r in results {
        by_method.entry(r.method.as_str()).or_default().push(r);
    }

    let mut out = String::new();
    let _ = writeln!(out, "Alignment Tax Comparison");
    let _ = write!(out, "{}", "=".repeat(60));
    for (method, mut runs) in by_method {
        runs.sort_by_key(|r| r.params);
        let _ = writeln!(out, "\n\n{}", method.to_uppercase());
        let _ = write!(out, "{}", "-".repeat(40));
        for r in runs {
            let _ = write!(
                out,
                "\n  {:>6}: FLOPs +{:>5.p$}% | Memory +{:>5.p$}% | Task -{:>4.2}pp",
                r.model,
                r.flops_overhead_pct,
                r.memory_overhead_pct,
                r.task_regression_pp,
                p = precision
            );
        }
    }
    out
}

/// Describe a fitted curve and any predictions made from it.
pub fn render_fit(summary: &FitSummary) -> String {
    let mut out = String::new();
    let unit = summary.metric.unit();
    match summary.curve.kind {
        FitKind::PowerLaw => {
            let _ = writeln!(
                out,
                "{} {}: overhead = {:.4} * N^{:.4}  (R² = {:.3}, {} points, {}-{})",
                summary.method,
                summary.metric,
                summary.curve.a,
                summary.curve.b,
                summary.curve.r_squared,
                summary.curve.points,
                Scale::new(summary.curve.min_scale as u64)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| summary.curve.min_scale.to_string()),
                Scale::new(summary.curve.max_scale as u64)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| summary.curve.max_scale.to_string()),
            );
        }
        FitKind::ZeroBypass => {
            let _ = writeln!(
                out,
                "{} {}: non-positive overhead, constant zero curve",
                summary.method, summary.metric
            );
        }
    }
    for p in &summary.predictions {
        let label = Scale::new(p.scale as u64)
            .map(|s| s.to_string())
            .unwrap_or_else(|_| p.scale.to_string());
        let flag = if p.is_extrapolated() {
            "  (extrapolated)"
        } else {
            ""
        };
        let _ = writeln!(out, "  {:>6}: {:.2}{}{}", label, p.value, unit, flag);
    }
    out.trim_end().to_string()
}

/// List the frontier at one scale, baseline first.
pub fn render_pareto(summary: &ParetoSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Pareto frontier at {} ({} overhead vs task regression)",
        summary.scale, summary.axis
    );
    let _ = writeln!(out, "  {:<22} {:>10} {:>10}", "baseline (origin)", "0.0%", "0.00pp");
    for c in summary.frontier.members() {
        let _ = writeln!(
            out,
            "  {:<22} {:>9.1}% {:>8.2}pp",
            c.method, c.overhead, c.regression
        );
    }
    if !summary.frontier.dominated().is_empty() {
        let _ = writeln!(out, "  dominated: {}", summary.frontier.dominated().join(", "));
    }
    for failure in summary.frontier.skipped() {
        let _ = writeln!(out, "  skipped {}: {}", failure.method, failure.error);
    }
    out.trim_end().to_string()
}

/// List the overhead table.
pub fn render_table(table: &OverheadTable) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<22} {:>8} {:>8} {:>8}  source",
        "method", "flops%", "mem%", "task pp"
    );
    for (name, entry) in table.iter() {
        let mut source = entry.source.clone().unwrap_or_default();
        if entry.scale_sensitivity.is_some() {
            source.push_str(" [scale-sensitive]");
        }
        let _ = writeln!(
            out,
            "{:<22} {:>8.1} {:>8.1} {:>8.2}  {}",
            name,
            entry.flops_overhead_pct,
            entry.memory_overhead_pct,
            entry.task_regression_pp,
            source.trim()
        );
    }
    out.trim_end().to_string()
}
