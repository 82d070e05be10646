//! Scaling-law fitter for alignment overhead.
//!
//! Fits `overhead(N) = a * N^b` by ordinary least squares in log-log space, where `N` is the
//! parameter count, and extrapolates the curve to unseen scales. Metrics containing a
//! non-positive value cannot be log-transformed and get a constant zero curve instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TaxError};
use crate::sampler::OverheadRecord;

/// Below this, the log-scale variance is treated as zero (all scales identical).
const MIN_LOG_VARIANCE: f64 = 1e-12;

/// One of the three reported overhead metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Flops,
    Memory,
    TaskRegression,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Flops, Metric::Memory, Metric::TaskRegression];

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Flops | Metric::Memory => "%",
            Metric::TaskRegression => "pp",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Flops => "flops",
            Metric::Memory => "memory",
            Metric::TaskRegression => "task_regression",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Metric {
    type Err = TaxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "flops" | "compute" => Ok(Metric::Flops),
            "memory" | "mem" => Ok(Metric::Memory),
            "task_regression" | "regression" | "task" => Ok(Metric::TaskRegression),
            _ => Err(TaxError::not_found(format!(
                "unknown metric '{}' (expected flops, memory or task_regression)",
                s
            ))),
        }
    }
}

/// How a [`FitCurve`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitKind {
    /// Least-squares power law in log-log space.
    PowerLaw,
    /// Some observed value was ≤ 0; the curve is identically zero.
    ZeroBypass,
}

/// Fitted `a * scale^b` curve and the domain it was fitted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitCurve {
    pub a: f64,
    pub b: f64,
    /// Coefficient of determination in linear space; 0 when the observations have no variance.
    pub r_squared: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    pub points: usize,
    pub kind: FitKind,
}

/// Where a prediction falls relative to the fitted domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitRange {
    Within,
    Below,
    Above,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub scale: f64,
    pub value: f64,
    pub range: FitRange,
}

impl Prediction {
    /// True when the scale lies outside the range the curve was fitted on.
    pub fn is_extrapolated(&self) -> bool {
        self.range != FitRange::Within
    }
}

impl FitCurve {
    pub fn evaluate(&self, scale: f64) -> f64 {
        match self.kind {
            FitKind::ZeroBypass => 0.0,
            FitKind::PowerLaw => self.a * scale.powf(self.b),
        }
    }

    /// Evaluate the curve at `scale`, flagging extrapolation beyond the fitted domain.
    pub fn predict(&self, scale: f64) -> Result<Prediction> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(TaxError::validation(format!(
                "prediction scale must be positive, got {}",
                scale
            )));
        }
        let range = if scale < self.min_scale {
            FitRange::Below
        } else if scale > self.max_scale {
            FitRange::Above
        } else {
            FitRange::Within
        };
        if range != FitRange::Within {
            tracing::debug!(
                scale,
                min = self.min_scale,
                max = self.max_scale,
                "Extrapolating beyond fitted domain"
            );
        }
        Ok(Prediction {
            scale,
            value: self.evaluate(scale),
            range,
        })
    }
}

/// Fit `overhead = a * scale^b` to `(scale, overhead)` pairs.
///
/// Needs at least two points. When every scale is identical the slope is undefined and
/// `b = 0`, `a = geometric mean of the overheads` is returned.
pub fn fit_power_law(points: &[(f64, f64)]) -> Result<FitCurve> {
    if points.len() < 2 {
        return Err(TaxError::numeric(format!(
            "power-law fit needs at least 2 points, got {}",
            points.len()
        )));
    }
    for &(scale, overhead) in points {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(TaxError::validation(format!(
                "fit scales must be positive, got {}",
                scale
            )));
        }
        if !overhead.is_finite() {
            return Err(TaxError::validation(format!(
                "fit overheads must be finite, got {}",
                overhead
            )));
        }
    }

    let min_scale = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let max_scale = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);

    if points.iter().any(|&(_, overhead)| overhead <= 0.0) {
        if points.iter().any(|&(_, overhead)| overhead > 0.0) {
            tracing::warn!(
                points = points.len(),
                "Mixed positive and non-positive overheads; reporting a zero curve"
            );
        }
        return Ok(FitCurve {
            a: 0.0,
            b: 0.0,
            r_squared: 0.0,
            min_scale,
            max_scale,
            points: points.len(),
            kind: FitKind::ZeroBypass,
        });
    }

    let n = points.len() as f64;
    let xs: Vec<f64> = points.iter().map(|p| p.0.ln()).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.1.ln()).collect();
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = ys.iter().sum::<f64>() / n;

    let sxx: f64 = xs.iter().map(|x| (x - x_mean).powi(2)).sum();
    let sxy: f64 = xs
        .iter()
        .zip(&ys)
        .map(|(x, y)| (x - x_mean) * (y - y_mean))
        .sum();

    let b = if sxx < MIN_LOG_VARIANCE { 0.0 } else { sxy / sxx };
    let a = (y_mean - b * x_mean).exp();
    if !a.is_finite() || !b.is_finite() {
        return Err(TaxError::numeric("power-law fit produced non-finite parameters"));
    }

    let overhead_mean = points.iter().map(|p| p.1).sum::<f64>() / n;
    let ss_tot: f64 = points.iter().map(|p| (p.1 - overhead_mean).powi(2)).sum();
    let ss_res: f64 = points
        .iter()
        .map(|&(scale, overhead)| (overhead - a * scale.powf(b)).powi(2))
        .sum();
    let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    Ok(FitCurve {
        a,
        b,
        r_squared,
        min_scale,
        max_scale,
        points: points.len(),
        kind: FitKind::PowerLaw,
    })
}

/// Fit one metric across a single method's records.
pub fn fit_records(records: &[OverheadRecord], metric: Metric) -> Result<FitCurve> {
    if let Some(first) = records.first() {
        if let Some(other) = records.iter().find(|r| r.method != first.method) {
            return Err(TaxError::validation(format!(
                "cannot fit records from different methods ('{}' and '{}')",
                first.method, other.method
            )));
        }
    }
    let points: Vec<(f64, f64)> = records
        .iter()
        .map(|r| (r.scale.as_f64(), r.metric(metric)))
        .collect();
    fit_power_law(&points)
}
