//! Pareto frontier of alignment methods over (overhead, task regression).
//!
//! Both axes are costs: lower overhead and lower regression are better. A method is on the
//! frontier when no other method is at least as good on both axes and strictly better on
//! one. The unmodified baseline sits at the origin and is treated as an implicit member, so
//! it is never compared against the interventions.

use serde::{Deserialize, Serialize};

use crate::error::{MethodFailure, Result, TaxError};
use crate::method::{Method, canonical_key};
use crate::sampler::OverheadRecord;
use crate::scale::Scale;
use crate::scaling::Metric;

/// A method's position on the two axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub method: String,
    /// Overhead on the chosen cost axis (FLOPs or memory), percent.
    pub overhead: f64,
    /// Task regression as a non-negative loss, percentage points.
    pub regression: f64,
}

impl Candidate {
    pub fn new(method: impl Into<String>, overhead: f64, regression: f64) -> Self {
        Self {
            method: method.into(),
            overhead,
            regression,
        }
    }

    /// True if `self` is no worse on both axes and strictly better on at least one.
    pub fn dominates(&self, other: &Candidate) -> bool {
        self.overhead <= other.overhead
            && self.regression <= other.regression
            && (self.overhead < other.overhead || self.regression < other.regression)
    }

    fn is_baseline(&self) -> bool {
        canonical_key(&self.method) == Method::Baseline.key()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoPoint {
    pub candidate: Candidate,
    pub dominated: bool,
}

/// Non-dominated methods, ordered by overhead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParetoSet {
    members: Vec<Candidate>,
    /// Methods removed because another method dominates them.
    dominated: Vec<String>,
    /// Methods that could not be placed at all (e.g. unknown or failed to sample).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    skipped: Vec<MethodFailure>,
}

impl ParetoSet {
    pub fn members(&self) -> &[Candidate] {
        &self.members
    }

    pub fn dominated(&self) -> &[String] {
        &self.dominated
    }

    pub fn skipped(&self) -> &[MethodFailure] {
        &self.skipped
    }

    /// Attach the methods that were left out before selection.
    pub fn with_skipped(mut self, skipped: Vec<MethodFailure>) -> Self {
        self.skipped = skipped;
        self
    }

    pub fn method_names(&self) -> Vec<&str> {
        self.members.iter().map(|c| c.method.as_str()).collect()
    }

    pub fn contains(&self, method: &str) -> bool {
        let key = canonical_key(method);
        key == Method::Baseline.key() || self.members.iter().any(|c| canonical_key(&c.method) == key)
    }

    /// The baseline is always Pareto-optimal: zero overhead, zero regression.
    pub fn baseline_is_member(&self) -> bool {
        true
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn into_members(self) -> Vec<Candidate> {
        self.members
    }
}

fn validate(candidates: &[Candidate]) -> Result<()> {
    for c in candidates {
        if !c.overhead.is_finite() || !c.regression.is_finite() {
            return Err(TaxError::validation(format!(
                "method '{}' has a non-finite position ({}, {})",
                c.method, c.overhead, c.regression
            )));
        }
    }
    Ok(())
}

/// Flag every candidate as dominated or not. Pairwise O(n²); method counts are small.
pub fn classify(candidates: &[Candidate]) -> Result<Vec<ParetoPoint>> {
    validate(candidates)?;
    let points = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let dominated = candidates
                .iter()
                .enumerate()
                .any(|(j, other)| i != j && other.dominates(c));
            ParetoPoint {
                candidate: c.clone(),
                dominated,
            }
        })
        .collect();
    Ok(points)
}

/// Compute the Pareto frontier. Baseline entries are dropped before comparison; empty input
/// yields an empty set. Identical positions are all kept.
pub fn select(candidates: &[Candidate]) -> Result<ParetoSet> {
    let interventions: Vec<Candidate> = candidates
        .iter()
        .filter(|c| !c.is_baseline())
        .cloned()
        .collect();

    let mut members = Vec::new();
    let mut dominated = Vec::new();
    for point in classify(&interventions)? {
        if point.dominated {
            dominated.push(point.candidate.method);
        } else {
            members.push(point.candidate);
        }
    }

    members.sort_by(|a, b| {
        a.overhead
            .total_cmp(&b.overhead)
            .then_with(|| a.regression.total_cmp(&b.regression))
            .then_with(|| a.method.cmp(&b.method))
    });
    dominated.sort();

    tracing::debug!(
        candidates = interventions.len(),
        frontier = members.len(),
        "Computed Pareto frontier"
    );
    Ok(ParetoSet {
        members,
        dominated,
        skipped: Vec::new(),
    })
}

/// Build candidates for one scale from sampled records, using FLOPs or memory as the cost axis.
pub fn candidates_from_records(
    records: &[OverheadRecord],
    scale: Scale,
    axis: Metric,
) -> Result<Vec<Candidate>> {
    if axis == Metric::TaskRegression {
        return Err(TaxError::validation(
            "Pareto overhead axis must be flops or memory",
        ));
    }
    let mut candidates: Vec<Candidate> = records
        .iter()
        .filter(|r| r.scale == scale)
        .map(|r| Candidate::new(r.method.clone(), r.metric(axis), r.task_regression_pp))
        .collect();
    candidates.sort_by(|a, b| a.method.cmp(&b.method));
    if let Some(pair) = candidates.windows(2).find(|w| w[0].method == w[1].method) {
        return Err(TaxError::validation(format!(
            "method '{}' has more than one record at scale {}",
            pair[0].method, scale
        )));
    }
    Ok(candidates)
}
