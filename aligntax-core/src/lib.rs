//! # aligntax-core — alignment tax benchmarking
//!
//! Tabulates the compute, memory and task-performance overhead ("alignment tax") of AI
//! safety interventions relative to an unmodified baseline, across model scales.
//!
//! Data flows overhead table → [`sampler`] → [`scaling`] (optional extrapolation) →
//! [`pareto`] → [`report`]. Everything is synchronous and deterministic.

pub mod config;
pub mod error;
pub mod method;
pub mod pareto;
pub mod quantifier;
pub mod report;
pub mod sampler;
pub mod scale;
pub mod scaling;
pub mod table;

// Re-exports
pub use config::{AppConfig, BenchmarkConfig, OutputFormat, ReportConfig, load_config};
pub use error::{MethodFailure, Result, TaxError};
pub use method::{Method, MethodRegistry, OverheadEstimate, OverheadModel, TableModel};
pub use pareto::{Candidate, ParetoSet};
pub use quantifier::AlignmentTaxQuantifier;
pub use report::{BenchmarkResult, Report};
pub use sampler::{OverheadRecord, ScaleSampler};
pub use scale::Scale;
pub use scaling::{FitCurve, FitKind, FitRange, Metric, Prediction, fit_power_law};
pub use table::{OverheadEntry, OverheadTable, ScaleSensitivity};
