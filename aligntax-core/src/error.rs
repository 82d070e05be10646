//! Error types for the aligntax-core crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for alignment tax computations.
#[derive(Debug, Error)]
pub enum TaxError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Numeric error: {0}")]
    Numeric(String),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Overhead table parse error: {0}")]
    TableParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl TaxError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn numeric(msg: impl Into<String>) -> Self {
        Self::Numeric(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, TaxError>;

/// A method left out of a batch computation, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodFailure {
    pub method: String,
    pub error: String,
}

impl MethodFailure {
    pub fn new(method: impl Into<String>, error: &TaxError) -> Self {
        Self {
            method: method.into(),
            error: error.to_string(),
        }
    }
}
