//! Error types for the portfolio risk pipeline

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pipeline stage, used to tag errors that abort a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Fetch,
    Returns,
    Statistics,
    Simulation,
    Report,
    Optimization,
    Attribution,
    Recommendation,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Fetch => "data fetch",
            PipelineStage::Returns => "return series",
            PipelineStage::Statistics => "statistics",
            PipelineStage::Simulation => "monte carlo simulation",
            PipelineStage::Report => "risk report",
            PipelineStage::Optimization => "optimization",
            PipelineStage::Attribution => "risk attribution",
            PipelineStage::Recommendation => "recommendation",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while building or running the pipeline
#[derive(Error, Debug)]
pub enum PortfolioError {
    /// A single asset could not be fetched; recovered by skipping the asset
    #[error("No data for {asset}: {reason}")]
    DataUnavailable { asset: String, reason: String },

    #[error("No valid asset data fetched")]
    NoDataFetched,

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid price {price} on {date}")]
    InvalidPrice { date: String, price: f64 },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Covariance matrix is not positive-definite: {0}")]
    SingularCovariance(String),

    #[error("Optimizer did not converge after {iterations} iterations")]
    OptimizerNonconvergence { iterations: usize },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{stage} failed: {source}")]
    StageFailed {
        stage: PipelineStage,
        #[source]
        source: Box<PortfolioError>,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PortfolioError {
    /// Wrap this error with the stage it escaped from
    pub fn at(self, stage: PipelineStage) -> Self {
        PortfolioError::StageFailed {
            stage,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, PortfolioError>;
