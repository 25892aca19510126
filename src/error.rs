//! Errors that cross the boundary of the graph core
//!
//! Numeric edge cases (coincident points, dangling edges, unparseable years) are
//! handled where they occur and never show up here.

use thiserror::Error;

use crate::store::StoreError;

/// Errors returned to callers of the model loading functions
#[derive(Error, Debug)]
pub enum GraphError {
    /// The external store could not be read; not retried internally
    #[error("graph data unavailable: {0}")]
    DataUnavailable(#[from] StoreError),

    /// A taxonomy file could not be read or parsed
    #[error("taxonomy error: {0}")]
    Taxonomy(String),
}

/// Result type for model loading
pub type GraphResult<T> = Result<T, GraphError>;
