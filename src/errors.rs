// src/errors.rs

//! Crate-wide error types and aliases.

use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildPlanError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    PropertyAccess(#[from] PropertyAccessError),

    #[error(transparent)]
    WorkSet(#[from] WorkSetError),

    #[error("{count} validation problem(s) reported while walking task '{task}'")]
    Validation { task: String, count: usize },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure to realize a single property value.
///
/// Memoized together with the value, so it must be cheap to clone: every
/// caller of the same lazy value receives the same failure.
#[derive(Error, Debug, Clone)]
pub enum PropertyAccessError {
    /// The accessor ran and raised this cause.
    #[error("{0:#}")]
    Raised(Arc<anyhow::Error>),

    /// The accessor could not be invoked at all.
    #[error("Could not call {declaring_type}.{accessor}() on {receiver}")]
    Call {
        declaring_type: String,
        accessor: String,
        receiver: String,
        #[source]
        reason: Arc<AccessorError>,
    },

    /// The realized value does not have the capability its declared type promises.
    #[error("property '{property}' is declared {expected} but realized a different kind of value")]
    UnexpectedValue {
        property: String,
        expected: &'static str,
    },
}

impl PropertyAccessError {
    /// The original cause raised by the accessor, if any.
    pub fn raised_cause(&self) -> Option<&anyhow::Error> {
        match self {
            PropertyAccessError::Raised(cause) => Some(cause.as_ref()),
            _ => None,
        }
    }
}

/// What a [`Bean`](crate::property::Bean) reports when reading a property.
#[derive(Error, Debug)]
pub enum AccessorError {
    /// The accessor itself failed.
    #[error(transparent)]
    Raised(anyhow::Error),

    /// The accessor could not be invoked (unknown name, wrong receiver, ...).
    #[error("{0}")]
    Invocation(String),
}

/// Misuse of an [`OrderedWorkSet`](crate::dag::OrderedWorkSet).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkSetError {
    #[error("ordered work set is empty")]
    Empty,

    #[error("element is not a member of the ordered work set; no order stamp to navigate from")]
    NotPresent,

    #[error("ordered work set does not support {0}")]
    Unsupported(&'static str),

    #[error("range lower bound orders after its upper bound")]
    InvalidRange,
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildPlanError>;
