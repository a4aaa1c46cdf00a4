//! rrwriter/types.rs

use std::io;

use thiserror::Error;

/// One destination that failed to close.
#[derive(Debug, Error)]
#[error("{path}: {source}")]
pub struct DestinationError {
    pub index: usize,
    pub path: String,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, Error)]
pub enum RoundRobinError {
    #[error("round-robin writer needs at least one destination")]
    NoDestinations,

    #[error("new writer {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Every destination that failed to close, in index order.
    #[error("close {} destination(s): {}", .0.len(), join_errors(.0))]
    Close(Vec<DestinationError>),

    #[error("close callback {path}: {source}")]
    Callback {
        path: String,
        #[source]
        source: anyhow::Error,
    },
}

fn join_errors(errors: &[DestinationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
