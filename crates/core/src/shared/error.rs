use thiserror::Error;

use crate::detection::infrastructure::model_resolver::ModelResolveError;

/// Errors that abort a tracking run.
///
/// Each variant is reported once, as the sole result of the run. A decode
/// failure on an individual frame is not represented here: it ends the frame
/// stream and finalization proceeds.
#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("Could not open video")]
    SourceUnavailable,
    #[error("{0}")]
    Processing(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Model(#[from] ModelResolveError),
}
