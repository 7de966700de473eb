use std::fmt;

use thiserror::Error;

/// Library error type for the rotation and publish pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// The configured media directory is missing or could not be walked.
    #[error("invalid media directory: {0}")]
    BadDir(String),

    /// The scan completed but found no eligible media.
    #[error("no eligible media files found in {0}")]
    CatalogEmpty(String),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The selected photo could not be decoded or re-encoded.
    #[error("image codec error: {0}")]
    Codec(#[from] image::ImageError),

    /// libheif rejected a HEIC source.
    #[cfg(feature = "heic")]
    #[error("heic decode error: {0}")]
    Heic(#[from] libheif_rs::HeifError),

    /// A blocking worker panicked or was cancelled.
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Steps of a single `/next` request, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Selecting,
    Extracting,
    Transforming,
    Responding,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Selecting => "selecting",
            Self::Extracting => "extracting",
            Self::Transforming => "transforming",
            Self::Responding => "responding",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unrecoverable failure that aborts one request.
#[derive(Debug, Error)]
#[error("request failed while {stage}: {source}")]
pub struct RequestError {
    pub stage: Stage,
    #[source]
    pub source: Error,
}

impl RequestError {
    pub fn new(stage: Stage, source: impl Into<Error>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}
