//! Error types for session, image and persistence operations.

use thiserror::Error;

/// Broad classes of failure, deciding how an error reaches the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad user input; shown once, state left unchanged.
    InvalidInput,
    /// Image bytes could not be decoded; shown once, state left unchanged.
    DecodeFailure,
    /// The key-value store could not be read or written; silently ignored.
    PersistenceUnavailable,
    /// A superseded asynchronous operation finished late; discarded.
    StaleAsyncCompletion,
    /// Rendering or saving an export failed; shown once.
    ExportFailure,
}

/// Errors produced by the measurement engine and its collaborators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeasureError {
    /// Reference length is zero, negative or not a number
    #[error("Reference length must be a positive number")]
    InvalidReferenceLength,

    /// The drawn line is shorter than the minimum length
    #[error("Line is too short, drag a longer line")]
    LineTooShort,

    /// A measurement was attempted before a scale exists
    #[error("Calibrate first: draw a line of known length in Calibrate mode")]
    NotCalibrated,

    /// An operation needs a loaded image
    #[error("Load a floor plan image first")]
    NoImage,

    /// Payload is not a recognized image format
    #[error("File is not a supported image")]
    NotAnImage,

    /// Image bytes were recognized but could not be decoded
    #[error("Could not decode image: {0}")]
    Decode(String),

    /// Storage read or write failed
    #[error("Session storage unavailable: {0}")]
    Persistence(String),

    /// An image load finished after a newer one was started
    #[error("Stale image load {generation} (current load is {current})")]
    Stale {
        /// Generation of the completed load
        generation: u64,
        /// Generation currently expected
        current: u64,
    },

    /// Export rendering or saving failed
    #[error("Export failed: {0}")]
    Export(String),
}

impl MeasureError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MeasureError::InvalidReferenceLength
            | MeasureError::LineTooShort
            | MeasureError::NotCalibrated
            | MeasureError::NoImage
            | MeasureError::NotAnImage => ErrorKind::InvalidInput,
            MeasureError::Decode(_) => ErrorKind::DecodeFailure,
            MeasureError::Persistence(_) => ErrorKind::PersistenceUnavailable,
            MeasureError::Stale { .. } => ErrorKind::StaleAsyncCompletion,
            MeasureError::Export(_) => ErrorKind::ExportFailure,
        }
    }

    /// Whether the error should be surfaced in a message box.
    pub fn is_user_visible(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::PersistenceUnavailable | ErrorKind::StaleAsyncCompletion
        )
    }
}

/// Result type alias for engine operations
pub type MeasureResult<T> = Result<T, MeasureError>;

impl From<serde_json::Error> for MeasureError {
    fn from(err: serde_json::Error) -> Self {
        MeasureError::Persistence(err.to_string())
    }
}

impl From<image::ImageError> for MeasureError {
    fn from(err: image::ImageError) -> Self {
        MeasureError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_visible() {
        assert_eq!(MeasureError::NotCalibrated.kind(), ErrorKind::InvalidInput);
        assert!(MeasureError::NotCalibrated.is_user_visible());
        assert!(MeasureError::Decode("bad".into()).is_user_visible());
    }

    #[test]
    fn background_errors_are_silent() {
        assert!(!MeasureError::Persistence("locked".into()).is_user_visible());
        let stale = MeasureError::Stale { generation: 1, current: 2 };
        assert_eq!(stale.kind(), ErrorKind::StaleAsyncCompletion);
        assert!(!stale.is_user_visible());
    }
}
