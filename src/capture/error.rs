use std::path::PathBuf;
use thiserror::Error;

/// Every way a single acquisition can fail.
///
/// All variants are scoped to one `acquire()` call and are recoverable:
/// the caller shows the message and offers a retry.
/// The type is `Clone` so it can travel inside iced messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    /// The user dismissed the camera UI or the file dialog
    #[error("acquisition cancelled by the user")]
    Cancelled,

    /// The dialog returned something that is not a readable regular file
    #[error("no file selected: {0}")]
    NoSelection(String),

    /// The camera device or the selected file could not be opened
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Reading the selected file or the captured frame failed
    #[error("failed to read {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    /// The platform camera call was rejected (tool missing, hardware error)
    #[error("camera rejected the capture: {0}")]
    Platform(String),

    /// The bytes are not an image format we recognise
    #[error("unsupported image data: {0}")]
    UnsupportedFormat(String),

    /// The capture produced zero bytes
    #[error("captured image is empty")]
    EmptyImage,

    /// `acquire()` was called while another acquisition was still pending
    #[error("an acquisition is already in progress")]
    Busy,
}

impl AcquisitionError {
    /// True when the user backed out rather than something breaking
    pub fn is_cancellation(&self) -> bool {
        matches!(self, AcquisitionError::Cancelled)
    }

    /// Map an I/O failure on `path` to the matching variant
    pub fn from_io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                AcquisitionError::PermissionDenied(path.display().to_string())
            }
            std::io::ErrorKind::NotFound => {
                AcquisitionError::NoSelection(format!("{} does not exist", path.display()))
            }
            _ => AcquisitionError::Read {
                path,
                reason: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_errors_are_distinguishable() {
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        let missing = io::Error::new(io::ErrorKind::NotFound, "gone");
        let other = io::Error::new(io::ErrorKind::UnexpectedEof, "short read");

        assert!(matches!(
            AcquisitionError::from_io("/tmp/a.png", &denied),
            AcquisitionError::PermissionDenied(_)
        ));
        assert!(matches!(
            AcquisitionError::from_io("/tmp/a.png", &missing),
            AcquisitionError::NoSelection(_)
        ));
        assert!(matches!(
            AcquisitionError::from_io("/tmp/a.png", &other),
            AcquisitionError::Read { .. }
        ));
    }

    #[test]
    fn test_only_cancelled_is_cancellation() {
        assert!(AcquisitionError::Cancelled.is_cancellation());
        assert!(!AcquisitionError::EmptyImage.is_cancellation());
        assert!(!AcquisitionError::Platform("boom".into()).is_cancellation());
    }
}
