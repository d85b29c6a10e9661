use thiserror::Error;

pub type Result<T> = std::result::Result<T, PoseError>;

#[derive(Debug, Error)]
pub enum PoseError {
    /// Label source unreadable, or the model failed to load or allocate.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The backend failed while running, or returned an unexpected shape.
    #[error("inference error: {0}")]
    Inference(String),
    #[error("image error: {0}")]
    Image(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for PoseError {
    fn from(err: image::ImageError) -> Self {
        Self::Image(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failure_kind() {
        let err = PoseError::Configuration("labels.txt missing".to_string());
        assert_eq!(err.to_string(), "configuration error: labels.txt missing");

        let err = PoseError::InvalidArgument("got 16 keypoints".to_string());
        assert_eq!(err.to_string(), "invalid argument: got 16 keypoints");
    }

    #[test]
    fn io_errors_convert_transparently() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PoseError = io.into();
        assert!(matches!(err, PoseError::Io(_)));
        assert_eq!(err.to_string(), "gone");
    }
}
