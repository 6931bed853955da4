use thiserror::Error;

/// Tilt engine error types
#[derive(Error, Debug)]
pub enum TiltError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Session already ended")]
    SessionEnded,

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Malformed trace: {0}")]
    Trace(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for fallible tilt engine operations
pub type TiltResult<T> = Result<T, TiltError>;

impl TiltError {
    /// True for errors caused by caller-supplied data rather than the environment
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            TiltError::InvalidConfig(_) | TiltError::Trace(_) | TiltError::Json(_)
        )
    }
}
