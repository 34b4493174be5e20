//! Common result and error types for the Skein workspace.

/// The result type for operations whose only failure mode is a defect.
///
/// `Err` indicates an unrecoverable internal error (a bug in Skein), not a
/// user-facing configuration problem. Configuration problems have their own
/// error enums in the crates that detect them.
pub type SkeinResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in Skein, not a user input problem.
///
/// Hashing an already validated, acyclic graph can only fail this way.
#[derive(Debug, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
