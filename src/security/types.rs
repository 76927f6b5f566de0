//! Security error definitions.

use thiserror::Error;

/// Errors raised by [`SecurityGate`](crate::security::SecurityGate) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    /// Text sanitization was handed something other than a string.
    #[error("Input must be a string, got {0}")]
    NotText(&'static str),

    /// The randomness source failed.
    #[error("Randomness unavailable: {0}")]
    Randomness(String),
}

/// Result type for security operations.
pub type SecurityResult<T> = Result<T, SecurityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            SecurityError::NotText("array").to_string(),
            "Input must be a string, got array"
        );
    }
}
