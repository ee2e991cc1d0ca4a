//! Error handling for the affect feature pipeline
//!
//! A single error type shared by every crate in the workspace. Channel blocks
//! absorb empty input locally; everything else surfaces to the window-level
//! caller through `AffectResult`.

use core::fmt;

/// Result type alias for pipeline operations
pub type AffectResult<T> = Result<T, AffectError>;

/// Error type for all pipeline operations
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum AffectError {
    /// A zero-length signal reached an operation that needs data
    EmptyInput {
        /// Name of the operation that received the empty signal
        operation: &'static str,
    },

    /// The Tarvainen smoothing matrix could not be inverted
    DetrendFailure {
        /// Signal length the filter was built for
        length: usize,
        /// What went wrong
        reason: String,
    },

    /// Strict slice request outside of a buffer
    IndexRange {
        /// Requested start index
        start: usize,
        /// Requested end index (exclusive)
        end: usize,
        /// Actual buffer length
        len: usize,
    },

    /// Invalid configuration value
    Configuration {
        /// Description of the configuration error
        message: String,
    },

    /// Signal data violating a structural invariant
    InvalidSignalData {
        /// Description of the data issue
        reason: String,
    },

    /// Synthetic data generation failure
    Simulation {
        /// Description of the simulation failure
        message: String,
    },
}

impl AffectError {
    /// Shorthand for a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        AffectError::Configuration {
            message: message.into(),
        }
    }

    /// True for failures a batch driver may skip over
    pub fn is_window_local(&self) -> bool {
        matches!(
            self,
            AffectError::EmptyInput { .. } | AffectError::DetrendFailure { .. }
        )
    }
}

impl fmt::Display for AffectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AffectError::EmptyInput { operation } => {
                write!(f, "Empty input passed to {}", operation)
            }
            AffectError::DetrendFailure { length, reason } => {
                write!(f, "Detrending failed for {} samples: {}", length, reason)
            }
            AffectError::IndexRange { start, end, len } => {
                write!(f, "Index range [{}, {}) out of bounds for length {}",
                       start, end, len)
            }
            AffectError::Configuration { message } => {
                write!(f, "Configuration error: {}", message)
            }
            AffectError::InvalidSignalData { reason } => {
                write!(f, "Invalid signal data: {}", reason)
            }
            AffectError::Simulation { message } => {
                write!(f, "Simulation error: {}", message)
            }
        }
    }
}

impl std::error::Error for AffectError {}

/// Convenience macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)+) => {
        $crate::error::AffectError::Configuration {
            message: format!($($arg)+),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AffectError::IndexRange {
            start: 96,
            end: 192,
            len: 120,
        };
        let display = format!("{}", error);
        assert!(display.contains("96"));
        assert!(display.contains("192"));
        assert!(display.contains("120"));
    }

    #[test]
    fn test_error_equality() {
        let error1 = AffectError::EmptyInput { operation: "mean" };
        let error2 = AffectError::EmptyInput { operation: "mean" };
        assert_eq!(error1, error2);
    }

    #[test]
    fn test_config_error_macro() {
        let error = config_error!("window size must be positive, got {}", 0);
        assert_eq!(
            error,
            AffectError::Configuration {
                message: "window size must be positive, got 0".to_string()
            }
        );
    }

    #[test]
    fn test_window_local_classification() {
        let detrend = AffectError::DetrendFailure {
            length: 2,
            reason: "too short".to_string(),
        };
        assert!(detrend.is_window_local());
        assert!(!AffectError::config("bad rate").is_window_local());
    }
}
