//! Cache pipeline error types.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Errors raised inside the cache pipeline.
///
/// None of these reach UI code: the cache facade degrades every failure to the
/// best URI it can still serve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum CacheError {
    #[error("fetch failed: {message}")]
    FetchFailed { message: String },

    #[error("transform failed: {message}")]
    TransformFailed { message: String },

    #[error("cache index corrupt: {message}")]
    IndexCorrupt { message: String },

    #[error("filesystem operation failed: {message}")]
    FsFailed { message: String },
}

impl CacheError {
    /// Creates fetch failed error.
    #[must_use]
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::FetchFailed {
            message: message.into(),
        }
    }

    /// Creates transform failed error.
    #[must_use]
    pub fn transform(message: impl Into<String>) -> Self {
        Self::TransformFailed {
            message: message.into(),
        }
    }

    /// Creates index corrupt error.
    #[must_use]
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::IndexCorrupt {
            message: message.into(),
        }
    }

    /// Creates filesystem failed error.
    #[must_use]
    pub fn fs(message: impl Into<String>) -> Self {
        Self::FsFailed {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = CacheError::fetch("HTTP 404 Not Found");
        assert_eq!(err.to_string(), "fetch failed: HTTP 404 Not Found");

        let err = CacheError::corrupt("expected value at line 1 column 1");
        assert!(err.to_string().starts_with("cache index corrupt"));
    }
}
