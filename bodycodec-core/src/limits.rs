//! Message size limits.
//!
//! Limits bound how much memory a single materialized body or a single
//! stream frame may take. The default of 4 MB matches gRPC's receive limit.

use crate::error::BodyError;

/// Default maximum message size (4 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// Configuration for message size limits.
///
/// # Example
///
/// ```rust
/// use bodycodec_core::MessageLimits;
///
/// // Default 4 MB limit
/// let limits = MessageLimits::default();
///
/// // Custom 16 MB limit for large payloads
/// let limits = MessageLimits::new(16 * 1024 * 1024);
///
/// // No limit
/// let limits = MessageLimits::unlimited();
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageLimits {
    /// `None` means unlimited.
    max_message_size: Option<usize>,
}

impl Default for MessageLimits {
    fn default() -> Self {
        Self {
            max_message_size: Some(DEFAULT_MAX_MESSAGE_SIZE),
        }
    }
}

impl MessageLimits {
    /// Create limits with the specified maximum message size in bytes.
    pub fn new(max_message_size: usize) -> Self {
        Self {
            max_message_size: Some(max_message_size),
        }
    }

    /// Create limits with no maximum.
    ///
    /// Only use this when the body source is trusted.
    pub fn unlimited() -> Self {
        Self {
            max_message_size: None,
        }
    }

    /// Returns the maximum message size, or `None` if unlimited.
    pub fn max_message_size(&self) -> Option<usize> {
        self.max_message_size
    }

    /// Check a size against the configured limit.
    pub fn check_size(&self, size: usize) -> Result<(), BodyError> {
        match self.max_message_size {
            Some(limit) if size > limit => Err(BodyError::LengthLimitExceeded { size, limit }),
            _ => Ok(()),
        }
    }
}
