//! Error types for the Mage framework
//!
//! This module defines the unified error type used throughout the framework.
//! Every error carries a classification (`ErrorKind`): fatal errors indicate
//! a configuration or backend defect and abort at the outer loop, recoverable
//! errors are handled by the frame scheduler's resize branch.

use std::fmt;

/// Result type for Mage framework operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error classification driving the outer-loop recovery decision.
///
/// `Fatal` aborts: the condition indicates a build-time or configuration
/// defect (unsupported device, unsupported layout transition, shader or
/// descriptor mismatch). `Recoverable` is handled exclusively by the frame
/// scheduler's swapchain-rebuild branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No recovery is attempted; surfaced to the top-level caller
    Fatal,
    /// The swapchain must be rebuilt, then the frame loop resumes
    Recoverable,
}

/// Mage framework errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Configuration-time invariant violation (unsupported device/extension/
    /// queue combination, unsupported layout transition, descriptor mismatch)
    Configuration(String),

    /// Backend-specific error (Vulkan call failure, allocator failure)
    Backend(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Filesystem error while loading configuration or shader binaries
    Io(String),

    /// Missing model/texture/descriptor key in a lookup
    ResourceNotFound(String),

    /// The presentation surface no longer matches the swapchain; the caller
    /// must run the full resize/recreate path before rendering again
    SurfaceOutOfDate,
}

impl Error {
    /// Classify this error for the outer-loop recovery decision
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::SurfaceOutOfDate => ErrorKind::Recoverable,
            _ => ErrorKind::Fatal,
        }
    }

    /// True if the frame scheduler's resize branch handles this error
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::Recoverable
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            Error::Backend(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::Io(msg) => write!(f, "I/O error: {}", msg),
            Error::ResourceNotFound(msg) => write!(f, "Resource not found: {}", msg),
            Error::SurfaceOutOfDate => write!(f, "Surface out of date (resize required)"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
