//! Error types for the Dank engine
//!
//! This module defines the error types shared by the core, the resource
//! loaders and the renderer backends.

use std::fmt;

/// Result type for Dank engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Dank engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan, Metal, DirectX, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (texture, buffer, argument table, etc.)
    InvalidResource(String),

    /// Initialization failed (device, pipeline, subsystems)
    InitializationFailed(String),

    /// A resource payload could not be loaded or decoded
    ResourceLoad(String),

    /// A URI could not be parsed or resolved
    InvalidUri(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::ResourceLoad(msg) => write!(f, "Resource load failed: {}", msg),
            Error::InvalidUri(msg) => write!(f, "Invalid URI: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
