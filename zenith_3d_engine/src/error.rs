//! Error types for the Zenith3D engine
//!
//! This module defines the error types used throughout the engine,
//! including device failures, initialization, and pool capacity.

use std::fmt;

/// Result type for Zenith3D engine operations
pub type Zenith3dResult<T> = std::result::Result<T, Zenith3dError>;

/// Short names used inside the engine and in the `zenith3d` namespace
pub use self::Zenith3dError as Error;
pub type Result<T> = Zenith3dResult<T>;

/// Zenith3D engine errors
#[derive(Debug, Clone)]
pub enum Zenith3dError {
    /// Backend-specific error (Vulkan, DirectX, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (texture, buffer, pipeline, scene key, etc.)
    InvalidResource(String),

    /// Initialization failed (engine, device resources, configuration)
    InitializationFailed(String),

    /// A fixed-capacity pool or GPU array cannot hold the request
    CapacityExceeded(String),

    /// The device stopped responding (submission or completion wait failed)
    DeviceLost(String),
}

impl fmt::Display for Zenith3dError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zenith3dError::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Zenith3dError::OutOfMemory => write!(f, "Out of GPU memory"),
            Zenith3dError::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Zenith3dError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Zenith3dError::CapacityExceeded(msg) => write!(f, "Capacity exceeded: {}", msg),
            Zenith3dError::DeviceLost(msg) => write!(f, "Device lost: {}", msg),
        }
    }
}

impl std::error::Error for Zenith3dError {}

/// Log an ERROR (with file:line) and build an `Error::BackendError`.
///
/// ```ignore
/// let slot = pool.slot_of(key)
///     .ok_or_else(|| engine_err!("zenith3d::Shadow", "light {:?} has no caster slot", key))?;
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::zenith3d::Zenith3dError::BackendError(message)
    }};
}

/// Log an ERROR and return early with an `Error::BackendError`.
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
