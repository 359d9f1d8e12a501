//! Unit tests for error.rs
//!
//! Tests all Error variants, Display output and the engine_err!/engine_bail! macros.

use crate::error::{Error, Result, Zenith3dError, Zenith3dResult};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("command list not recording".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("command list not recording"));
}

#[test]
fn test_out_of_memory_display() {
    assert_eq!(format!("{}", Error::OutOfMemory), "Out of GPU memory");
}

#[test]
fn test_capacity_exceeded_display() {
    let err = Error::CapacityExceeded("light pool full (256)".to_string());
    let display = format!("{}", err);
    assert!(display.starts_with("Capacity exceeded"));
    assert!(display.contains("256"));
}

#[test]
fn test_device_lost_display() {
    let err = Error::DeviceLost("fence wait timed out".to_string());
    assert_eq!(format!("{}", err), "Device lost: fence wait timed out");
}

#[test]
fn test_initialization_failed_display() {
    let err = Error::InitializationFailed("zero light capacity".to_string());
    assert!(format!("{}", err).contains("zero light capacity"));
}

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_clone_keeps_message() {
    let err = Error::InvalidResource("terrain key".to_string());
    let copy = err.clone();
    assert_eq!(format!("{}", err), format!("{}", copy));
}

// ============================================================================
// MACRO TESTS
// ============================================================================

#[test]
fn test_engine_err_builds_backend_error() {
    let err = crate::engine_err!("zenith3d::test", "slot {} out of range", 7);
    match err {
        Error::BackendError(msg) => assert_eq!(msg, "slot 7 out of range"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_engine_bail_returns_early() {
    fn fails(flag: bool) -> Result<u32> {
        if flag {
            crate::engine_bail!("zenith3d::test", "bailed with {}", "flag");
        }
        Ok(1)
    }

    assert_eq!(fails(false).unwrap(), 1);
    match fails(true) {
        Err(Error::BackendError(msg)) => assert!(msg.contains("bailed with flag")),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_error_propagation_with_question_mark() {
    fn inner() -> Result<i32> {
        Err(Error::DeviceLost("lost".to_string()))
    }

    fn outer() -> Result<i32> {
        inner()?;
        Ok(42)
    }

    assert!(matches!(outer(), Err(Error::DeviceLost(_))));
}

#[test]
fn test_short_names_alias_prefixed_types() {
    fn device_lost() -> Zenith3dResult<()> {
        Err(Zenith3dError::DeviceLost("gone".to_string()))
    }

    let result: Result<()> = device_lost();
    let err: Error = result.unwrap_err();
    assert!(matches!(err, Zenith3dError::DeviceLost(_)));
    assert_eq!(format!("{}", err), "Device lost: gone");
}
