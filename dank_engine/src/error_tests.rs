//! Unit tests for error.rs
//!
//! Tests all Error variants and their implementations (Display, Debug, Clone, std::error::Error).

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("vkQueueSubmit failed".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("vkQueueSubmit failed"));
}

#[test]
fn test_out_of_memory_display() {
    let err = Error::OutOfMemory;
    assert_eq!(format!("{}", err), "Out of GPU memory");
}

#[test]
fn test_invalid_resource_display() {
    let err = Error::InvalidResource("Texture 4 has 0x0 extent".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Invalid resource"));
    assert!(display.contains("0x0 extent"));
}

#[test]
fn test_initialization_failed_display() {
    let err = Error::InitializationFailed("Pipeline creation failed".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Initialization failed"));
    assert!(display.contains("Pipeline creation failed"));
}

#[test]
fn test_resource_load_display() {
    let err = Error::ResourceLoad("textures/missing.png".to_string());
    assert_eq!(format!("{}", err), "Resource load failed: textures/missing.png");
}

#[test]
fn test_invalid_uri_display() {
    let err = Error::InvalidUri("".to_string());
    assert_eq!(format!("{}", err), "Invalid URI: ");
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_debug() {
    assert!(format!("{:?}", Error::BackendError("x".into())).contains("BackendError"));
    assert!(format!("{:?}", Error::OutOfMemory).contains("OutOfMemory"));
    assert!(format!("{:?}", Error::ResourceLoad("x".into())).contains("ResourceLoad"));
    assert!(format!("{:?}", Error::InvalidUri("x".into())).contains("InvalidUri"));
}

#[test]
fn test_error_clone() {
    let err1 = Error::InvalidResource("mesh 7".to_string());
    let err2 = err1.clone();
    assert_eq!(format!("{}", err1), format!("{}", err2));
}

// ============================================================================
// RESULT TYPE
// ============================================================================

#[test]
fn test_result_propagation() {
    fn inner() -> Result<u32> {
        Err(Error::OutOfMemory)
    }
    fn outer() -> Result<u32> {
        let value = inner()?;
        Ok(value + 1)
    }
    assert!(matches!(outer(), Err(Error::OutOfMemory)));
}
