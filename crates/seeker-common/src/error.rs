//! Error types for Seeker

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Memory access error at {address:#x}: {message}")]
    MemoryAccess { address: usize, message: String },

    #[error("Invalid address: {0:#x}")]
    InvalidAddress(usize),

    #[error("Target is not attached")]
    NotAttached,

    #[error("Shared segment unavailable: {0}")]
    SegmentUnavailable(String),

    #[error("Incompatible scan variant: {0}")]
    IncompatibleVariant(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_access_error_display() {
        let err = Error::MemoryAccess {
            address: 0x8000_0100,
            message: "view exhausted".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("0x80000100"));
        assert!(msg.contains("view exhausted"));
    }

    #[test]
    fn test_invalid_address_error_display() {
        let err = Error::InvalidAddress(0xDEADBEEF);
        let msg = format!("{}", err);
        assert!(msg.contains("0xdeadbeef"));
    }

    #[test]
    fn test_segment_unavailable_error_display() {
        let err = Error::SegmentUnavailable("no emulator running".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("no emulator running"));
    }

    #[test]
    fn test_incompatible_variant_error_display() {
        let err = Error::IncompatibleVariant("placeholder has no wire form".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("placeholder has no wire form"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_ok().unwrap(), 42);
    }
}
