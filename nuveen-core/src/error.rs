//! Error types for Nuveen
//!
//! All errors use thiserror for structured error handling.
//! A rejected tag is not an error: it is a normal scan outcome.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("NFC is not available on this device")]
    HardwareUnavailable,

    #[error("NFC scan timeout")]
    ScanTimeout,

    #[error("Scan failed: {0}")]
    ScanFailed(String),

    #[error("A scan is already in progress for this alarm")]
    ScanInProgress,

    #[error("Ringing session is closed")]
    SessionClosed,

    #[error("Manual dismissal is only offered when NFC is unavailable")]
    BypassNotOffered,

    #[error("Alarm not found: {0}")]
    AlarmNotFound(String),

    #[error("Invalid alarm time: {0}")]
    InvalidTime(String),

    #[error("Invalid repeat day: {0} (expected 0-6)")]
    InvalidRepeatDay(u8),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Storage failures are recovered by callers that fall back to defaults.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Io(_) | AppError::Serialization(_)
        )
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serializes_as_message() {
        let json = serde_json::to_string(&AppError::AlarmNotFound("abc".to_string())).unwrap();
        assert_eq!(json, "\"Alarm not found: abc\"");

        let json = serde_json::to_string(&AppError::ScanTimeout).unwrap();
        assert_eq!(json, "\"NFC scan timeout\"");
    }

    #[test]
    fn test_storage_errors() {
        let io = AppError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(io.is_storage());
        assert!(!AppError::ScanTimeout.is_storage());
    }
}
