//! Application configuration
//!
//! Central location for configuration constants and the runtime
//! configuration assembled by the binary from arguments and environment.

use crate::services::MatchMode;
use std::path::PathBuf;
use std::time::Duration;

// ===== NFC =====

/// How long a single tag scan waits for hardware before failing.
pub const SCAN_TIMEOUT: Duration = Duration::from_secs(30);

// ===== Alarms =====

/// Label shown for alarms saved without a name. Never written to storage.
pub const DEFAULT_ALARM_NAME: &str = "Morning Ritual";

/// Short weekday names indexed by repeat-day value (0 = Sunday)
pub const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

// ===== Storage =====

/// Key holding the serialized alarm collection
pub const KEY_ALARMS: &str = "@nuveen:alarms";
/// Key holding the settings record
pub const KEY_SETTINGS: &str = "@nuveen:settings";
/// Key holding the append-only wake log
pub const KEY_WAKE_LOGS: &str = "@nuveen:wake_logs";
/// Key holding the onboarding flag (`"true"` once complete)
pub const KEY_ONBOARDING_COMPLETE: &str = "@nuveen:onboarding_complete";

/// Database file created inside the data directory
pub const DATABASE_FILE: &str = "nuveen.db";

/// Capacity of the ring event broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub match_mode: MatchMode,
    pub scan_timeout: Duration,
}

impl AppConfig {
    pub fn new(data_dir: PathBuf, match_mode: MatchMode) -> Self {
        Self {
            data_dir,
            match_mode,
            scan_timeout: SCAN_TIMEOUT,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_path_inside_data_dir() {
        let config = AppConfig::new(PathBuf::from("/tmp/nuveen"), MatchMode::Strict);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/nuveen/nuveen.db"));
        assert_eq!(config.scan_timeout, Duration::from_secs(30));
    }
}
