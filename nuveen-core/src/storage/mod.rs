//! Storage module
//!
//! The persistence contract consumed by the alarm core, and its
//! SQLite-backed key/value implementation.

pub mod kv_store;

pub use kv_store::KvStorage;

use crate::database::{Alarm, Settings, WakeLog};
use crate::error::Result;
use async_trait::async_trait;

/// Persistence for alarms, settings and wake logs.
///
/// Calls are independent: there is no transaction spanning a read and the
/// following write.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_alarms(&self) -> Result<Vec<Alarm>>;

    async fn save_alarms(&self, alarms: &[Alarm]) -> Result<()>;

    /// Settings, or defaults when none have been saved yet
    async fn get_settings(&self) -> Result<Settings>;

    async fn save_settings(&self, settings: &Settings) -> Result<()>;

    /// Append one entry to the wake log
    async fn add_wake_log(&self, log: &WakeLog) -> Result<()>;

    async fn get_wake_logs(&self) -> Result<Vec<WakeLog>>;

    async fn is_onboarding_complete(&self) -> Result<bool>;

    async fn set_onboarding_complete(&self) -> Result<()>;
}

/// Read settings, falling back to defaults when storage fails
pub async fn settings_or_default(storage: &dyn Storage) -> Settings {
    match storage.get_settings().await {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Error getting settings, using defaults: {}", e);
            Settings::default()
        }
    }
}

/// Read alarms, falling back to an empty list when storage fails
pub async fn alarms_or_empty(storage: &dyn Storage) -> Vec<Alarm> {
    match storage.get_alarms().await {
        Ok(alarms) => alarms,
        Err(e) => {
            tracing::error!("Error getting alarms: {}", e);
            Vec::new()
        }
    }
}
