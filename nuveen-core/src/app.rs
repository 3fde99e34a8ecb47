//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are initialized here and made available through AppState.

use crate::config::AppConfig;
use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::platform::{AlarmAlert, NfcCapability};
use crate::services::{AlarmScheduler, AlarmsService, RingingSession, SettingsService};
use crate::storage::{KvStorage, Storage};
use std::sync::Arc;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub storage: Arc<dyn Storage>,
    pub alarms: AlarmsService,
    pub settings: SettingsService,
    pub scheduler: AlarmScheduler,
    pub capability: NfcCapability,
    pub alert: Arc<dyn AlarmAlert>,
}

impl AppState {
    /// Start ringing an alarm from the current snapshot
    pub async fn start_ringing(&self, alarm_id: &str) -> Result<RingingSession> {
        let alarm = self.alarms.get_alarm(alarm_id).await?;

        Ok(RingingSession::begin(
            alarm,
            self.storage.clone(),
            self.capability.clone(),
            self.alert.clone(),
            &self.config,
        )
        .await)
    }
}

/// Application setup - called once on startup
pub async fn setup(
    config: AppConfig,
    capability: NfcCapability,
    alert: Arc<dyn AlarmAlert>,
) -> Result<AppState> {
    tracing::info!("Initializing application");
    tracing::info!("App data directory: {:?}", config.data_dir);

    std::fs::create_dir_all(&config.data_dir)?;

    let pool = create_pool(&config.database_path()).await?;
    let storage: Arc<dyn Storage> = Arc::new(KvStorage::new(Repository::new(pool)));

    let scheduler = AlarmScheduler::new().await?;
    let alarms = AlarmsService::new(storage.clone(), Some(scheduler.clone()));
    let settings = SettingsService::new(storage.clone(), config.scan_timeout);

    let loaded = alarms.refresh().await;
    tracing::info!(
        "Application initialized successfully ({} alarms, NFC {:?})",
        loaded.len(),
        capability
    );

    Ok(AppState {
        config,
        storage,
        alarms,
        settings,
        scheduler,
        capability,
        alert,
    })
}
