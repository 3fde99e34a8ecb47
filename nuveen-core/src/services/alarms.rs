//! Alarms service
//!
//! Owns the in-memory alarm list. Every mutation persists the whole
//! collection, updates the notification schedule and refreshes the
//! snapshot that observers watch.

use super::next_alarm::{format_countdown, select_next_alarm};
use super::scheduler::AlarmScheduler;
use crate::database::{Alarm, CreateAlarmRequest, UpdateAlarmRequest};
use crate::error::{AppError, Result};
use crate::storage::{alarms_or_empty, Storage};
use chrono::NaiveDateTime;
use std::sync::Arc;
use tokio::sync::watch;

/// Owned result of the next-alarm selector
#[derive(Debug, Clone, PartialEq)]
pub struct UpcomingAlarm {
    pub alarm: Alarm,
    pub occurrence: NaiveDateTime,
    pub minutes_until: i64,
}

impl UpcomingAlarm {
    pub fn countdown(&self) -> String {
        format_countdown(self.minutes_until)
    }
}

/// Service for managing alarms
#[derive(Clone)]
pub struct AlarmsService {
    storage: Arc<dyn Storage>,
    scheduler: Option<AlarmScheduler>,
    snapshot: Arc<watch::Sender<Vec<Alarm>>>,
}

impl AlarmsService {
    pub fn new(storage: Arc<dyn Storage>, scheduler: Option<AlarmScheduler>) -> Self {
        let (snapshot, _) = watch::channel(Vec::new());
        Self {
            storage,
            scheduler,
            snapshot: Arc::new(snapshot),
        }
    }

    /// Reload alarms from storage and notify observers
    pub async fn refresh(&self) -> Vec<Alarm> {
        let alarms = alarms_or_empty(self.storage.as_ref()).await;
        tracing::debug!("Loaded {} alarms", alarms.len());
        self.snapshot.send_replace(alarms.clone());
        alarms
    }

    /// Current snapshot
    pub fn alarms(&self) -> Vec<Alarm> {
        self.snapshot.borrow().clone()
    }

    /// Observe every refresh
    pub fn subscribe(&self) -> watch::Receiver<Vec<Alarm>> {
        self.snapshot.subscribe()
    }

    pub async fn get_alarm(&self, id: &str) -> Result<Alarm> {
        self.storage
            .get_alarms()
            .await?
            .into_iter()
            .find(|a| a.id == id)
            .ok_or_else(|| AppError::AlarmNotFound(id.to_string()))
    }

    /// Create a new alarm
    pub async fn create_alarm(&self, req: CreateAlarmRequest) -> Result<Alarm> {
        let alarm = Alarm::from_request(req);
        tracing::info!("Creating alarm: {} at {}", alarm.display_name(), alarm.time);

        let mut alarms = self.storage.get_alarms().await?;
        alarms.push(alarm.clone());
        self.storage.save_alarms(&alarms).await?;

        self.schedule(&alarm).await;
        self.refresh().await;

        tracing::info!("Alarm created successfully: {}", alarm.id);
        Ok(alarm)
    }

    /// Update an alarm
    pub async fn update_alarm(&self, req: UpdateAlarmRequest) -> Result<Alarm> {
        tracing::debug!("Updating alarm: {}", req.id);

        let mut alarms = self.storage.get_alarms().await?;
        let alarm = alarms
            .iter_mut()
            .find(|a| a.id == req.id)
            .ok_or_else(|| AppError::AlarmNotFound(req.id.clone()))?;
        alarm.apply(req);
        let updated = alarm.clone();

        self.storage.save_alarms(&alarms).await?;

        self.schedule(&updated).await;
        self.refresh().await;

        Ok(updated)
    }

    /// Delete an alarm
    pub async fn delete_alarm(&self, id: &str) -> Result<()> {
        tracing::info!("Deleting alarm: {}", id);

        let mut alarms = self.storage.get_alarms().await?;
        let before = alarms.len();
        alarms.retain(|a| a.id != id);
        if alarms.len() == before {
            return Err(AppError::AlarmNotFound(id.to_string()));
        }

        self.storage.save_alarms(&alarms).await?;

        if let Some(scheduler) = &self.scheduler {
            if let Err(e) = scheduler.cancel(id).await {
                tracing::error!("Failed to cancel alarm {}: {}", id, e);
            }
        }
        self.refresh().await;

        Ok(())
    }

    /// Flip an alarm's enabled flag
    pub async fn toggle_alarm(&self, id: &str) -> Result<Alarm> {
        let current = self.get_alarm(id).await?;

        let alarm = self
            .update_alarm(UpdateAlarmRequest {
                id: id.to_string(),
                enabled: Some(!current.enabled),
                ..Default::default()
            })
            .await?;

        tracing::info!(
            "Alarm {} {}",
            alarm.id,
            if alarm.enabled { "enabled" } else { "disabled" }
        );
        Ok(alarm)
    }

    /// Soonest enabled alarm in the current snapshot
    pub fn next_alarm(&self, now: NaiveDateTime) -> Option<UpcomingAlarm> {
        let alarms = self.snapshot.borrow();
        select_next_alarm(&alarms, now).map(|next| UpcomingAlarm {
            alarm: next.alarm.clone(),
            occurrence: next.occurrence,
            minutes_until: next.minutes_until,
        })
    }

    /// Arm notifications for every alarm in the snapshot
    pub async fn schedule_all(&self) -> Result<usize> {
        let Some(scheduler) = &self.scheduler else {
            return Ok(0);
        };

        let mut armed = 0;
        for alarm in self.alarms() {
            if scheduler.schedule(&alarm).await?.is_some() {
                armed += 1;
            }
        }

        tracing::info!("{} alarms scheduled", armed);
        Ok(armed)
    }

    async fn schedule(&self, alarm: &Alarm) {
        if let Some(scheduler) = &self.scheduler {
            // The record is already saved; a scheduling failure is only logged
            if let Err(e) = scheduler.schedule(alarm).await {
                tracing::error!("Failed to schedule alarm {}: {}", alarm.id, e);
            }
        }
    }
}
