/// Alarm Scheduler Service
/// Arms one job per enabled alarm at its next occurrence and broadcasts
/// a ring event when the job fires. Repeating alarms are re-armed after
/// each ring.
use super::next_alarm::next_occurrence;
use crate::config::EVENT_CHANNEL_CAPACITY;
use crate::database::Alarm;
use crate::error::{AppError, Result};
use chrono::{Local, NaiveDateTime};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

/// Emitted when an alarm's time arrives
#[derive(Debug, Clone)]
pub enum AlarmEvent {
    Ringing {
        alarm: Alarm,
        occurrence: NaiveDateTime,
        job_id: Uuid,
    },
}

/// Scheduler service for alarm notifications
#[derive(Clone)]
pub struct AlarmScheduler {
    scheduler: Arc<RwLock<JobScheduler>>,
    /// Alarm id -> job id
    jobs: Arc<RwLock<HashMap<String, Uuid>>>,
    events: broadcast::Sender<AlarmEvent>,
}

impl AlarmScheduler {
    /// Create new scheduler service
    pub async fn new() -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to create scheduler: {}", e)))?;

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            scheduler: Arc::new(RwLock::new(scheduler)),
            jobs: Arc::new(RwLock::new(HashMap::new())),
            events,
        })
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<()> {
        let scheduler = self.scheduler.read().await;
        scheduler
            .start()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to start scheduler: {}", e)))?;
        tracing::info!("Alarm scheduler started");
        Ok(())
    }

    /// Receive ring events
    pub fn subscribe(&self) -> broadcast::Receiver<AlarmEvent> {
        self.events.subscribe()
    }

    /// Schedule the alarm's next occurrence from the current local time.
    ///
    /// Returns `None` for disabled alarms, which only cancels any job
    /// previously armed for them.
    pub async fn schedule(&self, alarm: &Alarm) -> Result<Option<Uuid>> {
        self.schedule_at(alarm, Local::now().naive_local()).await
    }

    /// Schedule the alarm's next occurrence after `now`
    pub async fn schedule_at(&self, alarm: &Alarm, now: NaiveDateTime) -> Result<Option<Uuid>> {
        let mut jobs = self.jobs.write().await;

        if let Some(previous) = jobs.remove(&alarm.id) {
            self.remove_job(previous).await?;
        }

        if !alarm.enabled {
            tracing::info!("Alarm {} disabled, not scheduling", alarm.id);
            return Ok(None);
        }

        let occurrence = next_occurrence(alarm.time, now);
        let delay = (occurrence - now)
            .to_std()
            .map_err(|e| AppError::Scheduler(format!("Invalid alarm delay: {}", e)))?;

        let events = self.events.clone();
        let fired = alarm.clone();

        let job = Job::new_one_shot_async(delay, move |job_id, _l| {
            let events = events.clone();
            let alarm = fired.clone();
            Box::pin(async move {
                tracing::info!("Alarm {} ({}) is ringing", alarm.id, alarm.display_name());

                if events
                    .send(AlarmEvent::Ringing {
                        alarm,
                        occurrence,
                        job_id,
                    })
                    .is_err()
                {
                    tracing::warn!("Alarm fired with no listeners");
                }
            })
        })
        .map_err(|e| AppError::Scheduler(format!("Failed to create alarm job: {}", e)))?;

        let job_id = job.guid();

        let scheduler = self.scheduler.write().await;
        scheduler
            .add(job)
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to schedule job: {}", e)))?;

        jobs.insert(alarm.id.clone(), job_id);

        tracing::info!(
            "Alarm scheduled: {} at {} ({})",
            alarm.display_name(),
            occurrence,
            job_id
        );
        Ok(Some(job_id))
    }

    /// Cancel the job armed for an alarm, if any
    pub async fn cancel(&self, alarm_id: &str) -> Result<()> {
        let mut jobs = self.jobs.write().await;

        if let Some(job_id) = jobs.remove(alarm_id) {
            self.remove_job(job_id).await?;
            tracing::info!("Alarm {} schedule cancelled", alarm_id);
        }

        Ok(())
    }

    /// Cancel every armed alarm
    pub async fn cancel_all(&self) -> Result<()> {
        let mut jobs = self.jobs.write().await;

        for (alarm_id, job_id) in jobs.drain() {
            self.remove_job(job_id).await?;
            tracing::debug!("Alarm {} schedule cancelled", alarm_id);
        }

        tracing::info!("All alarm schedules cancelled");
        Ok(())
    }

    /// Ids of alarms that currently have an armed job, sorted
    pub async fn scheduled_ids(&self) -> Vec<String> {
        let jobs = self.jobs.read().await;
        let mut ids: Vec<String> = jobs.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Re-arm repeating alarms after they ring.
    ///
    /// One-shot alarms are forgotten once fired; the alarm record itself
    /// stays enabled, matching the mobile app.
    pub fn spawn_rearm(&self) -> JoinHandle<()> {
        let this = self.clone();
        let mut events = self.subscribe();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(AlarmEvent::Ringing {
                        alarm,
                        occurrence,
                        job_id,
                    }) => {
                        // Skip alarms that were edited or cancelled since this job was armed
                        {
                            let mut jobs = this.jobs.write().await;
                            if jobs.get(&alarm.id) != Some(&job_id) {
                                continue;
                            }
                            if !alarm.repeats() {
                                jobs.remove(&alarm.id);
                                continue;
                            }
                        }

                        // Never earlier than the occurrence that just fired,
                        // so the boundary rule pushes it to the next day.
                        let now = Local::now().naive_local().max(occurrence);
                        if let Err(e) = this.schedule_at(&alarm, now).await {
                            tracing::error!("Failed to re-arm alarm {}: {}", alarm.id, e);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!("Re-arm task missed {} ring events", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Shutdown scheduler gracefully
    pub async fn shutdown(&self) -> Result<()> {
        let mut scheduler = self.scheduler.write().await;
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to shutdown scheduler: {}", e)))?;
        tracing::info!("Alarm scheduler shutdown");
        Ok(())
    }

    async fn remove_job(&self, job_id: Uuid) -> Result<()> {
        let scheduler = self.scheduler.write().await;
        scheduler
            .remove(&job_id)
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to remove job: {}", e)))
    }
}
