//! Dismissal gate
//!
//! One [`RingingSession`] exists per ringing alarm. It moves through
//! `Ringing -> Scanning -> Dismissed`, falling back to `Ringing` after a
//! rejected tag, a failed read or a timeout. When tag hardware is missing
//! the session offers a manual bypass instead.

use super::tag_match::{validate, MatchMode, Validation};
use crate::config::AppConfig;
use crate::database::{Alarm, WakeLog};
use crate::error::{AppError, Result};
use crate::platform::{AlarmAlert, NfcCapability};
use crate::storage::{settings_or_default, Storage};
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Ringing,
    Scanning,
    Dismissed,
    /// Ended without a dismissal; no wake log is written
    Abandoned,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Dismissed | SessionState::Abandoned)
    }
}

/// Result of a completed scan
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Dismissed(WakeLog),
    Rejected(Validation),
}

struct SessionInner {
    state: SessionState,
    bypass_offered: bool,
}

/// Dismissal state machine for one ringing alarm
pub struct RingingSession {
    alarm: Alarm,
    storage: Arc<dyn Storage>,
    capability: NfcCapability,
    alert: Arc<dyn AlarmAlert>,
    match_mode: MatchMode,
    scan_timeout: Duration,
    inner: Mutex<SessionInner>,
    closed: watch::Sender<bool>,
}

impl RingingSession {
    /// Start ringing `alarm`
    pub async fn begin(
        alarm: Alarm,
        storage: Arc<dyn Storage>,
        capability: NfcCapability,
        alert: Arc<dyn AlarmAlert>,
        config: &AppConfig,
    ) -> Self {
        let settings = settings_or_default(storage.as_ref()).await;
        alert.start(&alarm, settings.vibration_enabled);

        tracing::info!(
            "Ringing session started for alarm {} (NFC: {:?}, match mode: {})",
            alarm.id,
            capability,
            config.match_mode
        );

        let (closed, _) = watch::channel(false);

        Self {
            alarm,
            storage,
            capability,
            alert,
            match_mode: config.match_mode,
            scan_timeout: config.scan_timeout,
            inner: Mutex::new(SessionInner {
                state: SessionState::Ringing,
                bypass_offered: false,
            }),
            closed,
        }
    }

    pub fn alarm(&self) -> &Alarm {
        &self.alarm
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Whether a manual dismissal is currently on offer
    pub async fn bypass_offered(&self) -> bool {
        self.inner.lock().await.bypass_offered
    }

    /// Scan a tag and dismiss the alarm if it validates.
    ///
    /// Only one scan may run at a time. If the session ends while the scan
    /// is waiting, the read is dropped and `SessionClosed` is returned.
    pub async fn scan(&self) -> Result<ScanOutcome> {
        {
            let mut inner = self.inner.lock().await;
            match inner.state {
                SessionState::Scanning => return Err(AppError::ScanInProgress),
                SessionState::Dismissed | SessionState::Abandoned => {
                    return Err(AppError::SessionClosed)
                }
                SessionState::Ringing => {}
            }

            if !self.capability.is_available() {
                tracing::warn!(
                    "NFC unavailable for alarm {}, offering manual dismissal",
                    self.alarm.id
                );
                inner.bypass_offered = true;
                return Err(AppError::HardwareUnavailable);
            }

            inner.state = SessionState::Scanning;
        }

        let mut closed = self.closed.subscribe();
        let read = tokio::select! {
            result = self.capability.scan_tag(self.scan_timeout) => result,
            _ = closed.wait_for(|closed| *closed) => {
                tracing::info!("Scan cancelled, session for alarm {} ended", self.alarm.id);
                return Err(AppError::SessionClosed);
            }
        };

        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Scanning {
            tracing::debug!("Ignoring scan result for closed session {}", self.alarm.id);
            return Err(AppError::SessionClosed);
        }

        let tag = match read {
            Ok(tag) => tag,
            Err(e) => {
                tracing::warn!("Scan failed for alarm {}: {}", self.alarm.id, e);
                inner.state = SessionState::Ringing;
                if matches!(e, AppError::HardwareUnavailable) {
                    inner.bypass_offered = true;
                }
                return Err(e);
            }
        };

        let settings = settings_or_default(self.storage.as_ref()).await;
        let validation = validate(
            tag.as_deref(),
            settings.nfc_tag_id.as_deref(),
            self.match_mode,
        );

        if validation.valid {
            tracing::info!("Tag accepted for alarm {}: {}", self.alarm.id, validation.reason);
            let log = self.dismiss_locked(&mut inner).await;
            Ok(ScanOutcome::Dismissed(log))
        } else {
            tracing::warn!("Tag rejected for alarm {}: {}", self.alarm.id, validation.reason);
            inner.state = SessionState::Ringing;
            Ok(ScanOutcome::Rejected(validation))
        }
    }

    /// Dismiss without a tag. Only allowed after NFC was reported unavailable.
    pub async fn bypass(&self) -> Result<WakeLog> {
        let mut inner = self.inner.lock().await;

        if inner.state.is_terminal() {
            return Err(AppError::SessionClosed);
        }
        if !inner.bypass_offered {
            return Err(AppError::BypassNotOffered);
        }

        tracing::info!("Alarm {} dismissed manually", self.alarm.id);
        Ok(self.dismiss_locked(&mut inner).await)
    }

    /// End the session without dismissing, cancelling any in-flight scan
    pub async fn abandon(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state.is_terminal() {
            return;
        }

        inner.state = SessionState::Abandoned;
        self.closed.send_replace(true);
        self.alert.stop();

        tracing::info!("Ringing session for alarm {} abandoned", self.alarm.id);
    }

    async fn dismiss_locked(&self, inner: &mut SessionInner) -> WakeLog {
        inner.state = SessionState::Dismissed;
        self.closed.send_replace(true);
        self.alert.stop();

        let log = WakeLog::record(&self.alarm.id, Local::now());
        if let Err(e) = self.storage.add_wake_log(&log).await {
            tracing::error!("Error adding wake log for alarm {}: {}", self.alarm.id, e);
        }

        tracing::info!("Alarm {} dismissed at {}", self.alarm.id, log.wake_time);
        log
    }
}
