//! Alarm audio and vibration output

use crate::database::Alarm;
use std::sync::atomic::{AtomicBool, Ordering};

/// Sound and vibration for a ringing alarm
pub trait AlarmAlert: Send + Sync {
    fn start(&self, alarm: &Alarm, vibrate: bool);

    fn stop(&self);
}

/// Alert that reports through the log instead of a speaker
#[derive(Debug, Default)]
pub struct LogAlert {
    active: AtomicBool,
}

impl LogAlert {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl AlarmAlert for LogAlert {
    fn start(&self, alarm: &Alarm, vibrate: bool) {
        self.active.store(true, Ordering::SeqCst);
        tracing::info!(
            "Alarm ringing: {} at {} (vibration: {}, sound: {})",
            alarm.display_name(),
            alarm.time,
            vibrate,
            alarm.sound_name.as_deref().unwrap_or("default")
        );
    }

    fn stop(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            tracing::info!("Alarm sound and vibration stopped");
        }
    }
}
