//! Services module
//!
//! Alarm business logic: next-alarm selection, tag validation, the ringing
//! session, scheduling, and the alarm and settings services that sit on top
//! of storage.

pub mod alarms;
pub mod dismissal;
pub mod next_alarm;
pub mod scheduler;
pub mod settings;
pub mod tag_match;

pub use alarms::{AlarmsService, UpcomingAlarm};
pub use dismissal::{RingingSession, ScanOutcome, SessionState};
pub use next_alarm::{
    format_countdown, format_repeat_days, next_occurrence, select_next_alarm, NextAlarm,
};
pub use scheduler::{AlarmEvent, AlarmScheduler};
pub use settings::SettingsService;
pub use tag_match::{checksum, validate, MatchMode, Validation, ValidationReason};
