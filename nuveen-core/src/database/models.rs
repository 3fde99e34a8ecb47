//! Database models
//!
//! Rust structs representing persisted entities.
//! Field names serialize in camelCase so blobs written by the mobile
//! app deserialize unchanged.

use crate::config::{DEFAULT_ALARM_NAME, WEEKDAY_NAMES};
use crate::error::{AppError, Result};
use chrono::{DateTime, Local, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Wall-clock time of day, persisted as zero-padded `HH:MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AlarmTime(NaiveTime);

impl AlarmTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(AppError::InvalidTime(format!("{}:{}", hour, minute)));
        }
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or_else(|| AppError::InvalidTime(format!("{}:{}", hour, minute)))
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    /// The time with seconds and subseconds zeroed
    pub fn as_naive_time(&self) -> NaiveTime {
        self.0
    }
}

impl FromStr for AlarmTime {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || AppError::InvalidTime(s.to_string());

        let (hours, minutes) = s.trim().split_once(':').ok_or_else(invalid)?;
        if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
            return Err(invalid());
        }

        let hour: u32 = hours.parse().map_err(|_| invalid())?;
        let minute: u32 = minutes.parse().map_err(|_| invalid())?;

        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for AlarmTime {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<AlarmTime> for String {
    fn from(time: AlarmTime) -> Self {
        time.to_string()
    }
}

impl fmt::Display for AlarmTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// Weekdays an alarm repeats on (0 = Sunday .. 6 = Saturday).
///
/// Always sorted and free of duplicates. Empty means the alarm fires once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct RepeatDays(Vec<u8>);

impl RepeatDays {
    pub fn new(days: impl IntoIterator<Item = u8>) -> Result<Self> {
        let mut days: Vec<u8> = days.into_iter().collect();
        if let Some(&bad) = days.iter().find(|&&d| d > 6) {
            return Err(AppError::InvalidRepeatDay(bad));
        }
        days.sort_unstable();
        days.dedup();
        Ok(Self(days))
    }

    pub fn every_day() -> Self {
        Self((0..7).collect())
    }

    pub fn days(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<u8>> for RepeatDays {
    type Error = AppError;

    fn try_from(value: Vec<u8>) -> Result<Self> {
        Self::new(value)
    }
}

impl From<RepeatDays> for Vec<u8> {
    fn from(days: RepeatDays) -> Self {
        days.0
    }
}

impl fmt::Display for RepeatDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.len() {
            0 => f.write_str("Once"),
            7 => f.write_str("Every day"),
            _ => {
                let names: Vec<&str> = self
                    .0
                    .iter()
                    .map(|&d| WEEKDAY_NAMES[usize::from(d)])
                    .collect();
                f.write_str(&names.join(", "))
            }
        }
    }
}

/// Background gradient attached to an alarm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientTheme {
    #[default]
    Dawn,
    Amber,
    Warm,
}

impl FromStr for GradientTheme {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "dawn" => Ok(GradientTheme::Dawn),
            "amber" => Ok(GradientTheme::Amber),
            "warm" => Ok(GradientTheme::Warm),
            other => Err(AppError::Generic(format!("Unknown gradient theme: {}", other))),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A configured alarm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub time: AlarmTime,
    #[serde(default)]
    pub repeat_days: RepeatDays,
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub nfc_required: bool,
    #[serde(default)]
    pub gradient_theme: GradientTheme,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_sound_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_name: Option<String>,
}

impl Alarm {
    /// Build a new enabled alarm with a fresh identifier
    pub fn from_request(req: CreateAlarmRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: req.name,
            time: req.time,
            repeat_days: req.repeat_days,
            enabled: true,
            nfc_required: req.nfc_required,
            gradient_theme: req.gradient_theme,
            custom_sound_uri: req.custom_sound_uri,
            sound_name: req.sound_name,
        }
    }

    /// Name shown to the user; empty names fall back to the default label
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            DEFAULT_ALARM_NAME
        } else {
            &self.name
        }
    }

    pub fn repeats(&self) -> bool {
        !self.repeat_days.is_empty()
    }

    /// Apply the fields present in an update request
    pub fn apply(&mut self, req: UpdateAlarmRequest) {
        if let Some(name) = req.name {
            self.name = name;
        }
        if let Some(time) = req.time {
            self.time = time;
        }
        if let Some(repeat_days) = req.repeat_days {
            self.repeat_days = repeat_days;
        }
        if let Some(enabled) = req.enabled {
            self.enabled = enabled;
        }
        if let Some(nfc_required) = req.nfc_required {
            self.nfc_required = nfc_required;
        }
        if let Some(theme) = req.gradient_theme {
            self.gradient_theme = theme;
        }
        if let Some(uri) = req.custom_sound_uri {
            self.custom_sound_uri = Some(uri);
        }
        if let Some(sound_name) = req.sound_name {
            self.sound_name = Some(sound_name);
        }
    }
}

/// Create alarm request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAlarmRequest {
    pub name: String,
    pub time: AlarmTime,
    pub repeat_days: RepeatDays,
    pub nfc_required: bool,
    pub gradient_theme: GradientTheme,
    pub custom_sound_uri: Option<String>,
    pub sound_name: Option<String>,
}

impl CreateAlarmRequest {
    pub fn new(time: AlarmTime) -> Self {
        Self {
            name: String::new(),
            time,
            repeat_days: RepeatDays::default(),
            nfc_required: true,
            gradient_theme: GradientTheme::default(),
            custom_sound_uri: None,
            sound_name: None,
        }
    }
}

/// Update alarm request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAlarmRequest {
    pub id: String,
    pub name: Option<String>,
    pub time: Option<AlarmTime>,
    pub repeat_days: Option<RepeatDays>,
    pub enabled: Option<bool>,
    pub nfc_required: Option<bool>,
    pub gradient_theme: Option<GradientTheme>,
    pub custom_sound_uri: Option<String>,
    pub sound_name: Option<String>,
}

/// Color scheme preference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    Auto,
}

impl FromStr for Theme {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "auto" => Ok(Theme::Auto),
            other => Err(AppError::Generic(format!("Unknown theme: {}", other))),
        }
    }
}

/// Background gradient used across screens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientStyle {
    #[default]
    Dawn,
    Amber,
    Warm,
    Dark,
}

impl FromStr for GradientStyle {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "dawn" => Ok(GradientStyle::Dawn),
            "amber" => Ok(GradientStyle::Amber),
            "warm" => Ok(GradientStyle::Warm),
            "dark" => Ok(GradientStyle::Dark),
            other => Err(AppError::Generic(format!("Unknown gradient style: {}", other))),
        }
    }
}

/// Installation-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Registered tag; `None` accepts any tag
    #[serde(default)]
    pub nfc_tag_id: Option<String>,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_true")]
    pub vibration_enabled: bool,
    #[serde(default)]
    pub gradient_style: GradientStyle,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            nfc_tag_id: None,
            theme: Theme::Auto,
            vibration_enabled: true,
            gradient_style: GradientStyle::Dawn,
        }
    }
}

/// Record of one successful dismissal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WakeLog {
    pub id: String,
    pub date: DateTime<Utc>,
    /// Not enforced: the alarm may have been deleted since
    pub alarm_id: String,
    /// Local time of day as `HH:MM:SS`
    pub wake_time: String,
}

impl WakeLog {
    pub fn record(alarm_id: &str, at: DateTime<Local>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            date: at.with_timezone(&Utc),
            alarm_id: alarm_id.to_string(),
            wake_time: at.format("%H:%M:%S").to_string(),
        }
    }
}
