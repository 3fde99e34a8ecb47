//! Platform functionality
//!
//! Interfaces to device hardware the alarm core depends on: the NFC tag
//! reader and the audio/vibration output.

pub mod alert;
pub mod nfc;

pub use alert::{AlarmAlert, LogAlert};
pub use nfc::{ChannelTagReader, NfcCapability, TagFeed, TagReader};
