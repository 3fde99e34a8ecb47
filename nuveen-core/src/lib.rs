//! Nuveen library
//!
//! Alarm core for the Nuveen NFC alarm clock: next-alarm selection, the
//! tag-gated dismissal session, scheduling and persistence. The `nuveen`
//! binary is a command-line front end over this library.

pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod platform;
pub mod services;
pub mod storage;
