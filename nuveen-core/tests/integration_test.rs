//! Integration tests for Nuveen
//!
//! These tests verify end-to-end functionality including:
//! - Alarm management on a file database
//! - Persistence across connection pools
//! - Ringing sessions that dismiss with a tag and write wake logs

use chrono::NaiveDate;
use nuveen::config::{AppConfig, KEY_ALARMS, KEY_SETTINGS};
use nuveen::database::{create_pool, CreateAlarmRequest, RepeatDays, Repository, UpdateAlarmRequest};
use nuveen::platform::{ChannelTagReader, LogAlert, NfcCapability};
use nuveen::services::{
    AlarmsService, MatchMode, RingingSession, ScanOutcome, SessionState, SettingsService,
    ValidationReason,
};
use nuveen::storage::{KvStorage, Storage};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Helper to create storage over a file database
async fn create_test_storage() -> (Arc<KvStorage>, Repository, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let pool = create_pool(&db_path).await.unwrap();
    let repo = Repository::new(pool);

    (Arc::new(KvStorage::new(repo.clone())), repo, temp_dir)
}

fn request(time: &str) -> CreateAlarmRequest {
    CreateAlarmRequest::new(time.parse().unwrap())
}

#[tokio::test]
async fn test_alarm_crud_operations() {
    let (storage, _repo, _temp) = create_test_storage().await;
    let alarms = AlarmsService::new(storage, None);

    // Create
    let mut req = request("07:00");
    req.name = "Gym".to_string();
    req.repeat_days = RepeatDays::new([1, 3, 5]).unwrap();
    let alarm = alarms.create_alarm(req).await.unwrap();
    assert!(!alarm.id.is_empty());

    // Read
    let retrieved = alarms.get_alarm(&alarm.id).await.unwrap();
    assert_eq!(retrieved.name, "Gym");
    assert_eq!(retrieved.repeat_days.to_string(), "Mon, Wed, Fri");

    // Update
    let updated = alarms
        .update_alarm(UpdateAlarmRequest {
            id: alarm.id.clone(),
            name: Some(String::new()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(updated.display_name(), "Morning Ritual");

    // Delete
    alarms.delete_alarm(&alarm.id).await.unwrap();
    assert!(alarms.get_alarm(&alarm.id).await.is_err());
    assert!(alarms.alarms().is_empty());
}

#[tokio::test]
async fn test_next_alarm_scenarios() {
    let (storage, _repo, _temp) = create_test_storage().await;
    let alarms = AlarmsService::new(storage, None);
    let day = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();

    alarms.create_alarm(request("07:00")).await.unwrap();

    // One hour ahead
    let next = alarms.next_alarm(day.and_hms_opt(6, 0, 0).unwrap()).unwrap();
    assert_eq!(next.minutes_until, 60);
    assert_eq!(next.countdown(), "in 1h 0m");

    // Exactly now rolls over to tomorrow
    let next = alarms.next_alarm(day.and_hms_opt(7, 0, 0).unwrap()).unwrap();
    assert_eq!(next.minutes_until, 1440);
    assert_eq!(next.occurrence, day.succ_opt().unwrap().and_hms_opt(7, 0, 0).unwrap());
}

#[tokio::test]
async fn test_persisted_json_format() {
    let (storage, repo, _temp) = create_test_storage().await;
    let alarms = AlarmsService::new(storage.clone(), None);
    let settings = SettingsService::new(storage, Duration::from_secs(1));

    let mut req = request("6:05");
    req.repeat_days = RepeatDays::new([2]).unwrap();
    alarms.create_alarm(req).await.unwrap();
    settings.set_tag("04:A2:5B").await.unwrap();

    let raw = repo.get_value(KEY_ALARMS).await.unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let stored = &json[0];
    assert_eq!(stored["time"], "06:05");
    assert_eq!(stored["repeatDays"], serde_json::json!([2]));
    assert_eq!(stored["nfcRequired"], true);
    assert_eq!(stored["gradientTheme"], "dawn");

    let raw = repo.get_value(KEY_SETTINGS).await.unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["nfcTagId"], "04:A2:5B");
    assert_eq!(json["vibrationEnabled"], true);
    assert_eq!(json["theme"], "auto");
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nuveen.db");

    let alarm = {
        let pool = create_pool(&db_path).await.unwrap();
        let storage = Arc::new(KvStorage::new(Repository::new(pool.clone())));
        let alarms = AlarmsService::new(storage.clone(), None);
        let settings = SettingsService::new(storage, Duration::from_secs(1));

        settings.complete_onboarding().await.unwrap();
        let alarm = alarms.create_alarm(request("05:30")).await.unwrap();
        pool.close().await;
        alarm
    };

    let pool = create_pool(&db_path).await.unwrap();
    let storage = Arc::new(KvStorage::new(Repository::new(pool)));
    let alarms = AlarmsService::new(storage.clone(), None);
    let settings = SettingsService::new(storage, Duration::from_secs(1));

    assert_eq!(alarms.refresh().await, vec![alarm]);
    assert!(settings.is_onboarding_complete().await);
}

#[tokio::test]
async fn test_ringing_session_dismisses_with_registered_tag() {
    let (storage, _repo, temp) = create_test_storage().await;
    let alarms = AlarmsService::new(storage.clone(), None);
    let settings = SettingsService::new(storage.clone(), Duration::from_secs(5));

    let (reader, feed) = ChannelTagReader::new(4);
    let capability = NfcCapability::available(reader);

    // Register the tag through the reader
    let register = {
        let settings = settings.clone();
        let capability = capability.clone();
        tokio::spawn(async move { settings.register_tag(&capability).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    feed.present(Some("TAG-1".to_string())).await.unwrap();
    assert_eq!(register.await.unwrap().unwrap(), "TAG-1");

    let alarm = alarms.create_alarm(request("07:00")).await.unwrap();
    let alert = Arc::new(LogAlert::new());
    let config = AppConfig::new(temp.path().to_path_buf(), MatchMode::Strict);
    let session = Arc::new(
        RingingSession::begin(
            alarm.clone(),
            storage.clone() as Arc<dyn Storage>,
            capability,
            alert.clone(),
            &config,
        )
        .await,
    );
    assert!(alert.is_active());

    // Wrong tag first
    let scan = {
        let session = session.clone();
        tokio::spawn(async move { session.scan().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    feed.present(Some("TAG-2".to_string())).await.unwrap();
    match scan.await.unwrap().unwrap() {
        ScanOutcome::Rejected(validation) => {
            assert_eq!(validation.reason, ValidationReason::Mismatch)
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    assert_eq!(session.state().await, SessionState::Ringing);

    // Then the registered one
    let scan = {
        let session = session.clone();
        tokio::spawn(async move { session.scan().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    feed.present(Some("TAG-1".to_string())).await.unwrap();
    let log = match scan.await.unwrap().unwrap() {
        ScanOutcome::Dismissed(log) => log,
        other => panic!("expected dismissal, got {:?}", other),
    };

    assert_eq!(session.state().await, SessionState::Dismissed);
    assert!(!alert.is_active());

    let logs = settings.wake_logs().await.unwrap();
    assert_eq!(logs, vec![log]);
    assert_eq!(logs[0].alarm_id, alarm.id);
}
