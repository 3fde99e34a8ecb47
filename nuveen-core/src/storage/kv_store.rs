//! Key/value storage
//!
//! Each collection is serialized to JSON and stored as a single blob under
//! a fixed key, matching the layout the mobile app kept in its device
//! key/value store.

use super::Storage;
use crate::config::{KEY_ALARMS, KEY_ONBOARDING_COMPLETE, KEY_SETTINGS, KEY_WAKE_LOGS};
use crate::database::{Alarm, Repository, Settings, WakeLog};
use crate::error::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Storage backed by the SQLite key/value table
#[derive(Clone)]
pub struct KvStorage {
    repo: Repository,
}

impl KvStorage {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.repo.get_value(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.repo.set_value(key, &raw).await
    }
}

#[async_trait]
impl Storage for KvStorage {
    async fn get_alarms(&self) -> Result<Vec<Alarm>> {
        Ok(self.read_json(KEY_ALARMS).await?.unwrap_or_default())
    }

    async fn save_alarms(&self, alarms: &[Alarm]) -> Result<()> {
        self.write_json(KEY_ALARMS, alarms).await?;
        tracing::debug!("Saved {} alarms", alarms.len());
        Ok(())
    }

    async fn get_settings(&self) -> Result<Settings> {
        Ok(self.read_json(KEY_SETTINGS).await?.unwrap_or_default())
    }

    async fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.write_json(KEY_SETTINGS, settings).await
    }

    async fn add_wake_log(&self, log: &WakeLog) -> Result<()> {
        let mut logs = self.get_wake_logs().await?;
        logs.push(log.clone());
        self.write_json(KEY_WAKE_LOGS, &logs).await?;
        tracing::debug!("Appended wake log {} for alarm {}", log.id, log.alarm_id);
        Ok(())
    }

    async fn get_wake_logs(&self) -> Result<Vec<WakeLog>> {
        Ok(self.read_json(KEY_WAKE_LOGS).await?.unwrap_or_default())
    }

    async fn is_onboarding_complete(&self) -> Result<bool> {
        let value = self.repo.get_value(KEY_ONBOARDING_COMPLETE).await?;
        Ok(value.as_deref() == Some("true"))
    }

    async fn set_onboarding_complete(&self) -> Result<()> {
        self.repo.set_value(KEY_ONBOARDING_COMPLETE, "true").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{initialize_database, CreateAlarmRequest};
    use crate::storage::{alarms_or_empty, settings_or_default};
    use chrono::Local;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_storage() -> (KvStorage, Repository) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();
        let repo = Repository::new(pool);

        (KvStorage::new(repo.clone()), repo)
    }

    #[tokio::test]
    async fn test_empty_storage_defaults() {
        let (storage, _repo) = create_test_storage().await;

        assert!(storage.get_alarms().await.unwrap().is_empty());
        assert_eq!(storage.get_settings().await.unwrap(), Settings::default());
        assert!(storage.get_wake_logs().await.unwrap().is_empty());
        assert!(!storage.is_onboarding_complete().await.unwrap());
    }

    #[tokio::test]
    async fn test_alarms_persist_under_namespaced_key() {
        let (storage, repo) = create_test_storage().await;

        let alarm = Alarm::from_request(CreateAlarmRequest::new("07:00".parse().unwrap()));
        storage.save_alarms(&[alarm.clone()]).await.unwrap();

        let loaded = storage.get_alarms().await.unwrap();
        assert_eq!(loaded, vec![alarm]);

        let raw = repo.get_value("@nuveen:alarms").await.unwrap().unwrap();
        assert!(raw.contains("\"repeatDays\":[]"));
        assert!(raw.contains("\"time\":\"07:00\""));
    }

    #[tokio::test]
    async fn test_wake_logs_append_in_order() {
        let (storage, _repo) = create_test_storage().await;

        let first = WakeLog::record("a", Local::now());
        let second = WakeLog::record("b", Local::now());
        storage.add_wake_log(&first).await.unwrap();
        storage.add_wake_log(&second).await.unwrap();

        let logs = storage.get_wake_logs().await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].alarm_id, "a");
        assert_eq!(logs[1].alarm_id, "b");
    }

    #[tokio::test]
    async fn test_onboarding_flag() {
        let (storage, repo) = create_test_storage().await;

        repo.set_value("@nuveen:onboarding_complete", "yes").await.unwrap();
        assert!(!storage.is_onboarding_complete().await.unwrap());

        storage.set_onboarding_complete().await.unwrap();
        assert!(storage.is_onboarding_complete().await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_blob_falls_back() {
        let (storage, repo) = create_test_storage().await;

        repo.set_value("@nuveen:settings", "{not json").await.unwrap();
        repo.set_value("@nuveen:alarms", "[{\"id\":1}]").await.unwrap();

        assert!(storage.get_settings().await.unwrap_err().is_storage());
        assert_eq!(settings_or_default(&storage).await, Settings::default());
        assert!(alarms_or_empty(&storage).await.is_empty());
    }
}
