//! Settings service
//!
//! Manages installation settings, tag registration and onboarding state.

use crate::database::{GradientStyle, Settings, Theme, WakeLog};
use crate::error::{AppError, Result};
use crate::platform::NfcCapability;
use crate::storage::Storage;
use std::sync::Arc;
use std::time::Duration;

/// Service for managing settings
#[derive(Clone)]
pub struct SettingsService {
    storage: Arc<dyn Storage>,
    scan_timeout: Duration,
}

impl SettingsService {
    pub fn new(storage: Arc<dyn Storage>, scan_timeout: Duration) -> Self {
        Self {
            storage,
            scan_timeout,
        }
    }

    /// Load settings, persisting the defaults on first read
    pub async fn load(&self) -> Result<Settings> {
        let settings = self.storage.get_settings().await?;

        if settings == Settings::default() {
            // Persist defaults so the record exists after first launch
            self.storage.save_settings(&settings).await?;
        }

        Ok(settings)
    }

    /// Save settings
    pub async fn save(&self, settings: &Settings) -> Result<()> {
        self.storage.save_settings(settings).await?;
        tracing::info!("Settings saved");
        Ok(())
    }

    async fn update(&self, apply: impl FnOnce(&mut Settings)) -> Result<Settings> {
        let mut settings = self.load().await?;
        apply(&mut settings);
        self.save(&settings).await?;
        Ok(settings)
    }

    /// Scan a tag and register it as the dismissal tag
    pub async fn register_tag(&self, capability: &NfcCapability) -> Result<String> {
        tracing::info!("Registering NFC tag");

        let tag = capability
            .scan_tag(self.scan_timeout)
            .await?
            .ok_or_else(|| AppError::ScanFailed("Could not read NFC tag".to_string()))?;

        self.set_tag(&tag).await?;
        Ok(tag)
    }

    /// Store a tag identifier as the dismissal tag
    pub async fn set_tag(&self, tag: &str) -> Result<()> {
        let tag = tag.to_string();
        self.update(|s| s.nfc_tag_id = Some(tag)).await?;
        tracing::info!("NFC tag registered");
        Ok(())
    }

    /// Forget the registered tag; any tag will dismiss alarms afterwards
    pub async fn remove_tag(&self) -> Result<()> {
        self.update(|s| s.nfc_tag_id = None).await?;
        tracing::info!("NFC tag removed");
        Ok(())
    }

    pub async fn set_vibration(&self, enabled: bool) -> Result<Settings> {
        self.update(|s| s.vibration_enabled = enabled).await
    }

    pub async fn set_gradient_style(&self, style: GradientStyle) -> Result<Settings> {
        self.update(|s| s.gradient_style = style).await
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<Settings> {
        self.update(|s| s.theme = theme).await
    }

    pub async fn is_onboarding_complete(&self) -> bool {
        match self.storage.is_onboarding_complete().await {
            Ok(complete) => complete,
            Err(e) => {
                tracing::error!("Error checking onboarding: {}", e);
                false
            }
        }
    }

    pub async fn complete_onboarding(&self) -> Result<()> {
        self.storage.set_onboarding_complete().await?;
        tracing::info!("Onboarding complete");
        Ok(())
    }

    /// Wake history, oldest first
    pub async fn wake_logs(&self) -> Result<Vec<WakeLog>> {
        self.storage.get_wake_logs().await
    }
}
