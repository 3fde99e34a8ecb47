//! NFC tag reading
//!
//! Whether tag hardware exists is decided once at startup and captured in
//! [`NfcCapability`]; nothing probes for the reader per call.

use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// A source of tag identifiers.
///
/// `read_tag` waits until a tag is presented. Dropping the returned future
/// must stop listening, so a cancelled scan never delivers a late tag.
#[async_trait]
pub trait TagReader: Send + Sync {
    /// Identifier of the next presented tag, or `None` when the tag carried
    /// no readable data.
    async fn read_tag(&self) -> Result<Option<String>>;
}

/// Tag hardware as detected at startup
#[derive(Clone)]
pub enum NfcCapability {
    Available(Arc<dyn TagReader>),
    Unavailable,
}

impl NfcCapability {
    pub fn available(reader: impl TagReader + 'static) -> Self {
        NfcCapability::Available(Arc::new(reader))
    }

    pub fn is_available(&self) -> bool {
        matches!(self, NfcCapability::Available(_))
    }

    /// Read one tag, failing with `ScanTimeout` once `timeout` elapses
    pub async fn scan_tag(&self, timeout: Duration) -> Result<Option<String>> {
        let reader = match self {
            NfcCapability::Available(reader) => reader,
            NfcCapability::Unavailable => return Err(AppError::HardwareUnavailable),
        };

        tracing::debug!("Waiting up to {:?} for NFC tag", timeout);

        match tokio::time::timeout(timeout, reader.read_tag()).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("NFC scan timed out after {:?}", timeout);
                Err(AppError::ScanTimeout)
            }
        }
    }
}

impl std::fmt::Debug for NfcCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NfcCapability::Available(_) => f.write_str("Available"),
            NfcCapability::Unavailable => f.write_str("Unavailable"),
        }
    }
}

/// Tag reader fed through a channel.
///
/// Identifiers queued while no scan is active are discarded when the next
/// scan starts, so only tags presented during a scan count.
pub struct ChannelTagReader {
    rx: Mutex<mpsc::Receiver<Option<String>>>,
}

/// Sending half of a [`ChannelTagReader`]
#[derive(Clone)]
pub struct TagFeed {
    tx: mpsc::Sender<Option<String>>,
}

impl ChannelTagReader {
    pub fn new(buffer: usize) -> (Self, TagFeed) {
        let (tx, rx) = mpsc::channel(buffer);
        (
            Self { rx: Mutex::new(rx) },
            TagFeed { tx },
        )
    }
}

#[async_trait]
impl TagReader for ChannelTagReader {
    async fn read_tag(&self) -> Result<Option<String>> {
        let mut rx = self.rx.lock().await;

        while let Ok(stale) = rx.try_recv() {
            tracing::debug!("Discarding tag presented outside a scan: {:?}", stale);
        }

        match rx.recv().await {
            Some(tag) => {
                tracing::info!("NFC tag read: {:?}", tag);
                Ok(tag)
            }
            None => Err(AppError::HardwareUnavailable),
        }
    }
}

impl TagFeed {
    /// Present a tag to the reader. `None` simulates a tag without data.
    pub async fn present(&self, tag: Option<String>) -> Result<()> {
        self.tx
            .send(tag)
            .await
            .map_err(|_| AppError::Generic("Tag reader has shut down".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_capability() {
        let capability = NfcCapability::Unavailable;
        assert!(!capability.is_available());

        let result = capability.scan_tag(Duration::from_secs(1)).await;
        assert!(matches!(result, Err(AppError::HardwareUnavailable)));
    }

    #[tokio::test]
    async fn test_scan_reads_presented_tag() {
        let (reader, feed) = ChannelTagReader::new(4);
        let capability = NfcCapability::available(reader);

        let scan = tokio::spawn(async move { capability.scan_tag(Duration::from_secs(5)).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        feed.present(Some("ABC123".to_string())).await.unwrap();

        let tag = scan.await.unwrap().unwrap();
        assert_eq!(tag.as_deref(), Some("ABC123"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_times_out() {
        let (reader, _feed) = ChannelTagReader::new(4);
        let capability = NfcCapability::available(reader);

        let result = capability.scan_tag(Duration::from_secs(30)).await;
        assert!(matches!(result, Err(AppError::ScanTimeout)));
    }

    #[tokio::test]
    async fn test_stale_tags_are_discarded() {
        let (reader, feed) = ChannelTagReader::new(4);
        feed.present(Some("OLD".to_string())).await.unwrap();

        let capability = NfcCapability::available(reader);
        let scan = tokio::spawn(async move { capability.scan_tag(Duration::from_secs(5)).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        feed.present(Some("NEW".to_string())).await.unwrap();

        let tag = scan.await.unwrap().unwrap();
        assert_eq!(tag.as_deref(), Some("NEW"));
    }

    #[tokio::test]
    async fn test_closed_feed_reports_unavailable() {
        let (reader, feed) = ChannelTagReader::new(1);
        drop(feed);

        let result = reader.read_tag().await;
        assert!(matches!(result, Err(AppError::HardwareUnavailable)));
    }
}
