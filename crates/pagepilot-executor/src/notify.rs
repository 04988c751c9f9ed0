//! Notification sink. Fire-and-forget: a failing sink never fails a step.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{error, info, warn};

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifySeverity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub severity: NotifySeverity,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Notification {
    pub fn new(
        severity: NotifySeverity,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            title: title.into(),
            body: body.into(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Where notifications go. Implementations must not block for long.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Default sink: notifications become tracing records.
pub struct TracingNotifier;

#[async_trait]
impl NotificationSink for TracingNotifier {
    async fn notify(&self, n: &Notification) -> Result<()> {
        match n.severity {
            NotifySeverity::Info | NotifySeverity::Success => {
                info!("[notify] {}: {}", n.title, n.body)
            }
            NotifySeverity::Warning => warn!("[notify] {}: {}", n.title, n.body),
            NotifySeverity::Error => error!("[notify] {}: {}", n.title, n.body),
        }
        Ok(())
    }
}

/// Collects notifications in memory, in order. For tests and embedding.
#[derive(Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.title.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationSink for MemoryNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_notifier_preserves_order() {
        let sink = MemoryNotifier::new();
        sink.notify(&Notification::new(NotifySeverity::Info, "a", ""))
            .await
            .unwrap();
        sink.notify(&Notification::new(NotifySeverity::Error, "b", ""))
            .await
            .unwrap();
        assert_eq!(sink.titles(), vec!["a".to_string(), "b".to_string()]);
    }
}
