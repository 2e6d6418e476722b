//! Data change notifications to VN group subscribers

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{ChangeItem, ChangeType, DataChangeNotify, NotifyItem, PatchItem, VnGroupSubscription};
use crate::subscription::SubscriptionRegistry;

pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotifyError {
    #[error("{uri} rejected the notification ({status})")]
    Rejected { uri: String, status: u16 },
    #[error("{uri} unreachable: {reason}")]
    Unreachable { uri: String, reason: String },
    #[error("notification timed out")]
    Timeout,
}

/// Delivers a payload to a subscriber callback
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, callback_uri: &str, notification: &DataChangeNotify) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotifyOutcome {
    NoSubscriber,
    /// Every change was outside the subscription's monitored resources
    Filtered,
    Delivered { callback_uri: String, changes: usize },
}

fn to_change(item: &PatchItem) -> Option<ChangeItem> {
    let op = ChangeType::from_operation(item.op)?;
    let (orig_value, new_value) = match op {
        ChangeType::Remove => (item.value.clone(), None),
        _ => (None, item.value.clone()),
    };
    Some(ChangeItem {
        op,
        path: item.path.clone(),
        from: item.from.clone(),
        orig_value,
        new_value,
    })
}

fn is_monitored(subscription: &VnGroupSubscription, resource_id: &str, path: &str) -> bool {
    if subscription.monitored_resource_uris.is_empty() {
        return true;
    }
    let full = format!("{}{}", resource_id, path);
    subscription
        .monitored_resource_uris
        .iter()
        .any(|prefix| path.starts_with(prefix.as_str()) || full.starts_with(prefix.as_str()))
}

/// Payload for `subscription`, `None` when nothing survives the filter
pub fn build_notification(
    subscription: &VnGroupSubscription,
    resource_id: &str,
    patches: &[PatchItem],
) -> Option<DataChangeNotify> {
    let changes: Vec<ChangeItem> = patches
        .iter()
        .filter(|item| is_monitored(subscription, resource_id, &item.path))
        .filter_map(to_change)
        .collect();
    if changes.is_empty() {
        return None;
    }
    Some(DataChangeNotify {
        notify_items: vec![NotifyItem {
            resource_id: resource_id.to_string(),
            changes,
        }],
    })
}

pub struct NotificationDispatcher {
    registry: Arc<SubscriptionRegistry>,
    sender: Arc<dyn NotificationSender>,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(registry: Arc<SubscriptionRegistry>, sender: Arc<dyn NotificationSender>) -> Self {
        Self {
            registry,
            sender,
            timeout: DEFAULT_NOTIFY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Notify the subscriber of `group_id`, if any, about `patches`.
    pub async fn notify(
        &self,
        group_id: &str,
        resource_id: &str,
        patches: &[PatchItem],
    ) -> Result<NotifyOutcome, NotifyError> {
        let Some(subscription) = self.registry.lookup(group_id).await else {
            log::debug!("[{}] no subscriber", group_id);
            return Ok(NotifyOutcome::NoSubscriber);
        };
        let Some(notification) = build_notification(&subscription, resource_id, patches) else {
            log::debug!("[{}] no monitored change", group_id);
            return Ok(NotifyOutcome::Filtered);
        };

        let uri = subscription.notification_uri;
        let changes = notification
            .notify_items
            .iter()
            .map(|item| item.changes.len())
            .sum();
        log::info!("[{}] notifying {} ({} change(s))", group_id, uri, changes);

        tokio::time::timeout(self.timeout, self.sender.send(&uri, &notification))
            .await
            .map_err(|_| NotifyError::Timeout)??;

        Ok(NotifyOutcome::Delivered {
            callback_uri: uri,
            changes,
        })
    }
}
