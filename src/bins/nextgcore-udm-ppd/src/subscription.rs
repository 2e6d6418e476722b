//! VN group configuration subscriptions
//!
//! One subscription per internal group id; a new subscription for the same
//! group replaces the previous one. Subscriptions live as long as the process.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::model::VnGroupSubscription;

const SUBSCRIPTIONS_BASE: &str = "/nudm-pp/v1/vn5glan-subscriptions/subs";

/// Resource location of the subscription for `group_id`
pub fn subscription_location(group_id: &str) -> String {
    format!("{}/{}", SUBSCRIPTIONS_BASE, group_id)
}

#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    subscriptions: RwLock<HashMap<String, VnGroupSubscription>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) the subscription and return its location
    pub async fn subscribe(&self, group_id: &str, subscription: VnGroupSubscription) -> String {
        let mut subscriptions = self.subscriptions.write().await;
        if subscriptions
            .insert(group_id.to_string(), subscription)
            .is_some()
        {
            log::debug!("[{}] subscription replaced", group_id);
        }
        log::info!("[{}] subscription stored ({} total)", group_id, subscriptions.len());
        subscription_location(group_id)
    }

    pub async fn lookup(&self, group_id: &str) -> Option<VnGroupSubscription> {
        self.subscriptions.read().await.get(group_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscriptions.read().await.is_empty()
    }
}
