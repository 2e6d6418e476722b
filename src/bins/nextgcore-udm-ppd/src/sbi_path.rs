//! UDM PP SBI path
//!
//! Server side: the Nudm_PP HTTP/2 server. Client side: delivery of data
//! change notifications to subscriber callbacks.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ogs_sbi::{SbiClient, SbiError, SbiRequest, SbiResult, SbiServer, SbiServerConfig};
use tokio::sync::Mutex;

use crate::model::DataChangeNotify;
use crate::notify::{NotificationSender, NotifyError};
use crate::nudm_pp_handler::dispatch;
use crate::vn_group::GroupProvisioningEngine;

/// Start the Nudm_PP server on `addr`
pub async fn pp_sbi_open(engine: Arc<GroupProvisioningEngine>, addr: SocketAddr) -> SbiResult<SbiServer> {
    log::info!("Opening UDM PP SBI server on {}", addr);
    let server = SbiServer::new(SbiServerConfig::new(addr));
    server
        .start(move |request: SbiRequest| {
            let engine = engine.clone();
            async move { dispatch(&engine, request).await }
        })
        .await?;
    Ok(server)
}

pub async fn pp_sbi_close(server: &SbiServer) -> SbiResult<()> {
    server.stop().await?;
    log::info!("UDM PP SBI server closed");
    Ok(())
}

/// Callback clients kept at most
pub const DEFAULT_MAX_CALLBACK_CLIENTS: usize = 64;

/// POSTs notifications over HTTP/2, one client per callback authority.
/// A client whose exchange fails is dropped and redialled on next use.
pub struct SbiNotificationSender {
    request_timeout: Duration,
    max_clients: usize,
    clients: Mutex<HashMap<String, Arc<SbiClient>>>,
}

impl SbiNotificationSender {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            request_timeout,
            max_clients: DEFAULT_MAX_CALLBACK_CLIENTS,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = max_clients.max(1);
        self
    }

    async fn client_for(&self, callback_uri: &str) -> SbiResult<Arc<SbiClient>> {
        let client = SbiClient::for_uri(callback_uri, self.request_timeout)?;
        let key = client.config().base_uri();
        let mut clients = self.clients.lock().await;
        if let Some(cached) = clients.get(&key) {
            return Ok(cached.clone());
        }

        if clients.len() >= self.max_clients {
            if let Some(evicted) = clients.keys().next().cloned() {
                log::debug!("Callback client cache full, dropping {}", evicted);
                clients.remove(&evicted);
            }
        }
        let client = Arc::new(client);
        clients.insert(key, client.clone());
        Ok(client)
    }

    async fn forget(&self, client: &SbiClient) {
        let key = client.config().base_uri();
        if self.clients.lock().await.remove(&key).is_some() {
            log::debug!("Callback client {} dropped", key);
        }
    }
}

#[async_trait]
impl NotificationSender for SbiNotificationSender {
    async fn send(&self, callback_uri: &str, notification: &DataChangeNotify) -> Result<(), NotifyError> {
        let unreachable = |e: SbiError| match e {
            SbiError::Timeout => NotifyError::Timeout,
            other => NotifyError::Unreachable {
                uri: callback_uri.to_string(),
                reason: other.to_string(),
            },
        };

        let client = self.client_for(callback_uri).await.map_err(unreachable)?;
        let request = SbiRequest::post(callback_uri)
            .with_json_body(notification)
            .map_err(|e| unreachable(e.into()))?;
        let response = match client.send_request(request).await {
            Ok(response) => response,
            Err(e) => {
                self.forget(&client).await;
                return Err(unreachable(e));
            }
        };

        if response.is_success() {
            log::debug!("Notification to {} accepted ({})", callback_uri, response.status);
            Ok(())
        } else {
            Err(NotifyError::Rejected {
                uri: callback_uri.to_string(),
                status: response.status,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NotifyItem;

    fn notification() -> DataChangeNotify {
        DataChangeNotify {
            notify_items: vec![NotifyItem {
                resource_id: "/nudm-pp/v1/5g-vn-groups/EXT-1".to_string(),
                changes: Vec::new(),
            }],
        }
    }

    #[tokio::test]
    async fn test_client_cache_per_authority() {
        let sender = SbiNotificationSender::new(Duration::from_millis(100));
        let a = sender.client_for("http://nef.local:8080/cb/1").await.unwrap();
        let b = sender.client_for("http://nef.local:8080/cb/2").await.unwrap();
        let c = sender.client_for("http://af.local/cb").await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(sender.clients.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_client_cache_is_bounded() {
        let sender = SbiNotificationSender::new(Duration::from_millis(100)).with_max_clients(2);
        sender.client_for("http://nef-1.local/cb").await.unwrap();
        sender.client_for("http://nef-2.local/cb").await.unwrap();
        sender.client_for("http://nef-3.local/cb").await.unwrap();

        let clients = sender.clients.lock().await;
        assert_eq!(clients.len(), 2);
        assert!(clients.contains_key("http://nef-3.local:80"));
    }

    #[tokio::test]
    async fn test_failed_client_is_dropped() {
        let sender = SbiNotificationSender::new(Duration::from_millis(200));
        let err = sender
            .send("http://127.0.0.1:1/cb", &notification())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NotifyError::Unreachable { .. } | NotifyError::Timeout
        ));
        assert!(sender.clients.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_callback_uri() {
        let sender = SbiNotificationSender::new(Duration::from_millis(100));
        let err = sender.send("not a uri", &notification()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn test_https_callback_is_unreachable() {
        let sender = SbiNotificationSender::new(Duration::from_millis(100));
        let err = sender
            .send("https://nef.local/cb", &notification())
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Unreachable { .. }));
    }
}
