//! Shared fixtures: an in-process UDR double and a recording notification sender

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nextgcore_udm_ppd::model::{
    DataChangeNotify, GroupConfiguration, PatchItem, PatchResult, PpDataEntry,
};
use nextgcore_udm_ppd::{
    EngineOptions, GroupDataRepository, GroupProvisioningEngine, IdentifierAllocator,
    NotificationDispatcher, NotificationSender, NotifyError, PatchOutcome, PlmnId,
    RepositoryError, SubscriptionRegistry, UdmPpContext,
};
use ogs_dbi::MemoryGroupIdMapStore;

pub const EXT_ID: &str = "EXT-1";

/// UDR double keeping groups in memory and recording every call
#[derive(Default)]
pub struct MockUdr {
    subscribers: HashSet<String>,
    pub groups: Mutex<HashMap<String, GroupConfiguration>>,
    pub calls: Mutex<Vec<String>>,
    pub patches: Mutex<Vec<(Vec<PatchItem>, Option<String>)>>,
    pub put_failure: Mutex<Option<RepositoryError>>,
    pub delete_failure: Mutex<Option<RepositoryError>>,
    /// Store one member less than submitted
    pub drop_member_on_put: Mutex<bool>,
    pub patch_result: Mutex<Option<PatchResult>>,
    /// pp-data-store entries keyed by AF instance id
    pub pp_data: Mutex<HashMap<String, PpDataEntry>>,
}

impl MockUdr {
    pub fn with_subscribers(subscribers: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            subscribers: subscribers.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn group(&self, ext_group_id: &str) -> Option<GroupConfiguration> {
        self.groups.lock().unwrap().get(ext_group_id).cloned()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

fn not_found(detail: String) -> RepositoryError {
    RepositoryError::Remote {
        status: 404,
        cause: Some("DATA_NOT_FOUND".to_string()),
        detail,
    }
}

#[async_trait]
impl GroupDataRepository for MockUdr {
    async fn get_member_subscription(&self, ue_id: &str) -> Result<(), RepositoryError> {
        self.record(format!("GET am-data {}", ue_id));
        if self.subscribers.contains(ue_id) {
            Ok(())
        } else {
            Err(RepositoryError::Remote {
                status: 404,
                cause: Some("USER_NOT_FOUND".to_string()),
                detail: format!("{} has no am-data", ue_id),
            })
        }
    }

    async fn put_group(
        &self,
        ext_group_id: &str,
        config: &GroupConfiguration,
    ) -> Result<GroupConfiguration, RepositoryError> {
        self.record(format!("PUT {}", ext_group_id));
        if let Some(err) = self.put_failure.lock().unwrap().clone() {
            return Err(err);
        }
        let mut stored = config.clone();
        if *self.drop_member_on_put.lock().unwrap() {
            stored.members.pop();
        }
        self.groups
            .lock()
            .unwrap()
            .insert(ext_group_id.to_string(), stored.clone());
        Ok(stored)
    }

    async fn get_group(&self, ext_group_id: &str) -> Result<GroupConfiguration, RepositoryError> {
        self.record(format!("GET {}", ext_group_id));
        self.group(ext_group_id)
            .ok_or_else(|| not_found(format!("{} not found", ext_group_id)))
    }

    async fn patch_group(
        &self,
        ext_group_id: &str,
        patches: &[PatchItem],
        supported_features: Option<&str>,
    ) -> Result<PatchOutcome, RepositoryError> {
        self.record(format!("PATCH {}", ext_group_id));
        self.patches
            .lock()
            .unwrap()
            .push((patches.to_vec(), supported_features.map(str::to_string)));
        let result = self.patch_result.lock().unwrap().clone();
        Ok(PatchOutcome {
            status: if result.is_some() { 200 } else { 204 },
            result,
        })
    }

    async fn delete_group(&self, ext_group_id: &str) -> Result<(), RepositoryError> {
        self.record(format!("DELETE {}", ext_group_id));
        if let Some(err) = self.delete_failure.lock().unwrap().clone() {
            return Err(err);
        }
        self.groups
            .lock()
            .unwrap()
            .remove(ext_group_id)
            .map(|_| ())
            .ok_or_else(|| not_found(format!("{} not found", ext_group_id)))
    }

    async fn get_pp_data_entry(
        &self,
        ue_id: &str,
        af_instance_id: &str,
        _supported_features: Option<&str>,
    ) -> Result<PpDataEntry, RepositoryError> {
        self.record(format!("GET pp-data-store {}/{}", ue_id, af_instance_id));
        self.pp_data
            .lock()
            .unwrap()
            .get(af_instance_id)
            .cloned()
            .ok_or_else(|| not_found(format!("no PP data for {}", af_instance_id)))
    }
}

/// Records notifications, optionally failing every delivery
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<(String, DataChangeNotify)>>,
    pub fail: bool,
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send(&self, callback_uri: &str, notification: &DataChangeNotify) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Unreachable {
                uri: callback_uri.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((callback_uri.to_string(), notification.clone()));
        Ok(())
    }
}

pub struct Harness {
    pub engine: GroupProvisioningEngine,
    pub udr: Arc<MockUdr>,
    pub store: Arc<MemoryGroupIdMapStore>,
    pub sender: Arc<RecordingSender>,
}

pub fn harness_with(udr: Arc<MockUdr>, sender: RecordingSender, options: EngineOptions) -> Harness {
    let context = Arc::new(UdmPpContext::new(PlmnId::new("208", "93"), HashMap::new()));
    let store = Arc::new(MemoryGroupIdMapStore::new());
    let sender = Arc::new(sender);
    let engine = GroupProvisioningEngine::new(
        udr.clone(),
        IdentifierAllocator::new(context, store.clone()),
        NotificationDispatcher::new(Arc::new(SubscriptionRegistry::new()), sender.clone())
            .with_timeout(Duration::from_millis(500)),
    )
    .with_options(options);

    Harness {
        engine,
        udr,
        store,
        sender,
    }
}

pub fn harness(subscribers: &[&str]) -> Harness {
    harness_with(
        MockUdr::with_subscribers(subscribers),
        RecordingSender::default(),
        EngineOptions::default(),
    )
}

pub fn group_config(members: &[&str]) -> GroupConfiguration {
    serde_json::from_value(serde_json::json!({
        "5gVnGroupData": {
            "dnn": "internet",
            "sNssai": { "sst": 1, "sd": "010203" },
            "pduSessionTypes": ["IPV4"]
        },
        "members": members,
        "afInstanceId": "af-1",
        "multicastGroupList": [{ "multiGroupId": "M1" }]
    }))
    .unwrap()
}
