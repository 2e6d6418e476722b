//! 5G VN group data types
//!
//! JSON shapes of `5GVnGroupConfiguration` and friends (TS 29.503 / 29.505),
//! the JSON-patch items exchanged with the UDR (TS 29.571) and the data change
//! notification delivered to subscribers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// S-NSSAI as carried on the SBI (`sd` is a 6 hex digit string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Snssai {
    pub sst: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sd: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PduSessionType {
    Ipv4,
    Ipv6,
    Ipv4v6,
    Unstructured,
    Ethernet,
}

/// Application descriptor; only the `appIds` keys matter for id allocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub app_ids: BTreeMap<String, String>,
}

/// `5gVnGroupData`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VnGroupData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dnn: Option<String>,
    #[serde(
        rename = "sNssai",
        alias = "singleNssai",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub s_nssai: Option<Snssai>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdu_session_types: Option<Vec<PduSessionType>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub app_descriptors: Vec<AppDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_auth: Option<bool>,
}

/// Multicast group descriptor, keyed by `multiGroupId`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MulticastGroup {
    pub multi_group_id: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl MulticastGroup {
    pub fn new(multi_group_id: impl Into<String>) -> Self {
        Self {
            multi_group_id: multi_group_id.into(),
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn to_json(&self) -> Value {
        let mut object = self.attributes.clone();
        object.insert(
            "multiGroupId".to_string(),
            Value::String(self.multi_group_id.clone()),
        );
        Value::Object(object)
    }
}

/// `5GVnGroupConfiguration`. The external group id travels in the URI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupConfiguration {
    #[serde(rename = "5gVnGroupData", default, skip_serializing_if = "Option::is_none")]
    pub vn_group_data: Option<VnGroupData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub af_instance_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_group_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtc_provider_information: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub multicast_group_list: Vec<MulticastGroup>,
}

impl GroupConfiguration {
    pub fn app_descriptors(&self) -> &[AppDescriptor] {
        self.vn_group_data
            .as_ref()
            .map(|data| data.app_descriptors.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOperation {
    Add,
    Copy,
    Move,
    Remove,
    Replace,
    Test,
}

/// One JSON-patch operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchItem {
    pub op: PatchOperation,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchItem {
    pub fn new(op: PatchOperation, path: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            op,
            path: path.into(),
            from: None,
            value,
        }
    }

    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self::new(PatchOperation::Add, path, Some(value))
    }

    pub fn remove(path: impl Into<String>, value: Value) -> Self {
        Self::new(PatchOperation::Remove, path, Some(value))
    }

    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self::new(PatchOperation::Replace, path, Some(value))
    }
}

/// Attribute that could not be (or must not be) changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportItem {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Body of a `200 OK` answer to a PATCH
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchResult {
    #[serde(default)]
    pub report: Vec<ReportItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Add,
    Move,
    Remove,
    Replace,
}

impl ChangeType {
    /// `copy` and `test` have no change-record counterpart
    pub fn from_operation(op: PatchOperation) -> Option<Self> {
        match op {
            PatchOperation::Add => Some(Self::Add),
            PatchOperation::Move => Some(Self::Move),
            PatchOperation::Remove => Some(Self::Remove),
            PatchOperation::Replace => Some(Self::Replace),
            PatchOperation::Copy | PatchOperation::Test => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeItem {
    pub op: ChangeType,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orig_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyItem {
    pub resource_id: String,
    pub changes: Vec<ChangeItem>,
}

/// Payload POSTed to a subscriber's callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataChangeNotify {
    pub notify_items: Vec<NotifyItem>,
}

/// Registration of a consumer for changes of one internal group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VnGroupSubscription {
    /// Callback receiving `DataChangeNotify`
    pub notification_uri: String,
    /// Path prefixes of interest; empty means every change
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub monitored_resource_uris: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_features: Option<String>,
    /// Resolved by the UDM from the group id map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_group_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UeId {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supi: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gpsi_list: Vec<String>,
}

impl UeId {
    /// `imsi-`/`nai-` members are SUPIs, anything else is taken as a GPSI
    pub fn from_member(member: &str) -> Self {
        if member.starts_with("imsi-") || member.starts_with("nai-") {
            Self {
                supi: Some(member.to_string()),
                gpsi_list: Vec::new(),
            }
        } else {
            Self {
                supi: None,
                gpsi_list: vec![member.to_string()],
            }
        }
    }
}

/// Answer of the group-identifiers lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupIdentifiers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub int_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ue_id_list: Vec<UeId>,
}

/// `PpDataEntry` kept in the UDR pp-data-store for one AF instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PpDataEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtc_provider_information: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_features: Option<String>,
    /// Remaining attributes, returned as stored
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_group_configuration_wire_names() {
        let body = json!({
            "5gVnGroupData": {
                "dnn": "internet",
                "sNssai": { "sst": 1, "sd": "010203" },
                "pduSessionTypes": ["IPV4", "ETHERNET"],
                "appDescriptors": [{ "osId": "os-1", "appIds": { "app-a": "1.0" } }]
            },
            "members": ["msisdn-0900000001", "imsi-208930000000001"],
            "afInstanceId": "af-1",
            "multicastGroupList": [{ "multiGroupId": "M1", "ipv4Addr": "239.0.0.1" }]
        });

        let config: GroupConfiguration = serde_json::from_value(body.clone()).unwrap();
        let data = config.vn_group_data.as_ref().unwrap();
        assert_eq!(data.dnn.as_deref(), Some("internet"));
        assert_eq!(
            data.pdu_session_types,
            Some(vec![PduSessionType::Ipv4, PduSessionType::Ethernet])
        );
        assert_eq!(config.app_descriptors()[0].app_ids.len(), 1);
        assert_eq!(config.multicast_group_list[0].multi_group_id, "M1");
        assert_eq!(
            config.multicast_group_list[0].attributes.get("ipv4Addr"),
            Some(&json!("239.0.0.1"))
        );

        assert_eq!(serde_json::to_value(&config).unwrap(), body);
    }

    #[test]
    fn test_single_nssai_alias() {
        let data: VnGroupData =
            serde_json::from_value(json!({ "singleNssai": { "sst": 2 } })).unwrap();
        assert_eq!(data.s_nssai, Some(Snssai { sst: 2, sd: None }));
    }

    #[test]
    fn test_patch_item_serialization() {
        let item = PatchItem::add("/internalGroupIds", json!(["UE-C"]));
        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            json!({ "op": "add", "path": "/internalGroupIds", "value": ["UE-C"] })
        );
    }

    #[test]
    fn test_multicast_to_json_keeps_attributes() {
        let group = MulticastGroup::new("M2").with_attribute("ipv6Addr", json!("ff0e::1"));
        assert_eq!(group.to_json(), json!({ "multiGroupId": "M2", "ipv6Addr": "ff0e::1" }));
    }

    #[test]
    fn test_change_type_from_operation() {
        assert_eq!(ChangeType::from_operation(PatchOperation::Add), Some(ChangeType::Add));
        assert_eq!(ChangeType::from_operation(PatchOperation::Test), None);
        assert_eq!(serde_json::to_value(ChangeType::Replace).unwrap(), json!("REPLACE"));
    }

    #[test]
    fn test_ue_id_from_member() {
        assert_eq!(
            UeId::from_member("imsi-208930000000001").supi.as_deref(),
            Some("imsi-208930000000001")
        );
        assert_eq!(UeId::from_member("msisdn-0900").gpsi_list, vec!["msisdn-0900"]);
    }
}
