//! 5G VN group configuration diff
//!
//! Turns a (stored, requested) configuration pair into
//! - the JSON-patch list sent to the UDR,
//! - the attributes whose change is forbidden after initial provisioning,
//! - the JSON-patch list announced to subscribed network functions.
//!
//! Members and multicast groups compare as sets. Only multicast additions are
//! announced to subscribers; removed or modified groups reach the UDR but no
//! notification is produced for them.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::model::{GroupConfiguration, MulticastGroup, PatchItem, ReportItem, VnGroupData};

pub const PDU_SESSION_TYPES_PATH: &str = "/5gVnGroupData/pduSessionTypes/-";
pub const DNN_PATH: &str = "/5gVnGroupData/dnn";
pub const SNSSAI_PATH: &str = "/5gVnGroupData/sNssai";
pub const INTERNAL_GROUP_ID_PATH: &str = "/internalGroupIdentifier";
pub const INTERNAL_GROUP_IDS_PATH: &str = "/internalGroupIds";
pub const MEMBERS_PATH: &str = "/members";
pub const MULTICAST_GROUP_LIST_PATH: &str = "/multicastGroupList";
pub const MULTICAST_GROUP_APPEND_PATH: &str = "/multicastGroupList/-";

const IMMUTABLE_REASON: &str = "refer to TS23.501 v17.7.0 section 5.29.2: \
     the attribute cannot be modified after the initial provisioning";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDiff {
    pub repo_patches: Vec<PatchItem>,
    pub forbidden: Vec<ReportItem>,
    pub notify_patches: Vec<PatchItem>,
    pub multicast_changed: bool,
}

impl ConfigDiff {
    pub fn is_empty(&self) -> bool {
        self.repo_patches.is_empty() && self.forbidden.is_empty() && self.notify_patches.is_empty()
    }
}

fn forbidden(path: &str) -> ReportItem {
    ReportItem {
        path: path.to_string(),
        reason: Some(IMMUTABLE_REASON.to_string()),
    }
}

fn string_array(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

/// Entries of `source` absent from `other`, first occurrence order, no repeats
fn set_difference(source: &[String], other: &[String]) -> Vec<String> {
    let other: HashSet<&str> = other.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    source
        .iter()
        .filter(|item| !other.contains(item.as_str()) && seen.insert(item.as_str()))
        .cloned()
        .collect()
}

fn immutable_changes(old: Option<&VnGroupData>, new: Option<&VnGroupData>, out: &mut Vec<ReportItem>) {
    let pdu_types = |data: Option<&VnGroupData>| {
        data.and_then(|d| d.pdu_session_types.as_ref())
            .map(|types| types.iter().copied().collect::<HashSet<_>>())
    };
    if pdu_types(old) != pdu_types(new) {
        out.push(forbidden(PDU_SESSION_TYPES_PATH));
    }
    if old.and_then(|d| d.dnn.as_ref()) != new.and_then(|d| d.dnn.as_ref()) {
        out.push(forbidden(DNN_PATH));
    }
    if old.and_then(|d| d.s_nssai.as_ref()) != new.and_then(|d| d.s_nssai.as_ref()) {
        out.push(forbidden(SNSSAI_PATH));
    }
}

fn by_id(groups: &[MulticastGroup]) -> HashMap<&str, &MulticastGroup> {
    let mut map = HashMap::new();
    for group in groups {
        map.entry(group.multi_group_id.as_str()).or_insert(group);
    }
    map
}

fn has_repeated_ids(groups: &[MulticastGroup]) -> bool {
    let mut seen = HashSet::new();
    groups.iter().any(|group| !seen.insert(group.multi_group_id.as_str()))
}

/// Set comparison keyed by `multiGroupId`; a list repeating an id is
/// compared entry by entry instead, so no repeat goes unseen.
fn multicast_differs(
    old: &[MulticastGroup],
    new: &[MulticastGroup],
    old_groups: &HashMap<&str, &MulticastGroup>,
    new_groups: &HashMap<&str, &MulticastGroup>,
) -> bool {
    if has_repeated_ids(old) || has_repeated_ids(new) {
        old != new
    } else {
        old_groups != new_groups
    }
}

/// Diff a stored configuration against the requested one.
pub fn diff(old: &GroupConfiguration, new: &GroupConfiguration) -> ConfigDiff {
    let mut result = ConfigDiff::default();

    immutable_changes(old.vn_group_data.as_ref(), new.vn_group_data.as_ref(), &mut result.forbidden);

    if let (Some(stored), Some(requested)) = (
        old.internal_group_identifier.as_ref(),
        new.internal_group_identifier.as_ref(),
    ) {
        if stored != requested {
            result.forbidden.push(forbidden(INTERNAL_GROUP_ID_PATH));
        }
    }

    let added = set_difference(&new.members, &old.members);
    let removed = set_difference(&old.members, &new.members);
    if !added.is_empty() {
        result
            .repo_patches
            .push(PatchItem::add(INTERNAL_GROUP_IDS_PATH, string_array(&added)));
    }
    if !removed.is_empty() {
        result
            .repo_patches
            .push(PatchItem::remove(INTERNAL_GROUP_IDS_PATH, string_array(&removed)));
    }
    if !added.is_empty() || !removed.is_empty() {
        result
            .repo_patches
            .push(PatchItem::replace(MEMBERS_PATH, string_array(&new.members)));
    }

    let old_groups = by_id(&old.multicast_group_list);
    let new_groups = by_id(&new.multicast_group_list);
    if multicast_differs(
        &old.multicast_group_list,
        &new.multicast_group_list,
        &old_groups,
        &new_groups,
    ) {
        result.multicast_changed = true;
        result.repo_patches.push(PatchItem::replace(
            MULTICAST_GROUP_LIST_PATH,
            Value::Array(new.multicast_group_list.iter().map(MulticastGroup::to_json).collect()),
        ));

        let mut announced = HashSet::new();
        for group in &new.multicast_group_list {
            let id = group.multi_group_id.as_str();
            if !old_groups.contains_key(id) && announced.insert(id) {
                result
                    .notify_patches
                    .push(PatchItem::add(MULTICAST_GROUP_APPEND_PATH, group.to_json()));
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PatchOperation, PduSessionType, Snssai};
    use serde_json::json;

    fn base() -> GroupConfiguration {
        GroupConfiguration {
            vn_group_data: Some(VnGroupData {
                dnn: Some("internet".to_string()),
                s_nssai: Some(Snssai {
                    sst: 1,
                    sd: Some("010203".to_string()),
                }),
                pdu_session_types: Some(vec![PduSessionType::Ipv4, PduSessionType::Ethernet]),
                ..Default::default()
            }),
            members: vec!["UE-A".to_string(), "UE-B".to_string()],
            internal_group_identifier: Some("AAA00001-208-93-0123456789".to_string()),
            multicast_group_list: vec![MulticastGroup::new("M1")],
            ..Default::default()
        }
    }

    #[test]
    fn test_identical_configs() {
        let config = base();
        let result = diff(&config, &config);
        assert!(result.is_empty());
        assert!(!result.multicast_changed);
    }

    #[test]
    fn test_repeated_multicast_id_is_a_change() {
        let old = base();
        let mut new = base();
        new.multicast_group_list
            .push(MulticastGroup::new("M1").with_attribute("ipv4Addr", json!("239.0.0.9")));

        let result = diff(&old, &new);
        assert!(result.multicast_changed);
        assert_eq!(result.repo_patches.len(), 1);
        assert_eq!(result.repo_patches[0].path, MULTICAST_GROUP_LIST_PATH);
        assert_eq!(
            result.repo_patches[0].value,
            Some(json!([
                { "multiGroupId": "M1" },
                { "multiGroupId": "M1", "ipv4Addr": "239.0.0.9" }
            ]))
        );
        assert!(result.notify_patches.is_empty());

        assert!(diff(&new, &new).is_empty());
    }

    #[test]
    fn test_dnn_change_is_forbidden() {
        let old = base();
        let mut new = base();
        new.vn_group_data.as_mut().unwrap().dnn = Some("ims".to_string());

        let result = diff(&old, &new);
        assert_eq!(result.forbidden.len(), 1);
        assert_eq!(result.forbidden[0].path, DNN_PATH);
        assert!(result.forbidden[0].reason.as_deref().unwrap().contains("5.29.2"));
        assert!(result.repo_patches.is_empty());
        assert!(result.notify_patches.is_empty());
    }

    #[test]
    fn test_all_immutable_paths() {
        let old = base();
        let mut new = base();
        {
            let data = new.vn_group_data.as_mut().unwrap();
            data.pdu_session_types = Some(vec![PduSessionType::Ipv6]);
            data.s_nssai = Some(Snssai { sst: 2, sd: None });
        }
        new.internal_group_identifier = Some("AAA00001-208-93-ffffffffff".to_string());

        let paths: Vec<String> = diff(&old, &new).forbidden.into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec![PDU_SESSION_TYPES_PATH, SNSSAI_PATH, INTERNAL_GROUP_ID_PATH]);
    }

    #[test]
    fn test_pdu_session_type_order_is_not_a_change() {
        let old = base();
        let mut new = base();
        new.vn_group_data.as_mut().unwrap().pdu_session_types =
            Some(vec![PduSessionType::Ethernet, PduSessionType::Ipv4]);
        assert!(diff(&old, &new).forbidden.is_empty());
    }

    #[test]
    fn test_member_changes() {
        let old = base();
        let mut new = base();
        new.members = vec!["UE-B".to_string(), "UE-C".to_string()];

        let result = diff(&old, &new);
        assert_eq!(
            result.repo_patches,
            vec![
                PatchItem::add(INTERNAL_GROUP_IDS_PATH, json!(["UE-C"])),
                PatchItem::remove(INTERNAL_GROUP_IDS_PATH, json!(["UE-A"])),
                PatchItem::replace(MEMBERS_PATH, json!(["UE-B", "UE-C"])),
            ]
        );
        assert!(result.forbidden.is_empty());
        assert!(result.notify_patches.is_empty());
    }

    #[test]
    fn test_member_addition_only() {
        let old = base();
        let mut new = base();
        new.members.push("UE-C".to_string());

        let ops: Vec<PatchOperation> = diff(&old, &new).repo_patches.iter().map(|p| p.op).collect();
        assert_eq!(ops, vec![PatchOperation::Add, PatchOperation::Replace]);
    }

    #[test]
    fn test_member_reorder_yields_nothing() {
        let old = base();
        let mut new = base();
        new.members.reverse();
        assert!(diff(&old, &new).is_empty());
    }

    #[test]
    fn test_multicast_addition_is_announced() {
        let old = base();
        let mut new = base();
        new.multicast_group_list.push(MulticastGroup::new("M2"));

        let result = diff(&old, &new);
        assert!(result.multicast_changed);
        assert_eq!(
            result.repo_patches,
            vec![PatchItem::replace(
                MULTICAST_GROUP_LIST_PATH,
                json!([{ "multiGroupId": "M1" }, { "multiGroupId": "M2" }])
            )]
        );
        assert_eq!(
            result.notify_patches,
            vec![PatchItem::add(MULTICAST_GROUP_APPEND_PATH, json!({ "multiGroupId": "M2" }))]
        );
    }

    #[test]
    fn test_multicast_removal_and_modification_are_not_announced() {
        let old = base();

        let mut removed = base();
        removed.multicast_group_list.clear();
        let result = diff(&old, &removed);
        assert!(result.multicast_changed);
        assert_eq!(result.repo_patches.len(), 1);
        assert!(result.notify_patches.is_empty());

        let mut modified = base();
        modified.multicast_group_list =
            vec![MulticastGroup::new("M1").with_attribute("ipv4Addr", json!("239.1.1.1"))];
        let result = diff(&old, &modified);
        assert!(result.multicast_changed);
        assert!(result.notify_patches.is_empty());
    }

    #[test]
    fn test_multicast_reorder_is_not_a_change() {
        let mut old = base();
        old.multicast_group_list.push(MulticastGroup::new("M2"));
        let mut new = old.clone();
        new.multicast_group_list.reverse();

        let result = diff(&old, &new);
        assert!(!result.multicast_changed);
        assert!(result.is_empty());
    }
}
