//! UDM PP Context
//!
//! Network identity and the 5G LAN service-type table used to derive
//! internal group identifiers.

use std::collections::HashMap;

use crate::model::AppDescriptor;

/// Service id used when no application maps to a configured 5G LAN service type
pub const DEFAULT_SERVICE_ID: &str = "AAA00001";

/// PLMN identity in its decimal string form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlmnId {
    pub mcc: String,
    pub mnc: String,
}

impl PlmnId {
    pub fn new(mcc: impl Into<String>, mnc: impl Into<String>) -> Self {
        Self {
            mcc: mcc.into(),
            mnc: mnc.into(),
        }
    }

    /// 3-digit MCC, 2 or 3-digit MNC
    pub fn is_valid(&self) -> bool {
        let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        self.mcc.len() == 3
            && digits(&self.mcc)
            && (2..=3).contains(&self.mnc.len())
            && digits(&self.mnc)
    }
}

/// Checks the 8 hex digit form of a 5G LAN service id
pub fn is_valid_service_id(service_id: &str) -> bool {
    service_id.len() == 8 && service_id.chars().all(|c| c.is_ascii_hexdigit())
}

/// Shared, read-only state of the provisioning service
#[derive(Debug, Clone)]
pub struct UdmPpContext {
    pub plmn_id: PlmnId,
    /// appId -> service id
    service_types: HashMap<String, String>,
}

impl UdmPpContext {
    pub fn new(plmn_id: PlmnId, service_types: HashMap<String, String>) -> Self {
        log::debug!(
            "UDM PP context: PLMN {}-{}, {} service type(s)",
            plmn_id.mcc,
            plmn_id.mnc,
            service_types.len()
        );
        Self {
            plmn_id,
            service_types,
        }
    }

    /// First application id (descriptors in order, app ids in key order)
    /// found in the service-type table, else [`DEFAULT_SERVICE_ID`].
    pub fn service_id_for(&self, app_descriptors: &[AppDescriptor]) -> &str {
        app_descriptors
            .iter()
            .flat_map(|descriptor| descriptor.app_ids.keys())
            .find_map(|app_id| self.service_types.get(app_id))
            .map(String::as_str)
            .unwrap_or(DEFAULT_SERVICE_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(app_ids: &[&str]) -> AppDescriptor {
        AppDescriptor {
            os_id: None,
            app_ids: app_ids
                .iter()
                .map(|id| (id.to_string(), "1".to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_plmn_id_validation() {
        assert!(PlmnId::new("208", "93").is_valid());
        assert!(PlmnId::new("310", "410").is_valid());
        assert!(!PlmnId::new("20", "93").is_valid());
        assert!(!PlmnId::new("208", "9").is_valid());
        assert!(!PlmnId::new("2a8", "93").is_valid());
    }

    #[test]
    fn test_service_id_lookup() {
        let table = HashMap::from([
            ("app-b".to_string(), "BBB00002".to_string()),
            ("app-c".to_string(), "CCC00003".to_string()),
        ]);
        let context = UdmPpContext::new(PlmnId::new("208", "93"), table);

        assert_eq!(context.service_id_for(&[]), DEFAULT_SERVICE_ID);
        assert_eq!(context.service_id_for(&[descriptor(&["unknown"])]), DEFAULT_SERVICE_ID);
        assert_eq!(
            context.service_id_for(&[descriptor(&["unknown"]), descriptor(&["app-c"])]),
            "CCC00003"
        );
        // key order within one descriptor
        assert_eq!(
            context.service_id_for(&[descriptor(&["app-c", "app-b"])]),
            "BBB00002"
        );
    }

    #[test]
    fn test_service_id_format() {
        assert!(is_valid_service_id("AAA00001"));
        assert!(!is_valid_service_id("AAA0001"));
        assert!(!is_valid_service_id("AAA0000G"));
    }
}
