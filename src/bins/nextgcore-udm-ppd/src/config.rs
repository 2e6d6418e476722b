//! UDM PP configuration
//!
//! Read from the `udm:` section of the NextGCore YAML file:
//!
//! ```yaml
//! udm:
//!   sbi: { addr: 127.0.0.12, port: 7777 }
//!   plmn: { mcc: "999", mnc: "70" }
//!   udr: { addr: 127.0.0.20, port: 7777, timeout_ms: 3000 }
//!   db_uri: mongodb://localhost/nextgcore
//!   vn5glan_service_type:
//!     app-video: ABCDEF01
//!   vn_group:
//!     internal_id_suffix_len: 10
//!     notify_timeout_ms: 3000
//!     remove_mapping_on_delete: false
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::context::{is_valid_service_id, PlmnId};
use crate::id_allocator::{is_valid_suffix_len, DEFAULT_SUFFIX_LEN};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub addr: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            addr: "127.0.0.12".to_string(),
            port: 7777,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UdrSection {
    pub addr: String,
    pub port: u16,
    pub timeout_ms: u64,
}

impl Default for UdrSection {
    fn default() -> Self {
        Self {
            addr: "127.0.0.20".to_string(),
            port: 7777,
            timeout_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlmnSection {
    pub mcc: String,
    pub mnc: String,
}

impl Default for PlmnSection {
    fn default() -> Self {
        Self {
            mcc: "999".to_string(),
            mnc: "70".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VnGroupSection {
    pub internal_id_suffix_len: usize,
    pub notify_timeout_ms: u64,
    pub remove_mapping_on_delete: bool,
}

impl Default for VnGroupSection {
    fn default() -> Self {
        Self {
            internal_id_suffix_len: DEFAULT_SUFFIX_LEN,
            notify_timeout_ms: 3000,
            remove_mapping_on_delete: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UdmPpConfig {
    pub sbi: ServerSection,
    pub plmn: PlmnSection,
    pub udr: UdrSection,
    pub db_uri: Option<String>,
    /// appId -> 5G LAN service id
    pub vn5glan_service_type: HashMap<String, String>,
    pub vn_group: VnGroupSection,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    udm: UdmPpConfig,
}

impl UdmPpConfig {
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_yaml::from_str(content)?;
        file.udm.validate()?;
        Ok(file.udm)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        log::debug!("Configuration file loaded ({} bytes)", content.len());
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.plmn_id().is_valid() {
            return Err(ConfigError::Invalid(format!(
                "PLMN {}-{} is not a 3-digit MCC and 2/3-digit MNC",
                self.plmn.mcc, self.plmn.mnc
            )));
        }
        if let Some((app_id, service_id)) = self
            .vn5glan_service_type
            .iter()
            .find(|(_, service_id)| !is_valid_service_id(service_id))
        {
            return Err(ConfigError::Invalid(format!(
                "service id {} of {} is not 8 hex digits",
                service_id, app_id
            )));
        }
        if !is_valid_suffix_len(self.vn_group.internal_id_suffix_len) {
            return Err(ConfigError::Invalid(format!(
                "internal_id_suffix_len {} is not an even number in 2..=10",
                self.vn_group.internal_id_suffix_len
            )));
        }
        if self.udr.timeout_ms == 0 || self.vn_group.notify_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn plmn_id(&self) -> PlmnId {
        PlmnId::new(self.plmn.mcc.clone(), self.plmn.mnc.clone())
    }

    pub fn udr_timeout(&self) -> Duration {
        Duration::from_millis(self.udr.timeout_ms)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.vn_group.notify_timeout_ms)
    }

    /// `db_uri`, treating an empty value as absent
    pub fn db_uri(&self) -> Option<&str> {
        self.db_uri.as_deref().filter(|uri| !uri.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = UdmPpConfig::from_yaml("logger:\n  level: info\n").unwrap();
        assert_eq!(config, UdmPpConfig::default());
        assert_eq!(config.sbi.port, 7777);
        assert_eq!(config.udr_timeout(), Duration::from_millis(3000));
        assert_eq!(config.db_uri(), None);
        assert_eq!(config.plmn_id(), PlmnId::new("999", "70"));
    }

    #[test]
    fn test_full_section() {
        let yaml = r#"
udm:
  sbi:
    addr: 0.0.0.0
    port: 8000
  plmn:
    mcc: "208"
    mnc: "93"
  udr:
    addr: udr.local
    timeout_ms: 1500
  db_uri: mongodb://localhost/nextgcore
  vn5glan_service_type:
    app-video: ABCDEF01
  vn_group:
    internal_id_suffix_len: 6
    remove_mapping_on_delete: true
"#;
        let config = UdmPpConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.sbi.addr, "0.0.0.0");
        assert_eq!(config.sbi.port, 8000);
        assert_eq!(config.udr.addr, "udr.local");
        assert_eq!(config.udr.port, 7777);
        assert_eq!(config.udr_timeout(), Duration::from_millis(1500));
        assert_eq!(config.db_uri(), Some("mongodb://localhost/nextgcore"));
        assert_eq!(config.vn5glan_service_type["app-video"], "ABCDEF01");
        assert_eq!(config.vn_group.internal_id_suffix_len, 6);
        assert_eq!(config.vn_group.notify_timeout_ms, 3000);
        assert!(config.vn_group.remove_mapping_on_delete);
    }

    #[test]
    fn test_validation_errors() {
        for yaml in [
            "udm:\n  plmn: { mcc: \"20\", mnc: \"93\" }\n",
            "udm:\n  vn5glan_service_type: { app: XYZ }\n",
            "udm:\n  vn_group: { internal_id_suffix_len: 7 }\n",
            "udm:\n  udr: { timeout_ms: 0 }\n",
        ] {
            assert!(
                matches!(UdmPpConfig::from_yaml(yaml), Err(ConfigError::Invalid(_))),
                "{yaml}"
            );
        }
        assert!(matches!(
            UdmPpConfig::from_yaml("udm: [1, 2"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            UdmPpConfig::load("/nonexistent/udm.yaml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
