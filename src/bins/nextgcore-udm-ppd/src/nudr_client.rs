//! UDR (Nudr_DataRepository) access used by the VN group workflows

use async_trait::async_trait;
use ogs_sbi::constants::{content_type, header, status};
use ogs_sbi::{encode_component, SbiClient, SbiClientConfig, SbiError, SbiRequest, SbiResponse};
use thiserror::Error;

use crate::model::{GroupConfiguration, PatchItem, PatchResult, PpDataEntry};

const POLICY_DATA_UES: &str = "/nudr-dr/v1/policy-data/ues";
const SUBSCRIPTION_DATA: &str = "/nudr-dr/v1/subscription-data";
const VN_GROUPS: &str = "/nudr-dr/v1/subscription-data/group-data/5g-vn-groups";

fn am_data_path(ue_id: &str) -> String {
    format!("{}/{}/am-data", POLICY_DATA_UES, encode_component(ue_id))
}

fn vn_group_path(ext_group_id: &str) -> String {
    format!("{}/{}", VN_GROUPS, encode_component(ext_group_id))
}

fn pp_data_entry_path(ue_id: &str, af_instance_id: &str) -> String {
    format!(
        "{}/{}/pp-data-store/{}",
        SUBSCRIPTION_DATA,
        encode_component(ue_id),
        encode_component(af_instance_id)
    )
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    /// The UDR answered with an error status
    #[error("UDR answered {status}: {detail}")]
    Remote {
        status: u16,
        cause: Option<String>,
        detail: String,
    },
    #[error("UDR request timed out")]
    Timeout,
    #[error("UDR unavailable: {0}")]
    Unavailable(String),
    #[error("malformed UDR response: {0}")]
    Malformed(String),
}

impl RepositoryError {
    /// Build from a non-2xx answer, keeping the peer's `ProblemDetails`
    pub fn from_response(response: &SbiResponse) -> Self {
        match response.problem_details() {
            Some(problem) => Self::Remote {
                status: response.status,
                cause: problem.cause,
                detail: problem
                    .detail
                    .or(problem.title)
                    .unwrap_or_else(|| format!("HTTP {}", response.status)),
            },
            None => Self::Remote {
                status: response.status,
                cause: None,
                detail: format!("HTTP {}", response.status),
            },
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::Remote { status, .. } => *status,
            Self::Timeout => status::GATEWAY_TIMEOUT,
            Self::Unavailable(_) => status::SERVICE_UNAVAILABLE,
            Self::Malformed(_) => status::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn cause(&self) -> Option<&str> {
        match self {
            Self::Remote { cause, .. } => cause.as_deref(),
            _ => None,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            Self::Remote { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

impl From<SbiError> for RepositoryError {
    fn from(err: SbiError) -> Self {
        match err {
            SbiError::Timeout => Self::Timeout,
            SbiError::SerializationError(e) => Self::Malformed(e.to_string()),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Answer of a PATCH on a VN group
#[derive(Debug, Clone, PartialEq)]
pub struct PatchOutcome {
    pub status: u16,
    /// Present when the UDR answered `200 OK` with a body
    pub result: Option<PatchResult>,
}

/// System-of-record operations the provisioning workflows depend on.
#[async_trait]
pub trait GroupDataRepository: Send + Sync {
    /// Succeeds when the UE has access and mobility policy data
    async fn get_member_subscription(&self, ue_id: &str) -> Result<(), RepositoryError>;

    /// Returns the configuration as stored by the UDR
    async fn put_group(
        &self,
        ext_group_id: &str,
        config: &GroupConfiguration,
    ) -> Result<GroupConfiguration, RepositoryError>;

    async fn get_group(&self, ext_group_id: &str) -> Result<GroupConfiguration, RepositoryError>;

    async fn patch_group(
        &self,
        ext_group_id: &str,
        patches: &[PatchItem],
        supported_features: Option<&str>,
    ) -> Result<PatchOutcome, RepositoryError>;

    async fn delete_group(&self, ext_group_id: &str) -> Result<(), RepositoryError>;

    /// Parameter provisioning entry stored for one AF instance
    async fn get_pp_data_entry(
        &self,
        ue_id: &str,
        af_instance_id: &str,
        supported_features: Option<&str>,
    ) -> Result<PpDataEntry, RepositoryError>;
}

/// HTTP/2 binding to the UDR
pub struct UdrClient {
    client: SbiClient,
}

impl UdrClient {
    pub fn new(config: SbiClientConfig) -> Self {
        log::debug!("UDR client for {}", config.base_uri());
        Self {
            client: SbiClient::new(config),
        }
    }

    async fn send(&self, request: SbiRequest) -> Result<SbiResponse, RepositoryError> {
        log::debug!("UDR {} {}", request.header.method, request.header.uri);
        let response = self.client.send_request(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(RepositoryError::from_response(&response))
        }
    }
}

#[async_trait]
impl GroupDataRepository for UdrClient {
    async fn get_member_subscription(&self, ue_id: &str) -> Result<(), RepositoryError> {
        self.send(SbiRequest::get(am_data_path(ue_id))).await?;
        Ok(())
    }

    async fn put_group(
        &self,
        ext_group_id: &str,
        config: &GroupConfiguration,
    ) -> Result<GroupConfiguration, RepositoryError> {
        let request = SbiRequest::put(vn_group_path(ext_group_id))
            .with_json_body(config)
            .map_err(|e| RepositoryError::Malformed(e.to_string()))?;
        let response = self.send(request).await?;
        if response.has_body() {
            response
                .json_body::<GroupConfiguration>()
                .map_err(|e| RepositoryError::Malformed(e.to_string()))
        } else {
            Ok(config.clone())
        }
    }

    async fn get_group(&self, ext_group_id: &str) -> Result<GroupConfiguration, RepositoryError> {
        let response = self.send(SbiRequest::get(vn_group_path(ext_group_id))).await?;
        response
            .json_body::<GroupConfiguration>()
            .map_err(|e| RepositoryError::Malformed(e.to_string()))
    }

    async fn patch_group(
        &self,
        ext_group_id: &str,
        patches: &[PatchItem],
        supported_features: Option<&str>,
    ) -> Result<PatchOutcome, RepositoryError> {
        let mut request = SbiRequest::patch(vn_group_path(ext_group_id))
            .with_json_body(&patches)
            .map_err(|e| RepositoryError::Malformed(e.to_string()))?
            .with_header(header::CONTENT_TYPE, content_type::APPLICATION_PATCH_JSON);
        if let Some(features) = supported_features {
            request = request.with_param("supported-features", features);
        }

        let response = self.send(request).await?;
        let result = if response.status == status::OK && response.has_body() {
            Some(
                response
                    .json_body::<PatchResult>()
                    .map_err(|e| RepositoryError::Malformed(e.to_string()))?,
            )
        } else {
            None
        };
        Ok(PatchOutcome {
            status: response.status,
            result,
        })
    }

    async fn delete_group(&self, ext_group_id: &str) -> Result<(), RepositoryError> {
        self.send(SbiRequest::delete(vn_group_path(ext_group_id))).await?;
        Ok(())
    }

    async fn get_pp_data_entry(
        &self,
        ue_id: &str,
        af_instance_id: &str,
        supported_features: Option<&str>,
    ) -> Result<PpDataEntry, RepositoryError> {
        let mut request = SbiRequest::get(pp_data_entry_path(ue_id, af_instance_id));
        if let Some(features) = supported_features {
            request = request.with_param("supported-features", features);
        }
        let response = self.send(request).await?;
        response
            .json_body::<PpDataEntry>()
            .map_err(|e| RepositoryError::Malformed(e.to_string()))
    }
}
