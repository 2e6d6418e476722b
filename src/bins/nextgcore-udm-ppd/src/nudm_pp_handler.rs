//! Nudm_PP / Nudm_SDM request handling
//!
//! Inbound SBI requests are parsed once into a [`PpRequest`], run against the
//! [`GroupProvisioningEngine`] and answered through a [`PpResponse`].
//!
//! Resources:
//! - `PUT|GET|PATCH|DELETE /nudm-pp/v1/5g-vn-groups/{extGroupId}`
//! - `POST /nudm-pp/v1/vn5glan-subscriptions/subs/{groupId}`
//! - `GET /nudm-pp/v1/{ueId}/pp-data-store/{afInstanceId}`
//! - `GET /nudm-sdm/v2/group-data/group-identifiers`

use ogs_sbi::constants::{cause, header, status};
use ogs_sbi::server::{send_bad_request, send_internal_error, send_method_not_allowed, send_not_found, send_problem};
use ogs_sbi::{ProblemDetails, SbiRequest, SbiResponse};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::VnGroupError;
use crate::model::{GroupConfiguration, VnGroupSubscription};
use crate::vn_group::{GroupIdKey, GroupIdentifiersQuery, GroupProvisioningEngine, ModifyOutcome};

/// A validated Nudm_PP request
#[derive(Debug, Clone, PartialEq)]
pub enum PpRequest {
    CreateGroup {
        ext_group_id: String,
        config: GroupConfiguration,
    },
    GetGroup {
        ext_group_id: String,
    },
    ModifyGroup {
        ext_group_id: String,
        config: GroupConfiguration,
        supported_features: Option<String>,
    },
    DeleteGroup {
        ext_group_id: String,
        mtc_provider_info: Option<String>,
        af_id: Option<String>,
    },
    Subscribe {
        group_id: String,
        subscription: VnGroupSubscription,
    },
    GroupIdentifiers(GroupIdentifiersQuery),
    GetPpDataEntry {
        ue_id: String,
        af_instance_id: String,
        supported_features: Option<String>,
    },
}

fn body<T: DeserializeOwned>(request: &SbiRequest) -> Result<T, SbiResponse> {
    if request.http.content.as_deref().map_or(true, str::is_empty) {
        return Err(send_bad_request("No request body", Some(cause::MANDATORY_IE_MISSING)));
    }
    request.json_body().map_err(|e| {
        log::error!("Cannot parse request body: {}", e);
        send_bad_request(&format!("Cannot parse request body: {}", e), Some(cause::INVALID_MSG_FORMAT))
    })
}

fn param(request: &SbiRequest, key: &str) -> Option<String> {
    request
        .http
        .params
        .get(key)
        .filter(|value| !value.is_empty())
        .cloned()
}

fn group_identifiers_query(request: &SbiRequest) -> Result<GroupIdentifiersQuery, SbiResponse> {
    let key = match (param(request, "ext-group-id"), param(request, "int-group-id")) {
        (Some(ext), None) => GroupIdKey::External(ext),
        (None, Some(int)) => GroupIdKey::Internal(int),
        (Some(_), Some(_)) => {
            return Err(send_bad_request(
                "Only one of ext-group-id and int-group-id is allowed",
                Some(cause::MANDATORY_IE_INCORRECT),
            ))
        }
        (None, None) => {
            return Err(send_bad_request(
                "Either ext-group-id or int-group-id is required",
                Some(cause::MANDATORY_IE_MISSING),
            ))
        }
    };
    let ue_id_ind = match param(request, "ue-id-ind").as_deref() {
        None | Some("false") => false,
        Some("true") => true,
        Some(other) => {
            return Err(send_bad_request(
                &format!("Invalid ue-id-ind {}", other),
                Some(cause::MANDATORY_IE_INCORRECT),
            ))
        }
    };
    Ok(GroupIdentifiersQuery {
        key,
        ue_id_ind,
        af_id: param(request, "af-id"),
        supported_features: param(request, "supported-features"),
    })
}

impl PpRequest {
    /// Route and validate; the error is the response to send back as is.
    pub fn parse(request: &SbiRequest) -> Result<Self, SbiResponse> {
        let method = request.header.method.as_str();
        let uri = request.header.uri.as_str();
        let segments = request.header.path_segments();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        match segments.as_slice() {
            ["nudm-pp", "v1", "5g-vn-groups", ext_group_id] => {
                let ext_group_id = ext_group_id.to_string();
                match method {
                    "PUT" => Ok(Self::CreateGroup {
                        ext_group_id,
                        config: body(request)?,
                    }),
                    "GET" => Ok(Self::GetGroup { ext_group_id }),
                    "PATCH" => Ok(Self::ModifyGroup {
                        ext_group_id,
                        config: body(request)?,
                        supported_features: param(request, "supported-features"),
                    }),
                    "DELETE" => Ok(Self::DeleteGroup {
                        ext_group_id,
                        mtc_provider_info: param(request, "mtc-provider-info"),
                        af_id: param(request, "af-id"),
                    }),
                    _ => Err(send_method_not_allowed(method, uri)),
                }
            }
            ["nudm-pp", "v1", "vn5glan-subscriptions", "subs", group_id] => match method {
                "POST" => Ok(Self::Subscribe {
                    group_id: group_id.to_string(),
                    subscription: body(request)?,
                }),
                _ => Err(send_method_not_allowed(method, uri)),
            },
            ["nudm-sdm", "v2", "group-data", "group-identifiers"] => match method {
                "GET" => Ok(Self::GroupIdentifiers(group_identifiers_query(request)?)),
                _ => Err(send_method_not_allowed(method, uri)),
            },
            ["nudm-pp", "v1", ue_id, "pp-data-store", af_instance_id] => match method {
                "GET" => Ok(Self::GetPpDataEntry {
                    ue_id: ue_id.to_string(),
                    af_instance_id: af_instance_id.to_string(),
                    supported_features: param(request, "supported-features"),
                }),
                _ => Err(send_method_not_allowed(method, uri)),
            },
            _ => {
                log::warn!("Unknown resource: {} {}", method, uri);
                Err(send_not_found(
                    &format!("Unknown resource {}", uri),
                    Some(cause::RESOURCE_URI_STRUCTURE_NOT_FOUND),
                ))
            }
        }
    }
}

/// Result of one Nudm_PP operation
#[derive(Debug, Clone, PartialEq)]
pub struct PpResponse {
    pub status: u16,
    pub body: Option<Value>,
    pub location: Option<String>,
    pub problem: Option<ProblemDetails>,
}

impl PpResponse {
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            body: None,
            location: None,
            problem: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn from_error(err: &VnGroupError) -> Self {
        Self {
            status: err.status(),
            body: None,
            location: None,
            problem: Some(err.to_problem_details()),
        }
    }

    fn json<T: serde::Serialize>(status: u16, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => Self::with_status(status).with_body(value),
            Err(e) => Self::from_error(&VnGroupError::SystemFailure(e.to_string())),
        }
    }

    pub fn into_sbi_response(self) -> SbiResponse {
        if let Some(problem) = self.problem {
            return send_problem(&problem);
        }

        let mut response = SbiResponse::with_status(self.status);
        if let Some(body) = self.body {
            response = match response.with_json_body(&body) {
                Ok(response) => response,
                Err(e) => return send_internal_error(&format!("Cannot encode response: {}", e)),
            };
        }
        if let Some(location) = self.location {
            response = response.with_header(header::LOCATION, location);
        }
        response
    }
}

/// Run a parsed request
pub async fn handle(engine: &GroupProvisioningEngine, request: PpRequest) -> PpResponse {
    let result = match request {
        PpRequest::CreateGroup {
            ext_group_id,
            config,
        } => engine
            .create_group(&ext_group_id, &config)
            .await
            .map(|()| PpResponse::with_status(status::CREATED)),
        PpRequest::GetGroup { ext_group_id } => engine
            .get_group(&ext_group_id)
            .await
            .map(|config| PpResponse::json(status::OK, &config)),
        PpRequest::ModifyGroup {
            ext_group_id,
            config,
            supported_features,
        } => engine
            .modify_group(&ext_group_id, &config, supported_features.as_deref())
            .await
            .map(|outcome| match outcome {
                ModifyOutcome::Patched(Some(result)) => PpResponse::json(status::OK, &result),
                ModifyOutcome::Patched(None) | ModifyOutcome::Unchanged => {
                    PpResponse::with_status(status::NO_CONTENT)
                }
            }),
        PpRequest::DeleteGroup {
            ext_group_id,
            mtc_provider_info,
            af_id,
        } => engine
            .delete_group(&ext_group_id, mtc_provider_info.as_deref(), af_id.as_deref())
            .await
            .map(|()| PpResponse::with_status(status::NO_CONTENT)),
        PpRequest::Subscribe {
            group_id,
            subscription,
        } => engine
            .subscribe(&group_id, subscription)
            .await
            .map(|created| {
                PpResponse::json(status::CREATED, &created.subscription).with_location(created.location)
            }),
        PpRequest::GroupIdentifiers(query) => engine
            .group_identifiers(&query)
            .await
            .map(|identifiers| PpResponse::json(status::OK, &identifiers)),
        PpRequest::GetPpDataEntry {
            ue_id,
            af_instance_id,
            supported_features,
        } => engine
            .get_pp_data_entry(&ue_id, &af_instance_id, supported_features.as_deref())
            .await
            .map(|entry| PpResponse::json(status::OK, &entry)),
    };

    result.unwrap_or_else(|e| PpResponse::from_error(&e))
}

/// Entry point for the SBI server
pub async fn dispatch(engine: &GroupProvisioningEngine, request: SbiRequest) -> SbiResponse {
    log::debug!("{} {}", request.header.method, request.header.uri);
    match PpRequest::parse(&request) {
        Ok(pp_request) => handle(engine, pp_request).await.into_sbi_response(),
        Err(response) => response,
    }
}
